use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration shared by the account and risk-analysis services.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub queue: QueueConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let format = LogFormat::from_str(
            &env::var("APP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
        );

        let queue = QueueConfig {
            proposals_queue_url: non_empty_var("SQS_PROPOSALS_QUEUE_URL"),
            risk_queue_url: non_empty_var("SQS_RISK_QUEUE_URL"),
            poll_interval: Duration::from_millis(parse_var(
                "QUEUE_POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL_MS,
            )?),
            max_messages: parse_var::<u32>("QUEUE_MAX_MESSAGES", DEFAULT_MAX_MESSAGES)?
                .clamp(1, MAX_BATCH_SIZE),
            wait_time: Duration::from_secs(parse_var(
                "QUEUE_WAIT_TIME_SECS",
                DEFAULT_WAIT_TIME_SECS,
            )?),
            request_grace: Duration::from_millis(parse_var(
                "QUEUE_REQUEST_GRACE_MS",
                DEFAULT_REQUEST_GRACE_MS,
            )?),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, format },
            queue,
        })
    }
}

const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
const DEFAULT_MAX_MESSAGES: u32 = 10;
const DEFAULT_WAIT_TIME_SECS: u64 = 5;
const DEFAULT_REQUEST_GRACE_MS: u64 = 2_000;
const MAX_BATCH_SIZE: u32 = 10;

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match non_empty_var(name) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { variable: name }),
        None => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Compact,
        }
    }
}

/// Queue endpoints and consumer cadence.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Queue carrying `ProposalCreated` envelopes from account to risk analysis.
    pub proposals_queue_url: Option<String>,
    /// Queue carrying stage events from risk analysis back to account.
    pub risk_queue_url: Option<String>,
    pub poll_interval: Duration,
    pub max_messages: u32,
    pub wait_time: Duration,
    /// Slack added to the long-poll wait when bounding a receive request.
    pub request_grace: Duration,
}

impl QueueConfig {
    pub fn require_proposals_queue(&self) -> Result<&str, ConfigError> {
        self.proposals_queue_url
            .as_deref()
            .ok_or(ConfigError::MissingQueueUrl {
                variable: "SQS_PROPOSALS_QUEUE_URL",
            })
    }

    pub fn require_risk_queue(&self) -> Result<&str, ConfigError> {
        self.risk_queue_url
            .as_deref()
            .ok_or(ConfigError::MissingQueueUrl {
                variable: "SQS_RISK_QUEUE_URL",
            })
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            proposals_queue_url: None,
            risk_queue_url: None,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_messages: DEFAULT_MAX_MESSAGES,
            wait_time: Duration::from_secs(DEFAULT_WAIT_TIME_SECS),
            request_grace: Duration::from_millis(DEFAULT_REQUEST_GRACE_MS),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { variable: &'static str },
    MissingQueueUrl { variable: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { variable } => {
                write!(f, "{variable} must be a non-negative integer")
            }
            ConfigError::MissingQueueUrl { variable } => write!(f, "{variable} is required"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::MissingQueueUrl { .. } => None,
        }
    }
}
