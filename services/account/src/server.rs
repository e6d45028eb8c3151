use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use proposal_flow::config::AppConfig;
use proposal_flow::error::AppError;
use proposal_flow::queue::{ConsumerSettings, HttpQueueClient, QueueConsumer, QueuePublisher};
use proposal_flow::shutdown::shutdown_signal;
use proposal_flow::telemetry;
use proposal_flow::workflows::proposals::{
    InMemoryProposalRepository, ProposalService, RiskEventHandler,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let grace = config.queue.request_grace;
    let proposals_queue = Arc::new(HttpQueueClient::new(
        config.queue.require_proposals_queue()?,
        grace,
    )?);
    let risk_queue = Arc::new(HttpQueueClient::new(
        config.queue.require_risk_queue()?,
        grace,
    )?);

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryProposalRepository::new());
    let proposal_service = Arc::new(ProposalService::new(
        repository.clone(),
        Arc::new(QueuePublisher::new(proposals_queue)),
    ));
    let consumer = QueueConsumer::new(
        risk_queue,
        Arc::new(RiskEventHandler::new(repository)),
        ConsumerSettings::from_queue_config("account", &config.queue),
    );

    let app = with_service_routes(proposal_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    consumer.start()?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "account service ready");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    readiness_flag.store(false, Ordering::Release);
    consumer.stop().await;
    served?;
    Ok(())
}
