use proposal_flow::config::AppConfig;
use proposal_flow::error::AppError;
use proposal_flow::queue::{ConsumerSettings, HttpQueueClient, QueueConsumer, QueuePublisher};
use proposal_flow::shutdown::shutdown_signal;
use proposal_flow::telemetry;
use proposal_flow::workflows::risk_analysis::{RiskAnalysisService, RiskPolicy};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run() -> Result<(), AppError> {
    let config = AppConfig::load()?;
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

    let analysis = RiskAnalysisService::new(
        Arc::new(QueuePublisher::new(risk_queue)),
        RiskPolicy::default(),
    );
    let consumer = QueueConsumer::new(
        proposals_queue.clone(),
        Arc::new(analysis),
        ConsumerSettings::from_queue_config("risk-analysis", &config.queue),
    );

    consumer.start()?;
    info!(
        ?config.environment,
        queue = proposals_queue.queue_url(),
        "risk analysis worker ready"
    );

    shutdown_signal().await;

    consumer.stop().await;
    Ok(())
}
