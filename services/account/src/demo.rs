use clap::Args;
use proposal_flow::config::TelemetryConfig;
use proposal_flow::error::AppError;
use proposal_flow::queue::{ConsumerSettings, InMemoryQueue, QueueConsumer, QueuePublisher};
use proposal_flow::telemetry;
use proposal_flow::workflows::proposals::{
    Address, CreateProposalRequest, EvaluationDispatch, InMemoryProposalRepository, Proposal,
    ProposalRepository, ProposalService, RiskEventHandler,
};
use proposal_flow::workflows::risk_analysis::{RiskAnalysisService, RiskPolicy};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Applicant name for a single custom proposal (uses the sample set when omitted)
    #[arg(long, requires_all = ["cpf", "salary"])]
    pub(crate) full_name: Option<String>,
    /// Applicant CPF for the custom proposal
    #[arg(long, requires = "full_name")]
    pub(crate) cpf: Option<String>,
    /// Monthly salary for the custom proposal
    #[arg(long, requires = "full_name")]
    pub(crate) salary: Option<f64>,
    /// Consumer tick interval in milliseconds
    #[arg(long, default_value_t = 200)]
    pub(crate) poll_interval_ms: u64,
    /// Give up waiting for terminal statuses after this many seconds
    #[arg(long, default_value_t = 10)]
    pub(crate) timeout_secs: u64,
    /// Emit consumer logs while the demo runs
    #[arg(long)]
    pub(crate) verbose: bool,
}

fn sample_request(full_name: &str, cpf: &str, salary: f64) -> CreateProposalRequest {
    let slug = full_name.to_lowercase().replace(' ', ".");
    CreateProposalRequest {
        full_name: full_name.to_string(),
        cpf: cpf.to_string(),
        salary,
        email: format!("{slug}@example.com"),
        phone: "+55 11 91234-5678".to_string(),
        birth_date: "15-01-1990".to_string(),
        address: Address {
            street: "Rua das Flores, 123".to_string(),
            city: "São Paulo".to_string(),
            state: "SP".to_string(),
            zip_code: "01234-567".to_string(),
        },
    }
}

fn demo_requests(args: &DemoArgs) -> Vec<CreateProposalRequest> {
    match (&args.full_name, &args.cpf, args.salary) {
        (Some(full_name), Some(cpf), Some(salary)) => vec![sample_request(full_name, cpf, salary)],
        _ => vec![
            sample_request("John Doe", "12345678902", 5000.0),
            sample_request("Maria Silva", "98765432104", 2000.0),
            sample_request("Carlos Souza", "11122233345", 8000.0),
            sample_request("Al", "55566677788", 9000.0),
        ],
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    if args.verbose {
        telemetry::init(&TelemetryConfig::default())?;
    }

    let visibility_timeout = Duration::from_secs(30);
    let proposals_queue = Arc::new(InMemoryQueue::new(visibility_timeout));
    let risk_queue = Arc::new(InMemoryQueue::new(visibility_timeout));
    let repository = Arc::new(InMemoryProposalRepository::new());

    let service = ProposalService::new(
        repository.clone(),
        Arc::new(QueuePublisher::new(proposals_queue.clone())),
    );
    let analysis = RiskAnalysisService::new(
        Arc::new(QueuePublisher::new(risk_queue.clone())),
        RiskPolicy::default(),
    );

    let settings = |name: &str| ConsumerSettings {
        poll_interval: Duration::from_millis(args.poll_interval_ms),
        wait_time: Duration::ZERO,
        ..ConsumerSettings::new(name)
    };
    let risk_consumer = QueueConsumer::new(
        proposals_queue,
        Arc::new(analysis),
        settings("risk-analysis"),
    );
    let account_consumer = QueueConsumer::new(
        risk_queue,
        Arc::new(RiskEventHandler::new(repository.clone())),
        settings("account"),
    );

    println!("Proposal flow demo");
    let mut created = Vec::new();
    for request in demo_requests(&args) {
        let name = request.full_name.clone();
        match service.create(request).await {
            Ok(creation) => {
                let dispatch = match &creation.evaluation {
                    EvaluationDispatch::Triggered => "evaluation triggered".to_string(),
                    EvaluationDispatch::Deferred { reason } => {
                        format!("evaluation deferred: {reason}")
                    }
                };
                println!("  Created {} for {} ({dispatch})", creation.proposal.id, name);
                created.push(creation.proposal.id);
            }
            Err(err) => println!("  Proposal for {name} refused: {err}"),
        }
    }

    risk_consumer.start()?;
    account_consumer.start()?;

    let settled = tokio::time::timeout(
        Duration::from_secs(args.timeout_secs),
        wait_for_terminal(&*repository, &created, Duration::from_millis(args.poll_interval_ms)),
    )
    .await
    .is_ok();

    risk_consumer.stop().await;
    account_consumer.stop().await;

    if !settled {
        println!("\nTimed out before every proposal reached a final status");
    }

    println!("\nFinal statuses");
    for id in created {
        match repository.find_by_id(id) {
            Ok(Some(proposal)) => print_proposal(&proposal),
            Ok(None) => println!("  {id}: missing from repository"),
            Err(err) => println!("  {id}: repository unavailable: {err}"),
        }
    }

    Ok(())
}

async fn wait_for_terminal(repository: &dyn ProposalRepository, ids: &[Uuid], every: Duration) {
    loop {
        let settled = ids.iter().all(|id| {
            matches!(repository.find_by_id(*id), Ok(Some(proposal)) if proposal.is_finalized())
        });
        if settled {
            return;
        }
        tokio::time::sleep(every).await;
    }
}

fn print_proposal(proposal: &Proposal) {
    println!(
        "  {:<14} cpf {} salary {:>9.2} -> {}",
        proposal.full_name,
        proposal.cpf,
        proposal.salary,
        proposal.status.label()
    );
}
