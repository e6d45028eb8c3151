use clap::Args;
use proposal_flow::error::AppError;
use proposal_flow::events::{ProposalCreatedEvent, ProposalPayload};
use proposal_flow::queue::{InMemoryQueue, QueuePublisher};
use proposal_flow::workflows::risk_analysis::{
    AnalysisError, AnalysisVerdict, RiskAnalysisService, RiskPolicy, RiskRule,
};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// Applicant full name
    #[arg(long)]
    pub(crate) full_name: String,
    /// Applicant CPF (11 digits)
    #[arg(long)]
    pub(crate) cpf: String,
    /// Monthly salary
    #[arg(long)]
    pub(crate) salary: f64,
}

pub(crate) struct Evaluation {
    pub(crate) rules: Vec<(RiskRule, bool, String)>,
    pub(crate) verdict: AnalysisVerdict,
    pub(crate) envelopes: Vec<String>,
}

/// Runs the orchestrator against a throwaway queue so the published envelopes can be shown.
pub(crate) async fn evaluate(args: EvaluateArgs) -> Result<Evaluation, AnalysisError> {
    let payload = ProposalPayload {
        full_name: args.full_name,
        cpf: args.cpf,
        salary: args.salary,
    };
    let policy = RiskPolicy::default();
    let rules = RiskRule::ORDER
        .iter()
        .map(|rule| {
            let outcome = rule.evaluate(&payload, &policy);
            (*rule, outcome.approved, outcome.reason)
        })
        .collect();

    let sink = Arc::new(InMemoryQueue::new(Duration::from_secs(30)));
    let service = RiskAnalysisService::new(Arc::new(QueuePublisher::new(sink.clone())), policy);
    let verdict = service
        .analyze(&ProposalCreatedEvent::new(Uuid::new_v4(), payload))
        .await?;

    Ok(Evaluation {
        rules,
        verdict,
        envelopes: sink.bodies(),
    })
}

pub(crate) async fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let evaluation = match evaluate(args).await {
        Ok(evaluation) => evaluation,
        Err(err) => {
            println!("Proposal cannot be evaluated: {err}");
            return Ok(());
        }
    };

    println!("Rule outcomes");
    for (rule, approved, reason) in &evaluation.rules {
        let verdict = if *approved { "approved" } else { "rejected" };
        if reason.is_empty() {
            println!("  {:<10} {verdict}", rule.label());
        } else {
            println!("  {:<10} {verdict} ({reason})", rule.label());
        }
    }

    let verdict = &evaluation.verdict;
    println!(
        "\nDecision: {}",
        if verdict.approved { "approved" } else { "rejected" }
    );
    if let Some(rule) = verdict.decided_by {
        println!("  decided by {} rule: {}", rule.label(), verdict.reason);
    }

    println!("\nEvents that would be published");
    for body in &evaluation.envelopes {
        println!("  {body}");
    }
    Ok(())
}
