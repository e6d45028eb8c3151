use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::config::RiskPolicy;
use super::rules::RiskRule;
use crate::events::{EventType, ProposalCreatedEvent, StageEvent, ValidationError};
use crate::queue::{EventHandler, EventPublisher, PublishError};

/// Summary of one evaluation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisVerdict {
    pub proposal_id: Uuid,
    pub approved: bool,
    /// The rule that rejected the proposal, if any.
    pub decided_by: Option<RiskRule>,
    pub reason: String,
    /// Stage events sent, in order.
    pub published: Vec<EventType>,
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("invalid proposal event: {0}")]
    Validation(#[from] ValidationError),
    #[error("failed to publish {event_type}: {source}")]
    Publish {
        event_type: EventType,
        #[source]
        source: PublishError,
    },
}

/// Runs the documents, credit and fraud rules in order and publishes the resulting stage
/// events, stopping at the first rejection.
pub struct RiskAnalysisService<P> {
    publisher: Arc<P>,
    policy: RiskPolicy,
}

impl<P> RiskAnalysisService<P>
where
    P: EventPublisher<StageEvent> + 'static,
{
    pub fn new(publisher: Arc<P>, policy: RiskPolicy) -> Self {
        Self { publisher, policy }
    }

    pub async fn analyze(
        &self,
        event: &ProposalCreatedEvent,
    ) -> Result<AnalysisVerdict, AnalysisError> {
        let payload = event.validate().inspect_err(|err| {
            warn!(proposal_id = %event.proposal_id, error = %err, "invalid proposal payload");
        })?;
        let proposal_id = event.proposal_id;
        info!(%proposal_id, "analyzing proposal");

        let mut published = Vec::new();
        for rule in RiskRule::ORDER {
            let outcome = rule.evaluate(payload, &self.policy);

            if !outcome.approved {
                info!(
                    %proposal_id,
                    rule = rule.label(),
                    reason = %outcome.reason,
                    "proposal rejected"
                );
                self.publish(proposal_id, rejection_event(rule), false, &mut published)
                    .await?;
                return Ok(AnalysisVerdict {
                    proposal_id,
                    approved: false,
                    decided_by: Some(rule),
                    reason: outcome.reason,
                    published,
                });
            }

            // Credit and fraud approvals are folded into the final completion event.
            if rule == RiskRule::Documents {
                self.publish(proposal_id, EventType::DocumentsApproved, true, &mut published)
                    .await?;
            }
        }

        info!(%proposal_id, "proposal passed every risk rule");
        self.publish(
            proposal_id,
            EventType::RiskAnalysisCompleted,
            true,
            &mut published,
        )
        .await?;

        Ok(AnalysisVerdict {
            proposal_id,
            approved: true,
            decided_by: None,
            reason: String::new(),
            published,
        })
    }

    async fn publish(
        &self,
        proposal_id: Uuid,
        event_type: EventType,
        approved: bool,
        published: &mut Vec<EventType>,
    ) -> Result<(), AnalysisError> {
        let event = StageEvent::new(event_type.clone(), proposal_id, approved);
        self.publisher
            .publish(&event)
            .await
            .map_err(|source| AnalysisError::Publish {
                event_type: event_type.clone(),
                source,
            })?;
        published.push(event_type);
        Ok(())
    }
}

fn rejection_event(rule: RiskRule) -> EventType {
    match rule {
        RiskRule::Documents => EventType::DocumentsRejected,
        RiskRule::Credit => EventType::CreditRejected,
        RiskRule::Fraud => EventType::FraudRejected,
    }
}

#[async_trait]
impl<P> EventHandler for RiskAnalysisService<P>
where
    P: EventPublisher<StageEvent> + 'static,
{
    type Event = ProposalCreatedEvent;
    type Error = AnalysisError;

    async fn handle(&self, event: ProposalCreatedEvent) -> Result<(), AnalysisError> {
        let event_type = &event.event_type;
        if *event_type != EventType::ProposalCreated && !event_type.as_str().is_empty() {
            warn!(
                proposal_id = %event.proposal_id,
                event_type = %event_type,
                "skipping event not meant for risk analysis"
            );
            return Ok(());
        }

        self.analyze(&event).await.map(|_| ())
    }
}
