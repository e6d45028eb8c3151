use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::domain::{Proposal, ProposalStatus, TransitionError};
use super::repository::{ProposalRepository, RepositoryError};
use crate::events::{EventType, StageEvent};
use crate::queue::EventHandler;

/// What applying one stage event did to the proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied {
        from: ProposalStatus,
        to: ProposalStatus,
    },
    /// The proposal already reflects this event; nothing was written.
    Duplicate { status: ProposalStatus },
    /// The event does not apply and will never apply.
    Ignored { reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum StateMachineError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

enum Step {
    StartAnalysis,
    Approve,
    Reject,
}

/// Advances proposals as stage events come back from risk analysis.
pub struct RiskEventHandler<R> {
    repository: Arc<R>,
}

impl<R> RiskEventHandler<R>
where
    R: ProposalRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Applies one event with a single read-modify-write.
    ///
    /// Events a redelivery could still make valid return an error so the message is kept;
    /// everything else resolves to an outcome.
    pub fn apply(&self, event: &StageEvent) -> Result<TransitionOutcome, StateMachineError> {
        let step = match &event.event_type {
            EventType::DocumentsApproved => Step::StartAnalysis,
            kind if kind.is_rejection() => Step::Reject,
            EventType::RiskAnalysisCompleted if event.approved => Step::Approve,
            EventType::RiskAnalysisCompleted => Step::Reject,
            other => {
                return Ok(TransitionOutcome::Ignored {
                    reason: format!("{other} does not affect proposal status"),
                })
            }
        };

        let mut proposal = self
            .repository
            .find_by_id(event.proposal_id)?
            .ok_or(RepositoryError::NotFound)?;
        let from = proposal.status;

        match (step, from) {
            (Step::StartAnalysis, ProposalStatus::Pending) => {
                self.commit(&mut proposal, Proposal::start_analysis)
            }
            (Step::StartAnalysis, status) => Ok(TransitionOutcome::Duplicate { status }),

            (Step::Reject, ProposalStatus::Pending | ProposalStatus::Analyzing) => {
                self.commit(&mut proposal, Proposal::reject)
            }
            (Step::Reject, ProposalStatus::Rejected) => Ok(TransitionOutcome::Duplicate {
                status: ProposalStatus::Rejected,
            }),
            (Step::Reject, ProposalStatus::Approved) => Ok(TransitionOutcome::Ignored {
                reason: format!("{} received for an approved proposal", event.event_type),
            }),

            (Step::Approve, ProposalStatus::Analyzing) => {
                self.commit(&mut proposal, Proposal::approve)
            }
            (Step::Approve, ProposalStatus::Approved) => Ok(TransitionOutcome::Duplicate {
                status: ProposalStatus::Approved,
            }),
            (Step::Approve, ProposalStatus::Rejected) => Ok(TransitionOutcome::Ignored {
                reason: "approval received for a rejected proposal".to_string(),
            }),
            // Completion overtook DocumentsApproved; keep it until that lands.
            (Step::Approve, ProposalStatus::Pending) => {
                Err(TransitionError::Approve(ProposalStatus::Pending).into())
            }
        }
    }

    fn commit(
        &self,
        proposal: &mut Proposal,
        transition: fn(&mut Proposal) -> Result<(), TransitionError>,
    ) -> Result<TransitionOutcome, StateMachineError> {
        let from = proposal.status;
        transition(proposal)?;
        self.repository.update(proposal)?;
        Ok(TransitionOutcome::Applied {
            from,
            to: proposal.status,
        })
    }
}

#[async_trait]
impl<R> EventHandler for RiskEventHandler<R>
where
    R: ProposalRepository + 'static,
{
    type Event = StageEvent;
    type Error = StateMachineError;

    async fn handle(&self, event: StageEvent) -> Result<(), StateMachineError> {
        let proposal_id = event.proposal_id;
        let event_type = &event.event_type;

        match self.apply(&event)? {
            TransitionOutcome::Applied { from, to } => info!(
                %proposal_id,
                %event_type,
                from = from.label(),
                to = to.label(),
                "proposal status updated"
            ),
            TransitionOutcome::Duplicate { status } => debug!(
                %proposal_id,
                %event_type,
                status = status.label(),
                "stage event already applied"
            ),
            TransitionOutcome::Ignored { reason } => warn!(
                %proposal_id,
                %event_type,
                %reason,
                "ignoring stage event"
            ),
        }
        Ok(())
    }
}
