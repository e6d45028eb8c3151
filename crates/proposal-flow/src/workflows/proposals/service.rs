use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::domain::{Applicant, CreateProposalRequest, Proposal, ProposalValidationError};
use super::repository::{ProposalRepository, RepositoryError};
use crate::events::ProposalCreatedEvent;
use crate::queue::EventPublisher;

const BIRTH_DATE_FORMAT: &str = "%d-%m-%Y";

/// Whether the `ProposalCreated` event left the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EvaluationDispatch {
    Triggered,
    /// The proposal is stored but risk analysis was not reached.
    Deferred { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProposalCreation {
    pub proposal: Proposal,
    pub evaluation: EvaluationDispatch,
}

/// Creates and looks up proposals, announcing new ones to risk analysis.
pub struct ProposalService<R, P> {
    repository: Arc<R>,
    publisher: Arc<P>,
}

impl<R, P> ProposalService<R, P>
where
    R: ProposalRepository + 'static,
    P: EventPublisher<ProposalCreatedEvent> + 'static,
{
    pub fn new(repository: Arc<R>, publisher: Arc<P>) -> Self {
        Self {
            repository,
            publisher,
        }
    }

    /// Validates and stores a proposal, then publishes `ProposalCreated`.
    ///
    /// A publish failure does not undo the save; it is reported through
    /// [`ProposalCreation::evaluation`].
    pub async fn create(
        &self,
        request: CreateProposalRequest,
    ) -> Result<ProposalCreation, ProposalServiceError> {
        info!(cpf = %request.cpf, "creating proposal");

        let birth_date = NaiveDate::parse_from_str(&request.birth_date, BIRTH_DATE_FORMAT)
            .map_err(|_| ProposalServiceError::InvalidBirthDate {
                value: request.birth_date.clone(),
            })?;

        let proposal = Proposal::new(Applicant {
            full_name: request.full_name,
            cpf: request.cpf,
            salary: request.salary,
            email: request.email,
            phone: request.phone,
            birth_date,
            address: request.address,
        })?;

        if self.repository.find_by_cpf(&proposal.cpf)?.is_some() {
            return Err(ProposalServiceError::DuplicateCpf);
        }

        self.repository.save(&proposal).inspect_err(|err| {
            error!(error = %err, "failed to save proposal");
        })?;

        let event = ProposalCreatedEvent::new(proposal.id, proposal.payload());
        let evaluation = match self.publisher.publish(&event).await {
            Ok(()) => EvaluationDispatch::Triggered,
            Err(err) => {
                warn!(
                    proposal_id = %proposal.id,
                    error = %err,
                    "proposal stored but ProposalCreated was not published"
                );
                EvaluationDispatch::Deferred {
                    reason: err.to_string(),
                }
            }
        };

        info!(proposal_id = %proposal.id, "proposal created");
        Ok(ProposalCreation {
            proposal,
            evaluation,
        })
    }

    pub fn get(&self, id: Uuid) -> Result<Proposal, ProposalServiceError> {
        let proposal = self
            .repository
            .find_by_id(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(proposal)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProposalServiceError {
    #[error("invalid birth date '{value}', expected dd-mm-yyyy")]
    InvalidBirthDate { value: String },
    #[error(transparent)]
    InvalidProposal(#[from] ProposalValidationError),
    #[error("CPF already registered")]
    DuplicateCpf,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
