//! Proposal intake on the account side and the lifecycle driven by risk-analysis stage
//! events.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
pub mod state_machine;

#[cfg(test)]
mod tests;

pub use domain::{
    Address, Applicant, CreateProposalRequest, Proposal, ProposalStatus, ProposalValidationError,
    TransitionError,
};
pub use repository::{InMemoryProposalRepository, ProposalRepository, RepositoryError};
pub use router::{proposal_router, ApiError, ProposalView};
pub use service::{EvaluationDispatch, ProposalCreation, ProposalService, ProposalServiceError};
pub use state_machine::{RiskEventHandler, StateMachineError, TransitionOutcome};
