use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::ProposalPayload;

/// Lifecycle of a proposal. `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Pending,
    Analyzing,
    Approved,
    Rejected,
}

impl ProposalStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ProposalStatus::Pending => "pending",
            ProposalStatus::Analyzing => "analyzing",
            ProposalStatus::Approved => "approved",
            ProposalStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProposalStatus::Approved | ProposalStatus::Rejected)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

/// Validated applicant data a proposal is created from.
#[derive(Debug, Clone, PartialEq)]
pub struct Applicant {
    pub full_name: String,
    pub cpf: String,
    pub salary: f64,
    pub email: String,
    pub phone: String,
    pub birth_date: NaiveDate,
    pub address: Address,
}

/// Body accepted by `POST /proposals`. The birth date arrives as `dd-mm-yyyy`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateProposalRequest {
    pub full_name: String,
    pub cpf: String,
    #[serde(default)]
    pub salary: f64,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(rename = "birthdate")]
    pub birth_date: String,
    #[serde(default)]
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: Uuid,
    pub full_name: String,
    pub cpf: String,
    pub salary: f64,
    pub email: String,
    pub phone: String,
    #[serde(rename = "birthdate")]
    pub birth_date: NaiveDate,
    pub address: Address,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Proposal {
    pub fn new(applicant: Applicant) -> Result<Self, ProposalValidationError> {
        if applicant.full_name.is_empty() {
            return Err(ProposalValidationError::MissingFullName);
        }
        if applicant.cpf.is_empty() {
            return Err(ProposalValidationError::MissingCpf);
        }
        if applicant.email.is_empty() {
            return Err(ProposalValidationError::MissingEmail);
        }
        if applicant.salary < 0.0 {
            return Err(ProposalValidationError::NegativeSalary);
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            full_name: applicant.full_name,
            cpf: applicant.cpf,
            salary: applicant.salary,
            email: applicant.email,
            phone: applicant.phone,
            birth_date: applicant.birth_date,
            address: applicant.address,
            status: ProposalStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    /// Snapshot of the fields risk analysis evaluates.
    pub fn payload(&self) -> ProposalPayload {
        ProposalPayload {
            full_name: self.full_name.clone(),
            cpf: self.cpf.clone(),
            salary: self.salary,
        }
    }

    pub fn start_analysis(&mut self) -> Result<(), TransitionError> {
        if self.status != ProposalStatus::Pending {
            return Err(TransitionError::StartAnalysis(self.status));
        }
        self.advance(ProposalStatus::Analyzing);
        Ok(())
    }

    pub fn approve(&mut self) -> Result<(), TransitionError> {
        if self.status != ProposalStatus::Analyzing {
            return Err(TransitionError::Approve(self.status));
        }
        self.advance(ProposalStatus::Approved);
        Ok(())
    }

    pub fn reject(&mut self) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::Reject(self.status));
        }
        self.advance(ProposalStatus::Rejected);
        Ok(())
    }

    pub fn is_pending(&self) -> bool {
        self.status == ProposalStatus::Pending
    }

    pub fn is_analyzing(&self) -> bool {
        self.status == ProposalStatus::Analyzing
    }

    pub fn is_finalized(&self) -> bool {
        self.status.is_terminal()
    }

    fn advance(&mut self, status: ProposalStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProposalValidationError {
    #[error("full name is required")]
    MissingFullName,
    #[error("CPF is required")]
    MissingCpf,
    #[error("email is required")]
    MissingEmail,
    #[error("salary must not be negative")]
    NegativeSalary,
}

/// A guarded transition was attempted from a state that does not allow it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("only pending proposals can start analysis (status: {})", .0.label())]
    StartAnalysis(ProposalStatus),
    #[error("only analyzing proposals can be approved (status: {})", .0.label())]
    Approve(ProposalStatus),
    #[error("only pending or analyzing proposals can be rejected (status: {})", .0.label())]
    Reject(ProposalStatus),
}
