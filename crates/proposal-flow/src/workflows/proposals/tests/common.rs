use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;
use uuid::Uuid;

use crate::events::ProposalCreatedEvent;
use crate::queue::{EventPublisher, PublishError, QueueError};
use crate::workflows::proposals::{
    Address, Applicant, CreateProposalRequest, InMemoryProposalRepository, Proposal,
    ProposalRepository, ProposalService, ProposalStatus, RepositoryError,
};

pub(super) fn address() -> Address {
    Address {
        street: "Rua das Flores, 123".to_string(),
        city: "São Paulo".to_string(),
        state: "SP".to_string(),
        zip_code: "01234-567".to_string(),
    }
}

pub(super) fn request() -> CreateProposalRequest {
    CreateProposalRequest {
        full_name: "John Doe".to_string(),
        cpf: "12345678902".to_string(),
        salary: 5000.0,
        email: "john.doe@example.com".to_string(),
        phone: "+55 11 91234-5678".to_string(),
        birth_date: "15-01-1990".to_string(),
        address: address(),
    }
}

pub(super) fn applicant() -> Applicant {
    Applicant {
        full_name: "John Doe".to_string(),
        cpf: "12345678902".to_string(),
        salary: 5000.0,
        email: "john.doe@example.com".to_string(),
        phone: "+55 11 91234-5678".to_string(),
        birth_date: NaiveDate::from_ymd_opt(1990, 1, 15).expect("valid date"),
        address: address(),
    }
}

/// Stores a proposal already moved to `status`.
pub(super) fn stored_proposal(
    repository: &dyn ProposalRepository,
    status: ProposalStatus,
) -> Proposal {
    let mut proposal = Proposal::new(applicant()).expect("valid applicant");
    match status {
        ProposalStatus::Pending => {}
        ProposalStatus::Analyzing => proposal.start_analysis().expect("pending -> analyzing"),
        ProposalStatus::Approved => {
            proposal.start_analysis().expect("pending -> analyzing");
            proposal.approve().expect("analyzing -> approved");
        }
        ProposalStatus::Rejected => proposal.reject().expect("pending -> rejected"),
    }
    repository.save(&proposal).expect("save succeeds");
    proposal
}

#[derive(Default)]
pub(super) struct RecordingPublisher {
    events: Mutex<Vec<ProposalCreatedEvent>>,
}

impl RecordingPublisher {
    pub(super) fn events(&self) -> Vec<ProposalCreatedEvent> {
        self.events.lock().expect("publisher mutex").clone()
    }
}

#[async_trait]
impl EventPublisher<ProposalCreatedEvent> for RecordingPublisher {
    async fn publish(&self, event: &ProposalCreatedEvent) -> Result<(), PublishError> {
        self.events
            .lock()
            .expect("publisher mutex")
            .push(event.clone());
        Ok(())
    }
}

pub(super) struct OfflinePublisher;

#[async_trait]
impl EventPublisher<ProposalCreatedEvent> for OfflinePublisher {
    async fn publish(&self, _: &ProposalCreatedEvent) -> Result<(), PublishError> {
        Err(PublishError::Queue(QueueError::Unavailable {
            reason: "connection refused".to_string(),
        }))
    }
}

/// Wraps the in-memory store and counts writes.
#[derive(Default)]
pub(super) struct CountingRepository {
    inner: InMemoryProposalRepository,
    updates: AtomicUsize,
}

impl CountingRepository {
    pub(super) fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

impl ProposalRepository for CountingRepository {
    fn save(&self, proposal: &Proposal) -> Result<(), RepositoryError> {
        self.inner.save(proposal)
    }

    fn update(&self, proposal: &Proposal) -> Result<(), RepositoryError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update(proposal)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Proposal>, RepositoryError> {
        self.inner.find_by_id(id)
    }

    fn find_by_cpf(&self, cpf: &str) -> Result<Option<Proposal>, RepositoryError> {
        self.inner.find_by_cpf(cpf)
    }
}

pub(super) struct UnavailableRepository;

impl ProposalRepository for UnavailableRepository {
    fn save(&self, _: &Proposal) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _: &Proposal) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_by_id(&self, _: Uuid) -> Result<Option<Proposal>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_by_cpf(&self, _: &str) -> Result<Option<Proposal>, RepositoryError> {
        Ok(None)
    }
}

pub(super) type MemoryService = ProposalService<InMemoryProposalRepository, RecordingPublisher>;

pub(super) fn build_service() -> (
    Arc<MemoryService>,
    Arc<InMemoryProposalRepository>,
    Arc<RecordingPublisher>,
) {
    let repository = Arc::new(InMemoryProposalRepository::new());
    let publisher = Arc::new(RecordingPublisher::default());
    let service = Arc::new(ProposalService::new(repository.clone(), publisher.clone()));
    (service, repository, publisher)
}

pub(super) async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}
