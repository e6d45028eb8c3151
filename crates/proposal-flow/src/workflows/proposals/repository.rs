use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

use super::domain::Proposal;

/// Storage abstraction for proposals. Implementations must make `update` atomic per id.
pub trait ProposalRepository: Send + Sync {
    fn save(&self, proposal: &Proposal) -> Result<(), RepositoryError>;
    fn update(&self, proposal: &Proposal) -> Result<(), RepositoryError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Proposal>, RepositoryError>;
    fn find_by_cpf(&self, cpf: &str) -> Result<Option<Proposal>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("proposal not found")]
    NotFound,
    #[error("proposal already exists")]
    Conflict,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Process-local store used by the demo and tests.
#[derive(Debug, Default)]
pub struct InMemoryProposalRepository {
    proposals: Mutex<HashMap<Uuid, Proposal>>,
}

impl InMemoryProposalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.proposals
            .lock()
            .map(|proposals| proposals.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, Proposal>>, RepositoryError> {
        self.proposals
            .lock()
            .map_err(|_| RepositoryError::Unavailable("proposal store poisoned".to_string()))
    }
}

impl ProposalRepository for InMemoryProposalRepository {
    fn save(&self, proposal: &Proposal) -> Result<(), RepositoryError> {
        let mut proposals = self.lock()?;
        if proposals.contains_key(&proposal.id) {
            return Err(RepositoryError::Conflict);
        }
        proposals.insert(proposal.id, proposal.clone());
        Ok(())
    }

    fn update(&self, proposal: &Proposal) -> Result<(), RepositoryError> {
        let mut proposals = self.lock()?;
        match proposals.get_mut(&proposal.id) {
            Some(stored) => {
                *stored = proposal.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Proposal>, RepositoryError> {
        Ok(self.lock()?.get(&id).cloned())
    }

    fn find_by_cpf(&self, cpf: &str) -> Result<Option<Proposal>, RepositoryError> {
        Ok(self
            .lock()?
            .values()
            .find(|proposal| proposal.cpf == cpf)
            .cloned())
    }
}
