use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::{QueueClient, QueueError};
use crate::events::{self, CodecError};

/// Outbound hook for typed envelopes.
#[async_trait]
pub trait EventPublisher<E>: Send + Sync {
    async fn publish(&self, event: &E) -> Result<(), PublishError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("failed to enqueue event: {0}")]
    Queue(#[from] QueueError),
}

/// Encodes envelopes with the shared codec and sends them to one queue.
pub struct QueuePublisher<Q> {
    queue: Arc<Q>,
}

impl<Q> QueuePublisher<Q> {
    pub fn new(queue: Arc<Q>) -> Self {
        Self { queue }
    }
}

impl<Q> Clone for QueuePublisher<Q> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
        }
    }
}

#[async_trait]
impl<Q, E> EventPublisher<E> for QueuePublisher<Q>
where
    Q: QueueClient + 'static,
    E: Serialize + Sync,
{
    async fn publish(&self, event: &E) -> Result<(), PublishError> {
        let body = events::encode(event)?;
        self.queue.send(body).await?;
        Ok(())
    }
}
