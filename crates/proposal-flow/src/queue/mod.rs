//! Queue plumbing: the receive/send/delete contract, its HTTP and in-memory transports, the
//! polling consumer that drives handlers, and the publisher that feeds envelopes back in.

mod consumer;
mod http;
mod memory;
mod publisher;

use std::time::Duration;

use async_trait::async_trait;

pub use consumer::{
    BatchReport, ConsumerError, ConsumerSettings, ConsumerStatus, EventHandler, QueueConsumer,
};
pub use http::HttpQueueClient;
pub use memory::InMemoryQueue;
pub use publisher::{EventPublisher, PublishError, QueuePublisher};

/// A received message. The receipt handle proves ownership until it is acknowledged or the
/// visibility timeout lapses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub id: String,
    pub receipt_handle: String,
    pub body: String,
}

/// Receive-batch, send, and delete-by-handle over a remote queue.
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Returns up to `max_messages` available messages, waiting at most `wait_time` for one to
    /// arrive. An empty batch is not an error.
    async fn poll(
        &self,
        max_messages: u32,
        wait_time: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError>;

    /// Deletes a message previously returned by [`QueueClient::poll`].
    async fn acknowledge(&self, receipt_handle: &str) -> Result<(), QueueError>;

    /// Enqueues a new message body.
    async fn send(&self, body: String) -> Result<(), QueueError>;
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue unavailable: {reason}")]
    Unavailable { reason: String },
    #[error("queue returned status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("queue response could not be parsed: {0}")]
    MalformedResponse(String),
    #[error("receipt handle expired or unknown")]
    ReceiptExpired,
}

impl QueueError {
    /// Transport-level failures that the next tick may not see again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            QueueError::Unavailable { .. } | QueueError::Rejected { .. }
        )
    }
}
