use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;
use uuid::Uuid;

use super::{QueueClient, QueueError, QueueMessage};

/// Process-local queue with visibility-timeout redelivery.
///
/// A received message stays in the queue but is hidden until its visibility window lapses;
/// each receive issues a fresh receipt handle and invalidates the previous one.
#[derive(Debug)]
pub struct InMemoryQueue {
    entries: Mutex<VecDeque<Entry>>,
    arrivals: Notify,
    visibility_timeout: Duration,
}

#[derive(Debug)]
struct Entry {
    id: String,
    body: String,
    receive_count: u32,
    lease: Option<Lease>,
}

#[derive(Debug)]
struct Lease {
    receipt_handle: String,
    visible_at: Instant,
}

impl Entry {
    fn is_visible(&self, now: Instant) -> bool {
        self.lease
            .as_ref()
            .map_or(true, |lease| lease.visible_at <= now)
    }
}

impl InMemoryQueue {
    pub fn new(visibility_timeout: Duration) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            arrivals: Notify::new(),
            visibility_timeout,
        }
    }

    /// Messages not yet deleted, visible or not.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Messages currently hidden behind an unexpired receipt.
    pub fn in_flight(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .iter()
            .filter(|entry| !entry.is_visible(now))
            .count()
    }

    /// Bodies of all undeleted messages in queue order.
    pub fn bodies(&self) -> Vec<String> {
        self.lock().iter().map(|entry| entry.body.clone()).collect()
    }

    /// How many times the message with `id` has been handed out.
    pub fn receive_count(&self, id: &str) -> Option<u32> {
        self.lock()
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.receive_count)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Entry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn take_visible(&self, max_messages: usize) -> Vec<QueueMessage> {
        let now = Instant::now();
        let visibility_timeout = self.visibility_timeout;
        let mut entries = self.lock();

        entries
            .iter_mut()
            .filter(|entry| entry.is_visible(now))
            .take(max_messages)
            .map(|entry| {
                let receipt_handle = Uuid::new_v4().to_string();
                entry.receive_count += 1;
                entry.lease = Some(Lease {
                    receipt_handle: receipt_handle.clone(),
                    visible_at: now + visibility_timeout,
                });
                QueueMessage {
                    id: entry.id.clone(),
                    receipt_handle,
                    body: entry.body.clone(),
                }
            })
            .collect()
    }
}

#[async_trait]
impl QueueClient for InMemoryQueue {
    async fn poll(
        &self,
        max_messages: u32,
        wait_time: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let deadline = Instant::now() + wait_time;
        let max_messages = max_messages.max(1) as usize;

        loop {
            let arrived = self.arrivals.notified();
            let batch = self.take_visible(max_messages);
            if !batch.is_empty() || Instant::now() >= deadline {
                return Ok(batch);
            }

            // Wake on a send or at the deadline; lapsed leases are picked up by the final pass.
            let _ = tokio::time::timeout_at(deadline, arrived).await;
        }
    }

    async fn acknowledge(&self, receipt_handle: &str) -> Result<(), QueueError> {
        let now = Instant::now();
        let mut entries = self.lock();
        let position = entries.iter().position(|entry| {
            entry.lease.as_ref().map_or(false, |lease| {
                lease.receipt_handle == receipt_handle && lease.visible_at > now
            })
        });

        match position {
            Some(index) => {
                entries.remove(index);
                Ok(())
            }
            None => Err(QueueError::ReceiptExpired),
        }
    }

    async fn send(&self, body: String) -> Result<(), QueueError> {
        self.lock().push_back(Entry {
            id: Uuid::new_v4().to_string(),
            body,
            receive_count: 0,
            lease: None,
        });
        self.arrivals.notify_waiters();
        Ok(())
    }
}
