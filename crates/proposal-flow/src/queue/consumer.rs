use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::{QueueClient, QueueMessage};
use crate::events;

/// Business handler invoked for every decoded envelope.
///
/// Returning an error leaves the message un-acknowledged, so the queue redelivers it once the
/// visibility timeout lapses.
#[async_trait]
pub trait EventHandler: Send + Sync {
    type Event: DeserializeOwned + Send;
    type Error: std::error::Error + Send + Sync + 'static;

    async fn handle(&self, event: Self::Event) -> Result<(), Self::Error>;
}

/// Cadence and batch sizing for one consumer.
#[derive(Debug, Clone)]
pub struct ConsumerSettings {
    /// Label used in log fields.
    pub name: String,
    pub poll_interval: Duration,
    pub max_messages: u32,
    pub wait_time: Duration,
}

impl ConsumerSettings {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            poll_interval: Duration::from_secs(5),
            max_messages: 10,
            wait_time: Duration::from_secs(5),
        }
    }

    pub fn from_queue_config(name: impl Into<String>, config: &crate::config::QueueConfig) -> Self {
        Self {
            name: name.into(),
            poll_interval: config.poll_interval,
            max_messages: config.max_messages,
            wait_time: config.wait_time,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerStatus {
    Idle,
    Running,
    Stopping,
    Stopped,
}

#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    #[error("consumer '{0}' is already running")]
    AlreadyRunning(String),
}

/// Tally of one Poll→Handle→Acknowledge cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub received: usize,
    pub acknowledged: usize,
    /// Undecodable messages deleted without reaching the handler.
    pub dropped: usize,
    /// Messages left for redelivery after a handler failure.
    pub retained: usize,
    pub ack_failures: usize,
    pub poll_failed: bool,
}

enum Lifecycle {
    Idle,
    Running {
        stop: watch::Sender<bool>,
        task: JoinHandle<()>,
    },
    /// Flips to `true` once the task has been joined.
    Stopping(watch::Receiver<bool>),
    Stopped,
}

enum StopClaim {
    Owner {
        stop: watch::Sender<bool>,
        task: JoinHandle<()>,
        done: watch::Sender<bool>,
    },
    Waiter(watch::Receiver<bool>),
}

struct Worker<Q, H> {
    queue: Arc<Q>,
    handler: Arc<H>,
    settings: ConsumerSettings,
}

/// Polls one queue on a fixed interval and feeds each message to an [`EventHandler`].
///
/// Messages in a batch are handled sequentially in receipt order and the next poll only
/// happens after the current batch finishes, so at most one batch is ever in flight.
pub struct QueueConsumer<Q, H> {
    worker: Arc<Worker<Q, H>>,
    lifecycle: Mutex<Lifecycle>,
}

impl<Q, H> QueueConsumer<Q, H>
where
    Q: QueueClient + 'static,
    H: EventHandler + 'static,
{
    pub fn new(queue: Arc<Q>, handler: Arc<H>, settings: ConsumerSettings) -> Self {
        Self {
            worker: Arc::new(Worker {
                queue,
                handler,
                settings,
            }),
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    pub fn status(&self) -> ConsumerStatus {
        match *self.lock() {
            Lifecycle::Idle => ConsumerStatus::Idle,
            Lifecycle::Running { .. } => ConsumerStatus::Running,
            Lifecycle::Stopping(_) => ConsumerStatus::Stopping,
            Lifecycle::Stopped => ConsumerStatus::Stopped,
        }
    }

    /// Spawns the polling task. The first cycle runs immediately.
    pub fn start(&self) -> Result<(), ConsumerError> {
        let mut lifecycle = self.lock();
        if matches!(*lifecycle, Lifecycle::Running { .. } | Lifecycle::Stopping(_)) {
            return Err(ConsumerError::AlreadyRunning(
                self.worker.settings.name.clone(),
            ));
        }

        let (stop, stop_rx) = watch::channel(false);
        let worker = Arc::clone(&self.worker);
        let task = tokio::spawn(async move { worker.run(stop_rx).await });

        info!(consumer = %self.worker.settings.name, "consumer started");
        *lifecycle = Lifecycle::Running { stop, task };
        Ok(())
    }

    /// Signals the polling task and waits for the in-flight cycle to finish.
    ///
    /// Concurrent callers all return only after the task has been joined.
    pub async fn stop(&self) {
        let claim = {
            let mut lifecycle = self.lock();
            match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
                Lifecycle::Running { stop, task } => {
                    let (done, done_rx) = watch::channel(false);
                    *lifecycle = Lifecycle::Stopping(done_rx);
                    StopClaim::Owner { stop, task, done }
                }
                Lifecycle::Stopping(done_rx) => {
                    *lifecycle = Lifecycle::Stopping(done_rx.clone());
                    StopClaim::Waiter(done_rx)
                }
                other => {
                    *lifecycle = other;
                    return;
                }
            }
        };

        let (stop, task, done) = match claim {
            StopClaim::Owner { stop, task, done } => (stop, task, done),
            StopClaim::Waiter(mut done_rx) => {
                let _ = done_rx.wait_for(|finished| *finished).await;
                return;
            }
        };

        let _ = stop.send(true);
        if let Err(err) = task.await {
            error!(
                consumer = %self.worker.settings.name,
                error = %err,
                "consumer task ended abnormally"
            );
        }

        *self.lock() = Lifecycle::Stopped;
        let _ = done.send(true);
        info!(consumer = %self.worker.settings.name, "consumer stopped");
    }

    /// Runs a single cycle on the caller's task.
    pub async fn poll_once(&self) -> BatchReport {
        self.worker.run_cycle().await
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Lifecycle> {
        self.lifecycle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

enum Disposition {
    Handled,
    Dropped,
    Retained,
}

impl<Q, H> Worker<Q, H>
where
    Q: QueueClient,
    H: EventHandler,
{
    async fn run(&self, mut stop: watch::Receiver<bool>) {
        let period = self.settings.poll_interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        debug!(consumer = %self.settings.name, "stop signal observed");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
            }
        }
    }

    async fn run_cycle(&self) -> BatchReport {
        let messages = match self
            .queue
            .poll(self.settings.max_messages, self.settings.wait_time)
            .await
        {
            Ok(messages) => messages,
            Err(err) => {
                error!(consumer = %self.settings.name, error = %err, "failed to receive messages");
                return BatchReport {
                    poll_failed: true,
                    ..BatchReport::default()
                };
            }
        };

        let mut report = BatchReport {
            received: messages.len(),
            ..BatchReport::default()
        };

        for message in messages {
            let disposition = self.process(&message).await;
            if matches!(disposition, Disposition::Retained) {
                report.retained += 1;
                continue;
            }

            match self.queue.acknowledge(&message.receipt_handle).await {
                Ok(()) => match disposition {
                    Disposition::Dropped => report.dropped += 1,
                    _ => report.acknowledged += 1,
                },
                Err(err) => {
                    report.ack_failures += 1;
                    warn!(
                        consumer = %self.settings.name,
                        message_id = %message.id,
                        error = %err,
                        "failed to acknowledge message; it may be redelivered"
                    );
                }
            }
        }

        report
    }

    async fn process(&self, message: &QueueMessage) -> Disposition {
        let event = match events::decode::<H::Event>(&message.body) {
            Ok(event) => event,
            Err(err) => {
                warn!(
                    consumer = %self.settings.name,
                    message_id = %message.id,
                    error = %err,
                    "dropping undecodable message"
                );
                return Disposition::Dropped;
            }
        };

        debug!(consumer = %self.settings.name, message_id = %message.id, "processing message");
        match self.handler.handle(event).await {
            Ok(()) => Disposition::Handled,
            Err(err) => {
                error!(
                    consumer = %self.settings.name,
                    message_id = %message.id,
                    error = %err,
                    "handler failed; leaving message for redelivery"
                );
                Disposition::Retained
            }
        }
    }
}
