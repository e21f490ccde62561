//! Publish/subscribe transport between submission, workers and the reconciler.

pub mod memory;
pub mod message;

use std::thread::JoinHandle;

use tokio::sync::oneshot;

pub use memory::InMemoryBroker;
pub use message::{CompletionMessage, CompletionStatus, WorkMessage, SCHEMA_VERSION};

use crate::error::BrokerError;
use crate::model::JobType;

pub const CONVERT_TOPIC: &str = "docflow.jobs.convert";
pub const COMPRESS_TOPIC: &str = "docflow.jobs.compress";
pub const MERGE_TOPIC: &str = "docflow.jobs.merge";
pub const SPLIT_TOPIC: &str = "docflow.jobs.split";
pub const RESULTS_TOPIC: &str = "docflow.jobs.results";

/// Work topic carrying jobs of `job_type`.
pub fn work_topic(job_type: JobType) -> &'static str {
    match job_type {
        JobType::Convert => CONVERT_TOPIC,
        JobType::Compress => COMPRESS_TOPIC,
        JobType::Merge => MERGE_TOPIC,
        JobType::Split => SPLIT_TOPIC,
    }
}

pub fn work_topics() -> impl Iterator<Item = &'static str> {
    JobType::ALL.into_iter().map(work_topic)
}

/// Callback invoked once per delivered payload on the subscription's
/// dispatch thread.
pub type Handler = Box<dyn FnMut(&[u8]) + Send + 'static>;

/// Topic transport. No acknowledgements, no redelivery.
pub trait MessageBroker: Send + Sync {
    /// Hands `payload` to every current subscriber of `topic`, waiting while
    /// a subscriber's queue is full. Publishing to a topic nobody listens on
    /// succeeds and the payload is dropped.
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), BrokerError>;

    /// Registers `handler` for every payload published on `topic` after
    /// this call returns. Delivery stops when the returned [`Subscription`]
    /// is dropped or the topic is closed.
    fn subscribe(&self, topic: &str, handler: Handler) -> Result<Subscription, BrokerError>;

    /// Stops accepting publishes on `topic`. Subscribers drain what is
    /// already buffered, then their dispatch threads exit.
    fn close(&self, topic: &str);
}

/// Handle to a running dispatch thread.
pub struct Subscription {
    topic: String,
    cancel: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(topic: &str, cancel: oneshot::Sender<()>, handle: JoinHandle<()>) -> Self {
        Self {
            topic: topic.to_string(),
            cancel: Some(cancel),
            handle: Some(handle),
        }
    }

    /// Blocks until the dispatch thread exits, i.e. until the topic closes.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Dispatch thread for '{}' panicked", self.topic);
            }
        }
    }

    /// Stops delivery now, dropping anything still buffered.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        self.join();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }
}
