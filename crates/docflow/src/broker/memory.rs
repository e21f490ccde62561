//! In-process broker: one bounded `tokio::sync::mpsc` queue per subscriber.

use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Mutex;

use tokio::sync::{mpsc, oneshot};

use super::{Handler, MessageBroker, Subscription};
use crate::error::BrokerError;

pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Default)]
struct Topics {
    subscribers: HashMap<String, Vec<mpsc::Sender<Vec<u8>>>>,
    closed: HashSet<String>,
}

/// Every subscriber owns a queue of `capacity` payloads. Publishing blocks
/// while any subscriber's queue is full, so a slow consumer throttles its
/// producers instead of losing messages.
///
/// `publish` must not be called from inside an async runtime.
pub struct InMemoryBroker {
    capacity: usize,
    topics: Mutex<Topics>,
}

impl InMemoryBroker {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            topics: Mutex::new(Topics::default()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Topics>, BrokerError> {
        self.topics
            .lock()
            .map_err(|_| BrokerError::Closed("broker state poisoned".to_string()))
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl MessageBroker for InMemoryBroker {
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), BrokerError> {
        let targets = {
            let mut topics = self.lock()?;
            if topics.closed.contains(topic) {
                return Err(BrokerError::Closed(topic.to_string()));
            }
            match topics.subscribers.get_mut(topic) {
                Some(senders) => {
                    senders.retain(|sender| !sender.is_closed());
                    senders.clone()
                }
                None => Vec::new(),
            }
        };

        if targets.is_empty() {
            log::debug!("No subscribers on '{}', message dropped", topic);
            return Ok(());
        }
        for sender in targets {
            // Waits for room in this subscriber's queue.
            if sender.blocking_send(payload.to_vec()).is_err() {
                log::debug!("Subscriber on '{}' stopped before delivery", topic);
            }
        }
        Ok(())
    }

    fn subscribe(&self, topic: &str, mut handler: Handler) -> Result<Subscription, BrokerError> {
        let spawn_err = |source| BrokerError::Spawn {
            topic: topic.to_string(),
            source,
        };
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .map_err(spawn_err)?;

        let (sender, mut receiver) = mpsc::channel::<Vec<u8>>(self.capacity);
        {
            let mut topics = self.lock()?;
            if topics.closed.contains(topic) {
                return Err(BrokerError::Closed(topic.to_string()));
            }
            topics
                .subscribers
                .entry(topic.to_string())
                .or_default()
                .push(sender);
        }

        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        let thread_topic = topic.to_string();

        let handle = std::thread::Builder::new()
            .name(format!("dispatch-{}", topic))
            .spawn(move || {
                loop {
                    // Cancellation wins over pending payloads.
                    let next = rt.block_on(async {
                        tokio::select! {
                            biased;
                            _ = &mut cancel_rx => None,
                            received = receiver.recv() => received,
                        }
                    });
                    let Some(payload) = next else { break };

                    // Runs outside the runtime so handlers may publish.
                    let outcome = catch_unwind(AssertUnwindSafe(|| handler(&payload)));
                    if outcome.is_err() {
                        log::error!("Handler on '{}' panicked", thread_topic);
                    }
                }
                log::debug!("Dispatch thread for '{}' stopped", thread_topic);
            })
            .map_err(spawn_err)?;

        Ok(Subscription::new(topic, cancel_tx, handle))
    }

    fn close(&self, topic: &str) {
        match self.lock() {
            Ok(mut topics) => {
                topics.subscribers.remove(topic);
                topics.closed.insert(topic.to_string());
                log::debug!("Closed topic '{}'", topic);
            }
            Err(e) => log::error!("Failed to close '{}': {}", topic, e),
        }
    }
}
