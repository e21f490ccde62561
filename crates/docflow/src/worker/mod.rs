//! Consumer side of the work topics.
//!
//! A [`Worker`] subscribes to every work topic and feeds decoded job ids into
//! a bounded [`WorkerPool`]. The pool runs a [`JobProcessor`] per job.

pub mod pool;
pub mod processor;

use std::sync::Arc;

pub use pool::{JobHandler, WorkerPool};
pub use processor::JobProcessor;

use crate::broker::{work_topics, MessageBroker, Subscription, WorkMessage};
use crate::error::BrokerError;

pub struct Worker {
    pool: Arc<WorkerPool>,
}

impl Worker {
    pub fn new(pool: Arc<WorkerPool>) -> Self {
        Self { pool }
    }

    /// Subscribes to all work topics. Delivery lasts as long as the returned
    /// subscriptions are kept alive.
    pub fn subscribe(&self, broker: &dyn MessageBroker) -> Result<Vec<Subscription>, BrokerError> {
        let mut subscriptions = Vec::new();
        for topic in work_topics() {
            let pool = Arc::clone(&self.pool);
            let subscription =
                broker.subscribe(topic, Box::new(move |payload: &[u8]| dispatch(&pool, topic, payload)))?;
            log::info!("Worker listening on '{}'", topic);
            subscriptions.push(subscription);
        }
        Ok(subscriptions)
    }
}

fn dispatch(pool: &WorkerPool, topic: &str, payload: &[u8]) {
    let message = match WorkMessage::decode(payload) {
        Ok(message) => message,
        Err(e) => {
            log::warn!("Dropping malformed message on '{}': {}", topic, e);
            return;
        }
    };

    let job_id = message.job_id;
    if let Err(e) = pool.submit(job_id.clone()) {
        log::error!("Could not queue job {} from '{}': {}", job_id, topic, e);
    }
}
