//! Applies worker completion messages to the job store.
//!
//! Messages arrive at most once and possibly more than once. Applying them is
//! idempotent and a terminal status is never overwritten with another.

use std::sync::Arc;

use crate::broker::{CompletionMessage, MessageBroker, Subscription, RESULTS_TOPIC};
use crate::error::{BrokerError, StoreError};
use crate::model::JobStatus;
use crate::store::JobStore;

/// What a completion message did to its job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The job moved to the reported status.
    Applied,
    /// The job already had the reported status.
    Unchanged,
    /// The job is terminal with a different status; the message was ignored.
    Discarded,
}

pub struct NotificationReconciler {
    jobs: Arc<dyn JobStore>,
}

impl NotificationReconciler {
    pub fn new(jobs: Arc<dyn JobStore>) -> Self {
        Self { jobs }
    }

    pub fn apply(&self, message: &CompletionMessage) -> Result<Outcome, StoreError> {
        let target = JobStatus::from(message.status);
        let current = self.jobs.find_job(&message.job_id)?;

        if current.status == target {
            self.jobs
                .update_status(&message.job_id, target, message.error.as_deref())?;
            return Ok(Outcome::Unchanged);
        }
        if current.status.is_terminal() {
            log::warn!(
                "Ignoring {} for job {}: already {}",
                target,
                message.job_id,
                current.status
            );
            return Ok(Outcome::Discarded);
        }

        match self
            .jobs
            .update_status(&message.job_id, target, message.error.as_deref())
        {
            Ok(_) => Ok(Outcome::Applied),
            // Lost a race with another writer that already finished the job.
            Err(StoreError::InvalidTransition { from, .. }) => {
                log::warn!(
                    "Ignoring {} for job {}: already {}",
                    target,
                    message.job_id,
                    from
                );
                Ok(Outcome::Discarded)
            }
            Err(e) => Err(e),
        }
    }

    /// Decodes and applies one payload. Anything that cannot be applied is
    /// logged and dropped.
    pub fn handle_payload(&self, payload: &[u8]) -> Option<Outcome> {
        let message = match CompletionMessage::decode(payload) {
            Ok(message) => message,
            Err(e) => {
                log::warn!("Dropping malformed completion message: {}", e);
                return None;
            }
        };

        let _span = tracing::info_span!(
            "reconciler.apply",
            job_id = %message.job_id,
            status = %JobStatus::from(message.status)
        )
        .entered();

        match self.apply(&message) {
            Ok(outcome) => {
                log::debug!("Job {}: {:?}", message.job_id, outcome);
                Some(outcome)
            }
            Err(StoreError::NotFound { id }) => {
                log::warn!("Dropping completion for unknown job {}", id);
                None
            }
            Err(e) => {
                log::error!(
                    "Failed to record completion of job {}: {}",
                    message.job_id,
                    e
                );
                None
            }
        }
    }

    /// Starts applying messages from the results topic on the broker's
    /// dispatch thread.
    pub fn subscribe(self: &Arc<Self>, broker: &dyn MessageBroker) -> Result<Subscription, BrokerError> {
        let reconciler = Arc::clone(self);
        let subscription = broker.subscribe(
            RESULTS_TOPIC,
            Box::new(move |payload: &[u8]| {
                reconciler.handle_payload(payload);
            }),
        )?;
        log::info!("Reconciler listening on '{}'", RESULTS_TOPIC);
        Ok(subscription)
    }
}
