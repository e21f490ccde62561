use std::time::{Duration, Instant};

use thiserror::Error;

use crate::error::StoreError;
use crate::model::Job;
use crate::store::JobStore;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Error, Debug)]
pub enum WaitError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Job '{job_id}' did not finish within {waited:?}")]
    Timeout { job_id: String, waited: Duration },
}

/// Polls the store until `job_id` reaches COMPLETED or FAILED.
///
/// Both terminal states are returned as `Ok`; callers inspect the status.
pub fn wait_for_terminal(
    store: &dyn JobStore,
    job_id: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Job, WaitError> {
    let deadline = Instant::now() + timeout;

    loop {
        let job = store.find_job(job_id)?;
        if job.is_finished() {
            return Ok(job);
        }
        if Instant::now() >= deadline {
            return Err(WaitError::Timeout {
                job_id: job_id.to_string(),
                waited: timeout,
            });
        }
        std::thread::sleep(poll_interval);
    }
}
