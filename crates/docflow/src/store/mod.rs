//! Database of record for jobs and their artifact records.

pub mod sqlite;

pub use sqlite::SqliteJobStore;

use crate::error::StoreError;
use crate::model::{Job, JobStatus, NewJob, NewSubJob, SubJob};

/// Durable job storage shared by submission, workers and the reconciler.
pub trait JobStore: Send + Sync {
    /// Persists a new job in PENDING and returns it with its assigned id.
    fn create_job(&self, job: NewJob) -> Result<Job, StoreError>;

    fn find_job(&self, id: &str) -> Result<Job, StoreError>;

    /// Moves a job to `status` as one read-modify-write.
    ///
    /// Rejects regressions with [`StoreError::InvalidTransition`]. Writing the
    /// current status again succeeds and leaves `error` untouched.
    fn update_status(
        &self,
        id: &str,
        status: JobStatus,
        error: Option<&str>,
    ) -> Result<Job, StoreError>;

    fn create_sub_job(&self, sub_job: NewSubJob) -> Result<SubJob, StoreError>;

    /// Sub-jobs of `job_id` in upload order.
    fn sub_jobs_for(&self, job_id: &str) -> Result<Vec<SubJob>, StoreError>;

    fn set_output_path(&self, sub_job_id: &str, output_path: &str) -> Result<(), StoreError>;

    /// Most recently created sub-jobs first.
    fn list_sub_jobs(&self, limit: u64) -> Result<Vec<SubJob>, StoreError>;

    /// Jobs newest first, optionally filtered by status.
    fn list_jobs(&self, status: Option<JobStatus>, limit: u64) -> Result<Vec<Job>, StoreError>;
}
