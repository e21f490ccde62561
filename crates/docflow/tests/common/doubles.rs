//! Renderer and store doubles.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use docflow::db::DatabaseError;
use docflow::error::{RenderError, StorageError, StoreError};
use docflow::model::{Job, JobStatus, NewJob, NewSubJob, SubJob};
use docflow::render::{RenderRequest, Renderer};
use docflow::storage::ObjectStore;
use docflow::store::JobStore;

/// Writes the concatenated inputs as the result. Needs no external tools.
#[derive(Default)]
pub struct StubRenderer {
    calls: AtomicUsize,
    delay: Duration,
}

impl StubRenderer {
    /// Sleeps for `delay` on every render.
    pub fn slow(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Renderer for StubRenderer {
    fn render(&self, request: &RenderRequest) -> Result<PathBuf, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let mut out = Vec::new();
        for input in &request.inputs {
            let bytes = std::fs::read(input).map_err(|e| RenderError::Io {
                path: input.clone(),
                source: e,
            })?;
            out.extend(bytes);
        }
        let path = request.output_file();
        std::fs::write(&path, out).map_err(|e| RenderError::Io {
            path: path.clone(),
            source: e,
        })?;
        Ok(path)
    }
}

/// Rejects every input.
pub struct RejectingRenderer {
    pub reason: &'static str,
}

impl Renderer for RejectingRenderer {
    fn render(&self, request: &RenderRequest) -> Result<PathBuf, RenderError> {
        Err(RenderError::UnsupportedInput {
            name: request
                .inputs
                .first()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            reason: self.reason.to_string(),
        })
    }
}

/// Object store whose writes fail for keys under `prefix`.
pub struct FailingObjectStore {
    pub inner: Arc<dyn ObjectStore>,
    pub prefix: &'static str,
}

impl ObjectStore for FailingObjectStore {
    fn ensure_bucket(&self) -> Result<(), StorageError> {
        self.inner.ensure_bucket()
    }

    fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError> {
        if path.starts_with(self.prefix) {
            return Err(StorageError::WriteFile {
                path: PathBuf::from(path),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            });
        }
        self.inner.put(path, bytes, content_type)
    }

    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.inner.get(path)
    }

    fn exists(&self, path: &str) -> Result<bool, StorageError> {
        self.inner.exists(path)
    }

    fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.inner.delete(path)
    }
}

/// Job store whose writes can be switched to fail, per kind of write.
pub struct FlakyJobStore {
    pub inner: Arc<dyn JobStore>,
    fail_updates: AtomicBool,
    fail_sub_jobs: AtomicBool,
    fail_output_paths: AtomicBool,
}

fn injected() -> StoreError {
    StoreError::Database(DatabaseError::LockPoisoned)
}

impl FlakyJobStore {
    pub fn new(inner: Arc<dyn JobStore>) -> Self {
        Self {
            inner,
            fail_updates: AtomicBool::new(false),
            fail_sub_jobs: AtomicBool::new(false),
            fail_output_paths: AtomicBool::new(false),
        }
    }

    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_sub_jobs(&self, fail: bool) {
        self.fail_sub_jobs.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_output_paths(&self, fail: bool) {
        self.fail_output_paths.store(fail, Ordering::SeqCst);
    }
}

impl JobStore for FlakyJobStore {
    fn create_job(&self, job: NewJob) -> Result<Job, StoreError> {
        self.inner.create_job(job)
    }

    fn find_job(&self, id: &str) -> Result<Job, StoreError> {
        self.inner.find_job(id)
    }

    fn update_status(
        &self,
        id: &str,
        status: JobStatus,
        error: Option<&str>,
    ) -> Result<Job, StoreError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.update_status(id, status, error)
    }

    fn create_sub_job(&self, sub_job: NewSubJob) -> Result<SubJob, StoreError> {
        if self.fail_sub_jobs.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.create_sub_job(sub_job)
    }

    fn sub_jobs_for(&self, job_id: &str) -> Result<Vec<SubJob>, StoreError> {
        self.inner.sub_jobs_for(job_id)
    }

    fn set_output_path(&self, sub_job_id: &str, output_path: &str) -> Result<(), StoreError> {
        if self.fail_output_paths.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.set_output_path(sub_job_id, output_path)
    }

    fn list_sub_jobs(&self, limit: u64) -> Result<Vec<SubJob>, StoreError> {
        self.inner.list_sub_jobs(limit)
    }

    fn list_jobs(&self, status: Option<JobStatus>, limit: u64) -> Result<Vec<Job>, StoreError> {
        self.inner.list_jobs(status, limit)
    }
}
