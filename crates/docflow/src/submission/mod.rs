//! Producer side of the pipeline.
//!
//! `submit_job` validates, creates the job row, uploads every input, records
//! one sub-job per input and publishes a single work message. The three
//! stores share no transaction: a failure after the job row exists marks the
//! job FAILED (best effort, never retried) and nothing is rolled back.

pub mod error;
pub mod request;
pub mod validate;
pub mod wait;

use std::sync::Arc;
use std::time::Duration;

pub use error::{ErrorBody, FailureKind, SubmitError};
pub use request::{Accepted, SubmitRequest, UploadedFile};
pub use validate::validate;
pub use wait::{wait_for_terminal, WaitError, DEFAULT_POLL_INTERVAL};

use crate::broker::{work_topic, MessageBroker, WorkMessage};
use crate::error::StoreError;
use crate::model::{Job, JobStatus, NewJob, NewSubJob, SubJob};
use crate::sanitize::{redact_name, safe_extension};
use crate::storage::{content_type_for, ObjectStore};
use crate::store::JobStore;

pub const DEFAULT_ARTIFACT_LIMIT: u64 = 50;

/// Object-store key for an uploaded input.
///
/// Single-file jobs use `uploads/<job id>.<ext>`, multi-file jobs
/// `uploads/<job id>_<index>.<ext>` with a 0-based index.
pub fn upload_path(job_id: &str, index: usize, multi: bool, file_name: &str) -> String {
    let ext = safe_extension(file_name);
    if multi {
        format!("uploads/{}_{}.{}", job_id, index, ext)
    } else {
        format!("uploads/{}.{}", job_id, ext)
    }
}

pub struct SubmissionService {
    jobs: Arc<dyn JobStore>,
    objects: Arc<dyn ObjectStore>,
    broker: Arc<dyn MessageBroker>,
}

impl SubmissionService {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        objects: Arc<dyn ObjectStore>,
        broker: Arc<dyn MessageBroker>,
    ) -> Self {
        Self {
            jobs,
            objects,
            broker,
        }
    }

    pub fn submit_job(&self, request: SubmitRequest) -> Result<Accepted, SubmitError> {
        let operation = request.operation;
        let _span = tracing::info_span!(
            "submission.submit",
            operation = %operation,
            files = request.files.len()
        )
        .entered();

        validate(&request)?;

        let job = self
            .jobs
            .create_job(NewJob {
                original_filename: request.files[0].name.clone(),
                job_type: operation.job_type(),
                params: request.params.clone(),
                submitted_by: request.identity.as_ref().map(|i| i.user_id.clone()),
            })
            .map_err(|e| {
                log::error!("Failed to create job for {}: {}", operation, e);
                SubmitError::store(None, &e)
            })?;

        let multi = request.files.len() > 1;
        let mut uploaded = Vec::with_capacity(request.files.len());
        for (index, file) in request.files.iter().enumerate() {
            let path = upload_path(&job.id, index, multi, &file.name);
            if let Err(e) = self
                .objects
                .put(&path, &file.bytes, &content_type_for(&file.name))
            {
                log::error!(
                    "Upload of {} for job {} failed: {}",
                    redact_name(&file.name),
                    job.id,
                    e
                );
                return Err(self.fail(SubmitError::storage(&job.id, &e)));
            }
            uploaded.push((file, path));
        }

        for (file, source_path) in uploaded {
            let created = self.jobs.create_sub_job(NewSubJob {
                job_id: job.id.clone(),
                original_name: file.name.clone(),
                file_size: file.size(),
                operation,
                source_path,
            });
            if let Err(e) = created {
                log::error!("Failed to record artifact for job {}: {}", job.id, e);
                return Err(self.fail(SubmitError::store(Some(&job.id), &e)));
            }
        }

        let topic = work_topic(operation.job_type());
        let published = WorkMessage::new(&job.id)
            .encode()
            .and_then(|payload| self.broker.publish(topic, &payload));
        if let Err(e) = published {
            log::error!("Failed to publish job {} on '{}': {}", job.id, topic, e);
            return Err(self.fail(SubmitError::transport(&job.id, &e)));
        }

        log::info!(
            "Accepted job {} ({}, {} file(s), first: {})",
            job.id,
            operation,
            request.files.len(),
            redact_name(&request.files[0].name)
        );

        Ok(Accepted {
            job_id: job.id,
            status: JobStatus::Pending,
        })
    }

    /// Marks the job FAILED with the error text and hands the error back.
    fn fail(&self, error: SubmitError) -> SubmitError {
        if let Some(job_id) = error.job_id() {
            self.mark_failed(job_id, &error.to_string());
        }
        error
    }

    fn mark_failed(&self, job_id: &str, reason: &str) {
        match self.jobs.update_status(job_id, JobStatus::Failed, Some(reason)) {
            Ok(_) => log::warn!("Marked job {} FAILED: {}", job_id, reason),
            Err(e) => log::error!(
                "Could not mark job {} FAILED ({}); it stays PENDING: {}",
                job_id,
                reason,
                e
            ),
        }
    }

    pub fn get_job(&self, job_id: &str) -> Result<Job, SubmitError> {
        self.jobs.find_job(job_id).map_err(|e| match e {
            StoreError::NotFound { id } => SubmitError::NotFound(id),
            other => SubmitError::store(Some(job_id), &other),
        })
    }

    /// Sub-jobs of one job in upload order.
    pub fn job_artifacts(&self, job_id: &str) -> Result<Vec<SubJob>, SubmitError> {
        self.get_job(job_id)?;
        self.jobs
            .sub_jobs_for(job_id)
            .map_err(|e| SubmitError::store(Some(job_id), &e))
    }

    /// Most recent artifacts first. `None` uses [`DEFAULT_ARTIFACT_LIMIT`].
    pub fn list_artifacts(&self, limit: Option<u64>) -> Result<Vec<SubJob>, SubmitError> {
        self.jobs
            .list_sub_jobs(limit.unwrap_or(DEFAULT_ARTIFACT_LIMIT))
            .map_err(|e| SubmitError::store(None, &e))
    }

    pub fn list_jobs(&self, status: Option<JobStatus>, limit: u64) -> Result<Vec<Job>, SubmitError> {
        self.jobs
            .list_jobs(status, limit)
            .map_err(|e| SubmitError::store(None, &e))
    }

    pub fn wait_for_terminal(&self, job_id: &str, timeout: Duration) -> Result<Job, WaitError> {
        wait_for_terminal(self.jobs.as_ref(), job_id, timeout, DEFAULT_POLL_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::InMemoryBroker;
    use crate::error::ValidationError;
    use crate::model::{Identity, JobParams, Operation};
    use crate::storage::FileObjectStore;
    use crate::store::SqliteJobStore;
    use std::sync::mpsc;
    use tempfile::TempDir;

    struct Harness {
        _dir: TempDir,
        jobs: Arc<SqliteJobStore>,
        objects: Arc<FileObjectStore>,
        broker: Arc<InMemoryBroker>,
        service: SubmissionService,
    }

    fn harness() -> Harness {
        let dir = TempDir::new().unwrap();
        let jobs = Arc::new(SqliteJobStore::in_memory().unwrap());
        let objects = Arc::new(FileObjectStore::new(dir.path(), "docflow"));
        objects.ensure_bucket().unwrap();
        let broker = Arc::new(InMemoryBroker::default());
        let service = SubmissionService::new(jobs.clone(), objects.clone(), broker.clone());
        Harness {
            _dir: dir,
            jobs,
            objects,
            broker,
            service,
        }
    }

    fn pdf(name: &str) -> UploadedFile {
        UploadedFile::new(name, b"%PDF-1.5 test".to_vec())
    }

    #[test]
    fn test_upload_path() {
        assert_eq!(upload_path("j", 0, false, "a.PDF"), "uploads/j.pdf");
        assert_eq!(upload_path("j", 2, true, "b.png"), "uploads/j_2.png");
        assert_eq!(upload_path("j", 0, false, "noext"), "uploads/j.bin");
    }

    #[test]
    fn test_submit_single_file() {
        let h = harness();
        let (tx, rx) = mpsc::channel();
        let _sub = h
            .broker
            .subscribe(
                crate::broker::COMPRESS_TOPIC,
                Box::new(move |p: &[u8]| {
                    let _ = tx.send(p.to_vec());
                }),
            )
            .unwrap();

        let request = SubmitRequest::new(Operation::Compress, vec![pdf("scan.pdf")])
            .with_identity(Identity {
                user_id: "u-1".to_string(),
                roles: vec![],
            });
        let accepted = h.service.submit_job(request).unwrap();
        assert_eq!(accepted.status, JobStatus::Pending);

        let job = h.service.get_job(&accepted.job_id).unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.submitted_by.as_deref(), Some("u-1"));

        let subs = h.service.job_artifacts(&accepted.job_id).unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].source_path, format!("uploads/{}.pdf", accepted.job_id));
        assert!(h.objects.exists(&subs[0].source_path).unwrap());

        let payload = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(WorkMessage::decode(&payload).unwrap().job_id, accepted.job_id);
    }

    #[test]
    fn test_submit_merge_creates_sub_job_per_file() {
        let h = harness();
        let files = vec![pdf("a.pdf"), pdf("b.pdf"), pdf("c.pdf")];
        let accepted = h
            .service
            .submit_job(SubmitRequest::new(Operation::Merge, files))
            .unwrap();

        let subs = h.jobs.sub_jobs_for(&accepted.job_id).unwrap();
        assert_eq!(subs.len(), 3);
        for (i, sub) in subs.iter().enumerate() {
            assert_eq!(sub.operation, Operation::Merge);
            assert_eq!(sub.source_path, format!("uploads/{}_{}.pdf", accepted.job_id, i));
        }
    }

    #[test]
    fn test_validation_failure_persists_nothing() {
        let h = harness();
        let err = h
            .service
            .submit_job(SubmitRequest::new(Operation::Merge, vec![pdf("a.pdf")]))
            .unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Validation(ValidationError::TooFewFiles { .. })
        ));
        assert_eq!(err.status_code(), 400);
        assert!(h.jobs.list_jobs(None, 10).unwrap().is_empty());
    }

    #[test]
    fn test_split_without_ranges_is_rejected() {
        let h = harness();
        let request = SubmitRequest::new(Operation::Split, vec![pdf("a.pdf")]).with_params(JobParams {
            page_ranges: Some(" ".to_string()),
            ..Default::default()
        });
        let err = h.service.submit_job(request).unwrap_err();
        assert!(matches!(err, SubmitError::Validation(_)));
        assert!(h.jobs.list_jobs(None, 10).unwrap().is_empty());
    }

    #[test]
    fn test_get_missing_job() {
        let h = harness();
        let err = h.service.get_job("nope").unwrap_err();
        assert!(matches!(err, SubmitError::NotFound(_)));
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_publish_failure_marks_job_failed() {
        let h = harness();
        h.broker.close(crate::broker::CONVERT_TOPIC);

        let err = h
            .service
            .submit_job(SubmitRequest::new(Operation::ToJpg, vec![pdf("a.pdf")]))
            .unwrap_err();
        let job_id = match &err {
            SubmitError::Internal {
                job_id: Some(id),
                kind: FailureKind::Transport,
                ..
            } => id.clone(),
            other => panic!("unexpected error: {:?}", other),
        };

        let job = h.service.get_job(&job_id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some(err.to_string().as_str()));
        // Inputs already uploaded stay where they are.
        assert!(h.objects.exists(&format!("uploads/{}.pdf", job_id)).unwrap());
    }

    #[test]
    fn test_list_artifacts_newest_first() {
        let h = harness();
        let first = h
            .service
            .submit_job(SubmitRequest::new(Operation::Compress, vec![pdf("a.pdf")]))
            .unwrap();
        let second = h
            .service
            .submit_job(SubmitRequest::new(Operation::Compress, vec![pdf("b.pdf")]))
            .unwrap();

        let artifacts = h.service.list_artifacts(None).unwrap();
        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].job_id, second.job_id);
        assert_eq!(artifacts[1].job_id, first.job_id);

        assert_eq!(h.service.list_artifacts(Some(1)).unwrap().len(), 1);
    }
}
