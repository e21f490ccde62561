//! Runs one job end to end: fetch inputs, render, store the result and
//! announce the outcome on the results topic.

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use super::pool::JobHandler;
use crate::broker::{CompletionMessage, MessageBroker, RESULTS_TOPIC};
use crate::error::{RenderError, Result, StoreError};
use crate::model::{JobStatus, SubJob};
use crate::render::{RenderRequest, Renderer};
use crate::sanitize::{redact_name, safe_extension};
use crate::storage::{content_type_for, ObjectStore};
use crate::store::JobStore;

pub struct JobProcessor {
    jobs: Arc<dyn JobStore>,
    objects: Arc<dyn ObjectStore>,
    broker: Arc<dyn MessageBroker>,
    renderer: Arc<dyn Renderer>,
}

impl JobProcessor {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        objects: Arc<dyn ObjectStore>,
        broker: Arc<dyn MessageBroker>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self {
            jobs,
            objects,
            broker,
            renderer,
        }
    }

    /// Processes `job_id` and returns the completion to announce.
    ///
    /// Returns `None` when the job is already terminal, which happens when a
    /// work message is seen twice.
    pub fn process(&self, job_id: &str) -> Option<CompletionMessage> {
        let _span = tracing::info_span!("worker.process", job_id = %job_id).entered();

        if !self.mark_processing(job_id) {
            return None;
        }

        match self.run(job_id) {
            Ok(output_path) => {
                log::info!("Job {} completed: {}", job_id, output_path);
                Some(CompletionMessage::completed(job_id))
            }
            Err(e) => {
                log::warn!("Job {} failed: {}", job_id, e);
                Some(CompletionMessage::failed(job_id, e.to_string()))
            }
        }
    }

    /// Best effort. Returns false only when the job is already terminal.
    fn mark_processing(&self, job_id: &str) -> bool {
        match self.jobs.update_status(job_id, JobStatus::Processing, None) {
            Ok(_) => true,
            Err(StoreError::InvalidTransition { from, .. }) if from.is_terminal() => {
                log::warn!("Skipping job {}: already {}", job_id, from);
                false
            }
            Err(e) => {
                log::warn!("Could not mark job {} PROCESSING: {}", job_id, e);
                true
            }
        }
    }

    fn run(&self, job_id: &str) -> Result<String> {
        let job = self.jobs.find_job(job_id)?;
        let sub_jobs = self.jobs.sub_jobs_for(job_id)?;
        let operation = match sub_jobs.first() {
            Some(first) => first.operation,
            None => {
                return Err(StoreError::Corrupt {
                    id: job_id.to_string(),
                    reason: "job has no artifact records".to_string(),
                }
                .into())
            }
        };

        let scratch = tempfile::Builder::new()
            .prefix("docflow-")
            .tempdir()
            .map_err(|e| RenderError::Io {
                path: std::env::temp_dir(),
                source: e,
            })?;
        let inputs = self.download_inputs(&scratch, &sub_jobs)?;

        let output_dir = scratch.path().join("out");
        std::fs::create_dir_all(&output_dir).map_err(|e| RenderError::Io {
            path: output_dir.clone(),
            source: e,
        })?;

        let request = RenderRequest {
            operation,
            inputs,
            params: job.params.clone(),
            output_dir,
        };
        let output_file = {
            let _span = tracing::debug_span!("worker.render", operation = %operation).entered();
            self.renderer.render(&request)?
        };
        let bytes = std::fs::read(&output_file).map_err(|e| RenderError::Io {
            path: output_file.clone(),
            source: e,
        })?;

        let output_path = operation.output_path(job_id);
        self.objects
            .put(&output_path, &bytes, &content_type_for(&output_path))?;
        if let Err(e) = self.record_output(&sub_jobs, &output_path) {
            // The job will end FAILED, so the artifact must not stay behind.
            if let Err(cleanup) = self.objects.delete(&output_path) {
                log::error!("Could not remove {} for job {}: {}", output_path, job_id, cleanup);
            }
            return Err(e.into());
        }

        Ok(output_path)
    }

    fn record_output(&self, sub_jobs: &[SubJob], output_path: &str) -> std::result::Result<(), StoreError> {
        for sub_job in sub_jobs {
            self.jobs.set_output_path(&sub_job.id, output_path)?;
        }
        Ok(())
    }

    fn download_inputs(&self, scratch: &TempDir, sub_jobs: &[SubJob]) -> Result<Vec<PathBuf>> {
        let mut inputs = Vec::with_capacity(sub_jobs.len());
        for (index, sub_job) in sub_jobs.iter().enumerate() {
            let bytes = self.objects.get(&sub_job.source_path)?;
            let path = scratch.path().join(format!(
                "input_{}.{}",
                index,
                safe_extension(&sub_job.source_path)
            ));
            std::fs::write(&path, bytes).map_err(|e| RenderError::Io {
                path: path.clone(),
                source: e,
            })?;
            log::debug!(
                "Fetched {} for job {}",
                redact_name(&sub_job.original_name),
                sub_job.job_id
            );
            inputs.push(path);
        }
        Ok(inputs)
    }

    fn publish(&self, message: &CompletionMessage) {
        let published = message
            .encode()
            .and_then(|payload| self.broker.publish(RESULTS_TOPIC, &payload));
        if let Err(e) = published {
            log::error!(
                "Failed to publish {} for job {}: {}",
                JobStatus::from(message.status),
                message.job_id,
                e
            );
        }
    }
}

impl JobHandler for JobProcessor {
    fn handle(&self, job_id: &str) {
        if let Some(message) = self.process(job_id) {
            self.publish(&message);
        }
    }
}
