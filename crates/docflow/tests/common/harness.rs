//! Test harness for isolated pipeline runs.
//!
//! Every harness owns a temp directory holding the SQLite file and the
//! object-store bucket, an in-process broker, and optionally a running
//! worker + reconciler.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use docflow::broker::InMemoryBroker;
use docflow::config::WorkerConfig;
use docflow::db::Database;
use docflow::model::{Job, Operation};
use docflow::render::Renderer;
use docflow::runtime::{Components, Runtime};
use docflow::storage::{FileObjectStore, ObjectStore};
use docflow::store::{JobStore, SqliteJobStore};
use docflow::submission::{Accepted, SubmissionService, SubmitRequest, UploadedFile};

use super::StubRenderer;

pub const WAIT: Duration = Duration::from_secs(15);

pub struct TestHarness {
    temp_dir: TempDir,
    pub jobs: Arc<SqliteJobStore>,
    pub objects: Arc<FileObjectStore>,
    pub broker: Arc<InMemoryBroker>,
    components: Components,
    runtime: Option<Runtime>,
}

impl TestHarness {
    /// Running pipeline with the stub renderer.
    pub fn new() -> Self {
        Self::with_renderer(Arc::new(StubRenderer::default()))
    }

    pub fn with_renderer(renderer: Arc<dyn Renderer>) -> Self {
        let mut harness = Self::idle(renderer);
        harness.start();
        harness
    }

    /// Stores and broker only. Nothing consumes the work topics until
    /// [`TestHarness::start`] is called.
    pub fn idle(renderer: Arc<dyn Renderer>) -> Self {
        Self::idle_with_broker(renderer, InMemoryBroker::default())
    }

    pub fn idle_with_broker(renderer: Arc<dyn Renderer>, broker: InMemoryBroker) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::open(&temp_dir.path().join("docflow.db")).expect("open database");
        let jobs = Arc::new(SqliteJobStore::new(db));
        let objects = Arc::new(FileObjectStore::new(temp_dir.path().join("objects"), "docflow"));
        objects.ensure_bucket().expect("create bucket");
        let broker = Arc::new(broker);

        let components = Components {
            jobs: jobs.clone(),
            objects: objects.clone(),
            broker: broker.clone(),
            renderer,
        };

        Self {
            temp_dir,
            jobs,
            objects,
            broker,
            components,
            runtime: None,
        }
    }

    pub fn start(&mut self) {
        self.start_with(&WorkerConfig {
            worker_count: 2,
            queue_capacity: Some(4),
        });
    }

    pub fn start_with(&mut self, worker: &WorkerConfig) {
        if self.runtime.is_none() {
            self.runtime =
                Some(Runtime::start(self.components.clone(), worker).expect("start runtime"));
        }
    }

    /// Routes the runtime and [`TestHarness::service`] through `jobs`.
    /// Call before starting.
    pub fn use_job_store(&mut self, jobs: Arc<dyn JobStore>) {
        self.components.jobs = jobs;
    }

    pub fn components(&self) -> &Components {
        &self.components
    }

    pub fn service(&self) -> SubmissionService {
        self.components.submission()
    }

    pub fn submit(&self, operation: Operation, files: Vec<UploadedFile>) -> Accepted {
        self.service()
            .submit_job(SubmitRequest::new(operation, files))
            .expect("submission accepted")
    }

    pub fn wait(&self, job_id: &str) -> Job {
        self.service()
            .wait_for_terminal(job_id, WAIT)
            .expect("job reached a terminal status")
    }

    pub fn job_count(&self) -> usize {
        self.jobs.list_jobs(None, 10_000).expect("list jobs").len()
    }

    pub fn object(&self, path: &str) -> Option<Vec<u8>> {
        if self.objects.exists(path).expect("exists") {
            Some(self.objects.get(path).expect("get"))
        } else {
            None
        }
    }

    /// Drains all queued work and stops the runtime.
    pub fn shutdown(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown();
        }
    }

    pub fn path(&self) -> &std::path::Path {
        self.temp_dir.path()
    }
}
