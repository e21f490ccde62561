//! Wires the stores, broker, worker pool and reconciler into one process.

use std::path::Path;
use std::sync::Arc;

use crate::broker::{work_topics, InMemoryBroker, MessageBroker, Subscription, RESULTS_TOPIC};
use crate::config::{Config, WorkerConfig};
use crate::db::Database;
use crate::error::Result;
use crate::reconciler::NotificationReconciler;
use crate::render::{BuiltinRenderer, Renderer};
use crate::storage::{FileObjectStore, ObjectStore};
use crate::store::{JobStore, SqliteJobStore};
use crate::submission::SubmissionService;
use crate::worker::{JobProcessor, Worker, WorkerPool};

/// The shared collaborators every pipeline stage is built from.
#[derive(Clone)]
pub struct Components {
    pub jobs: Arc<dyn JobStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub broker: Arc<dyn MessageBroker>,
    pub renderer: Arc<dyn Renderer>,
}

impl Components {
    /// Opens the database, prepares the bucket and creates the broker.
    pub fn from_config(config: &Config) -> Result<Self> {
        let db = Database::open(Path::new(&config.database_path))?;

        let objects = FileObjectStore::new(&config.object_store.root, &config.object_store.bucket);
        objects.ensure_bucket()?;

        Ok(Self {
            jobs: Arc::new(SqliteJobStore::new(db)),
            objects: Arc::new(objects),
            broker: Arc::new(InMemoryBroker::new(config.broker.capacity)),
            renderer: Arc::new(BuiltinRenderer::from_config(&config.renderer)),
        })
    }

    pub fn submission(&self) -> SubmissionService {
        SubmissionService::new(
            Arc::clone(&self.jobs),
            Arc::clone(&self.objects),
            Arc::clone(&self.broker),
        )
    }
}

/// A running worker and reconciler.
pub struct Runtime {
    components: Components,
    pool: Arc<WorkerPool>,
    work_subscriptions: Vec<Subscription>,
    results_subscription: Subscription,
}

impl Runtime {
    pub fn start(components: Components, worker: &WorkerConfig) -> Result<Self> {
        let reconciler = Arc::new(NotificationReconciler::new(Arc::clone(&components.jobs)));
        let results_subscription = reconciler.subscribe(components.broker.as_ref())?;

        let processor = Arc::new(JobProcessor::new(
            Arc::clone(&components.jobs),
            Arc::clone(&components.objects),
            Arc::clone(&components.broker),
            Arc::clone(&components.renderer),
        ));
        let pool = Arc::new(WorkerPool::new(
            processor,
            worker.worker_count,
            worker.queue_capacity(),
        )?);
        let work_subscriptions = Worker::new(Arc::clone(&pool)).subscribe(components.broker.as_ref())?;

        log::info!(
            "Runtime started: {} workers, queue capacity {}",
            pool.worker_count(),
            pool.queue_capacity()
        );

        Ok(Self {
            components,
            pool,
            work_subscriptions,
            results_subscription,
        })
    }

    pub fn components(&self) -> &Components {
        &self.components
    }

    pub fn submission(&self) -> SubmissionService {
        self.components.submission()
    }

    /// Drains in pipeline order: work topics, then the pool, then the
    /// results topic, so every queued job ends with its completion applied.
    ///
    /// The broker is closed afterwards and cannot be reused.
    pub fn shutdown(self) {
        log::info!("Shutting down runtime...");
        let broker = &self.components.broker;

        for topic in work_topics() {
            broker.close(topic);
        }
        for subscription in self.work_subscriptions {
            subscription.join();
        }

        self.pool.wait();

        broker.close(RESULTS_TOPIC);
        self.results_subscription.join();

        log::info!("Runtime stopped");
    }

    /// Stops without draining. Jobs still queued stay PENDING or PROCESSING.
    pub fn abort(self) {
        self.pool.shutdown();
        for subscription in self.work_subscriptions {
            subscription.cancel();
        }
        self.pool.wait();
        self.results_subscription.cancel();
    }
}
