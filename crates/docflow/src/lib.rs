pub mod broker;
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod reconciler;
pub mod render;
pub mod runtime;
pub mod sanitize;
pub mod storage;
pub mod store;
pub mod submission;
pub mod telemetry;
pub mod worker;

pub use broker::{CompletionMessage, InMemoryBroker, MessageBroker, Subscription, WorkMessage};
pub use config::{load_config, Config};
pub use error::{
    BrokerError, ConfigError, DocflowError, RenderError, Result, StorageError, StoreError,
    ValidationError, WorkerError,
};
pub use model::{Identity, Job, JobParams, JobStatus, JobType, Operation, SubJob};
pub use reconciler::{NotificationReconciler, Outcome};
pub use render::{BuiltinRenderer, RenderRequest, Renderer};
pub use runtime::{Components, Runtime};
pub use storage::{FileObjectStore, ObjectStore};
pub use store::{JobStore, SqliteJobStore};
pub use submission::{Accepted, SubmissionService, SubmitError, SubmitRequest, UploadedFile};
pub use worker::{JobProcessor, Worker, WorkerPool};
