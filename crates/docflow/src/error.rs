use std::path::PathBuf;
use thiserror::Error;

use crate::model::JobStatus;

#[derive(Error, Debug)]
pub enum DocflowError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Job store error: {0}")]
    Store(#[from] StoreError),

    #[error("Object storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

/// A malformed submission. Raised before anything is persisted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No files were submitted")]
    NoFiles,

    #[error("A submitted file has an empty name")]
    EmptyFileName,

    #[error("File '{name}' is empty")]
    EmptyFile { name: String },

    #[error("Operation {operation} needs at least {required} files, got {actual}")]
    TooFewFiles {
        operation: String,
        required: usize,
        actual: usize,
    },

    #[error("Operation {operation} accepts a single file, got {actual}")]
    TooManyFiles { operation: String, actual: usize },

    #[error("Missing required parameter '{name}'")]
    MissingParameter { name: &'static str },

    #[error("Invalid page range '{value}': {reason}")]
    InvalidPageRange { value: String, reason: String },

    #[error("JPEG quality must be between 1 and 100, got {0}")]
    InvalidQuality(u8),

    #[error("DPI must be between {min} and {max}, got {value}")]
    InvalidDpi { value: u32, min: u32, max: u32 },
}

/// Job store (database of record) failures.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Job '{id}' not found")]
    NotFound { id: String },

    #[error("Job '{id}' cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Stored record '{id}' is unreadable: {reason}")]
    Corrupt { id: String, reason: String },

    #[error(transparent)]
    Database(#[from] crate::db::DatabaseError),
}

/// Object storage failures.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid object path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("Object '{path}' not found")]
    NotFound { path: String },

    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write object '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read object '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete object '{path}': {source}")]
    DeleteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Message broker (transport) failures.
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to decode message: {0}")]
    Decode(String),

    #[error("Unsupported message version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Topic '{0}' is closed")]
    Closed(String),

    #[error("Failed to spawn dispatch thread for '{topic}': {source}")]
    Spawn {
        topic: String,
        #[source]
        source: std::io::Error,
    },
}

/// Renderer failures. Only ever surfaced through a FAILED completion message.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Unsupported input '{name}': {reason}")]
    UnsupportedInput { name: String, reason: String },

    #[error("Corrupt document: {0}")]
    Corrupt(String),

    #[error("Invalid render parameters: {0}")]
    InvalidParams(String),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed: {reason}")]
    Tool { tool: String, reason: String },
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,
}

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter '{filter}': {reason}")]
    Filter { filter: String, reason: String },

    #[error("Failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("Failed to install log bridge: {0}")]
    LogBridge(#[from] log::SetLoggerError),
}

pub type Result<T> = std::result::Result<T, DocflowError>;
