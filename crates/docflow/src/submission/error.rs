use serde::Serialize;
use thiserror::Error;

use crate::error::{BrokerError, StorageError, StoreError, ValidationError};

/// Which collaborator failed behind an internal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Job store or object store.
    Persistence,
    /// Message broker.
    Transport,
}

/// Caller-facing outcome of a failed submission or lookup.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Job '{0}' not found")]
    NotFound(String),

    /// `job_id` is set when the job row exists (and has been marked FAILED).
    #[error("{message}")]
    Internal {
        job_id: Option<String>,
        kind: FailureKind,
        message: String,
    },
}

impl SubmitError {
    pub(crate) fn store(job_id: Option<&str>, error: &StoreError) -> Self {
        SubmitError::Internal {
            job_id: job_id.map(str::to_string),
            kind: FailureKind::Persistence,
            message: error.to_string(),
        }
    }

    pub(crate) fn storage(job_id: &str, error: &StorageError) -> Self {
        SubmitError::Internal {
            job_id: Some(job_id.to_string()),
            kind: FailureKind::Persistence,
            message: error.to_string(),
        }
    }

    pub(crate) fn transport(job_id: &str, error: &BrokerError) -> Self {
        SubmitError::Internal {
            job_id: Some(job_id.to_string()),
            kind: FailureKind::Transport,
            message: error.to_string(),
        }
    }

    /// HTTP status the edge gateway should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            SubmitError::Validation(_) => 400,
            SubmitError::NotFound(_) => 404,
            SubmitError::Internal { .. } => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            SubmitError::Validation(_) => "validation_error",
            SubmitError::NotFound(_) => "not_found",
            SubmitError::Internal {
                kind: FailureKind::Persistence,
                ..
            } => "persistence_error",
            SubmitError::Internal {
                kind: FailureKind::Transport,
                ..
            } => "transport_error",
        }
    }

    pub fn job_id(&self) -> Option<&str> {
        match self {
            SubmitError::NotFound(id) => Some(id),
            SubmitError::Internal { job_id, .. } => job_id.as_deref(),
            SubmitError::Validation(_) => None,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.error_code(),
            message: self.to_string(),
            job_id: self.job_id().map(str::to_string),
        }
    }
}

/// JSON error payload.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}
