//! Versioned JSON payloads carried on the work and results topics.
//!
//! Decoding fails closed: unknown fields, missing fields, an unexpected
//! `version` or a non-terminal completion status are all rejected.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::BrokerError;
use crate::model::JobStatus;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Deserialize)]
struct VersionHeader {
    version: u32,
}

fn decode_versioned<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, BrokerError> {
    let header: VersionHeader =
        serde_json::from_slice(bytes).map_err(|e| BrokerError::Decode(e.to_string()))?;
    if header.version != SCHEMA_VERSION {
        return Err(BrokerError::UnsupportedVersion {
            found: header.version,
            expected: SCHEMA_VERSION,
        });
    }
    serde_json::from_slice(bytes).map_err(|e| BrokerError::Decode(e.to_string()))
}

fn require_job_id(job_id: &str) -> Result<(), BrokerError> {
    if job_id.trim().is_empty() {
        return Err(BrokerError::Decode("job_id is empty".to_string()));
    }
    Ok(())
}

/// Published on a work topic once a job's inputs are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkMessage {
    pub version: u32,
    pub job_id: String,
}

impl WorkMessage {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            version: SCHEMA_VERSION,
            job_id: job_id.into(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, BrokerError> {
        serde_json::to_vec(self).map_err(BrokerError::Encode)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, BrokerError> {
        let message: Self = decode_versioned(bytes)?;
        require_job_id(&message.job_id)?;
        Ok(message)
    }
}

/// Terminal outcome reported by a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompletionStatus {
    Completed,
    Failed,
}

impl From<CompletionStatus> for JobStatus {
    fn from(status: CompletionStatus) -> Self {
        match status {
            CompletionStatus::Completed => JobStatus::Completed,
            CompletionStatus::Failed => JobStatus::Failed,
        }
    }
}

/// Published on the results topic when a worker finishes a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompletionMessage {
    pub version: u32,
    pub job_id: String,
    pub status: CompletionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CompletionMessage {
    pub fn completed(job_id: impl Into<String>) -> Self {
        Self {
            version: SCHEMA_VERSION,
            job_id: job_id.into(),
            status: CompletionStatus::Completed,
            error: None,
        }
    }

    pub fn failed(job_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            version: SCHEMA_VERSION,
            job_id: job_id.into(),
            status: CompletionStatus::Failed,
            error: Some(error.into()),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, BrokerError> {
        serde_json::to_vec(self).map_err(BrokerError::Encode)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, BrokerError> {
        let message: Self = decode_versioned(bytes)?;
        require_job_id(&message.job_id)?;
        Ok(message)
    }
}
