use std::path::Path;

use serde::Serialize;

use crate::model::{Identity, JobParams, JobStatus, Operation};

/// A file received from the caller.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Reads a local file, keeping only its file name.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(Self { name, bytes })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub operation: Operation,
    pub files: Vec<UploadedFile>,
    pub params: JobParams,
    pub identity: Option<Identity>,
}

impl SubmitRequest {
    pub fn new(operation: Operation, files: Vec<UploadedFile>) -> Self {
        Self {
            operation,
            files,
            params: JobParams::default(),
            identity: None,
        }
    }

    pub fn with_params(mut self, params: JobParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }
}

/// Returned once a job is durably recorded and enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Accepted {
    pub job_id: String,
    pub status: JobStatus,
}
