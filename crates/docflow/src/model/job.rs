//! Top-level job record and its lifecycle.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{normalize_enum_name, JobParams, ParseEnumError};

/// Lifecycle status of a job.
///
/// Transitions only move forward: PENDING → PROCESSING → COMPLETED | FAILED.
/// Skipping PROCESSING is allowed; leaving a terminal status is not.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Processing => 1,
            JobStatus::Completed | JobStatus::Failed => 2,
        }
    }

    /// Whether a job currently in `self` may be written with `next`.
    ///
    /// Writing the current value again is allowed so duplicate notifications
    /// stay idempotent.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        if *self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        next.rank() > self.rank()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_enum_name(s).as_str() {
            "PENDING" => Ok(JobStatus::Pending),
            "PROCESSING" => Ok(JobStatus::Processing),
            "COMPLETED" => Ok(JobStatus::Completed),
            "FAILED" => Ok(JobStatus::Failed),
            _ => Err(ParseEnumError {
                kind: "job status",
                value: s.to_string(),
            }),
        }
    }
}

/// Operation family. Each family has its own work topic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    Convert,
    Compress,
    Merge,
    Split,
}

impl JobType {
    pub const ALL: [JobType; 4] = [
        JobType::Convert,
        JobType::Compress,
        JobType::Merge,
        JobType::Split,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Convert => "CONVERT",
            JobType::Compress => "COMPRESS",
            JobType::Merge => "MERGE",
            JobType::Split => "SPLIT",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_enum_name(s).as_str() {
            "CONVERT" => Ok(JobType::Convert),
            "COMPRESS" => Ok(JobType::Compress),
            "MERGE" => Ok(JobType::Merge),
            "SPLIT" => Ok(JobType::Split),
            _ => Err(ParseEnumError {
                kind: "job type",
                value: s.to_string(),
            }),
        }
    }
}

/// A persisted job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: String,
    pub original_filename: String,
    pub job_type: JobType,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub params: JobParams,
    /// User id forwarded by the edge gateway, recorded verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Input for creating a job. The store assigns id, status and timestamps.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub original_filename: String,
    pub job_type: JobType,
    pub params: JobParams,
    pub submitted_by: Option<String>,
}
