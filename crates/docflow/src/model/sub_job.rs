//! Per-file artifact records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{normalize_enum_name, JobType, ParseEnumError};

/// File-format specific action applied to the artifacts of a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    ToJpg,
    ToPng,
    ToPdf,
    Compress,
    Merge,
    Split,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::ToJpg,
        Operation::ToPng,
        Operation::ToPdf,
        Operation::Compress,
        Operation::Merge,
        Operation::Split,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ToJpg => "TO_JPG",
            Operation::ToPng => "TO_PNG",
            Operation::ToPdf => "TO_PDF",
            Operation::Compress => "COMPRESS",
            Operation::Merge => "MERGE",
            Operation::Split => "SPLIT",
        }
    }

    pub fn job_type(&self) -> JobType {
        match self {
            Operation::ToJpg | Operation::ToPng | Operation::ToPdf => JobType::Convert,
            Operation::Compress => JobType::Compress,
            Operation::Merge => JobType::Merge,
            Operation::Split => JobType::Split,
        }
    }

    pub fn min_inputs(&self) -> usize {
        match self {
            Operation::Merge => 2,
            _ => 1,
        }
    }

    /// `None` means unbounded.
    pub fn max_inputs(&self) -> Option<usize> {
        match self {
            Operation::Merge => None,
            _ => Some(1),
        }
    }

    /// Extension of the artifact produced by this operation.
    pub fn output_extension(&self) -> &'static str {
        match self {
            Operation::ToJpg => "jpg",
            Operation::ToPng => "png",
            Operation::ToPdf | Operation::Compress | Operation::Merge => "pdf",
            Operation::Split => "zip",
        }
    }

    fn output_prefix(&self) -> &'static str {
        match self {
            Operation::ToJpg => "jpgs",
            Operation::ToPng => "pngs",
            Operation::ToPdf => "pdfs",
            Operation::Compress => "compressed",
            Operation::Merge => "merged",
            Operation::Split => "splits",
        }
    }

    /// Object-store path of the result of `job_id`, e.g. `jpgs/<id>.jpg`.
    pub fn output_path(&self, job_id: &str) -> String {
        format!(
            "{}/{}.{}",
            self.output_prefix(),
            job_id,
            self.output_extension()
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_enum_name(s);
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == normalized)
            .ok_or_else(|| ParseEnumError {
                kind: "operation",
                value: s.to_string(),
            })
    }
}

/// A persisted artifact record belonging to a job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubJob {
    pub id: String,
    pub job_id: String,
    pub original_name: String,
    pub file_size: u64,
    pub operation: Operation,
    pub source_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSubJob {
    pub job_id: String,
    pub original_name: String,
    pub file_size: u64,
    pub operation: Operation,
    pub source_path: String,
}
