//! Entities shared by the submission, worker and reconciliation paths.

pub mod identity;
pub mod job;
pub mod params;
pub mod sub_job;

use std::fmt;

pub use identity::Identity;
pub use job::{Job, JobStatus, JobType, NewJob};
pub use params::{parse_page_ranges, JobParams, PageRange};
pub use sub_job::{NewSubJob, Operation, SubJob};

/// Returned when a stored or user-supplied enum name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for ParseEnumError {}

/// Normalises `to-jpg`, `To_Jpg` and `TO_JPG` to the stored form.
pub(crate) fn normalize_enum_name(value: &str) -> String {
    value.trim().replace('-', "_").to_ascii_uppercase()
}
