//! Operation parameters persisted with a job.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

use super::Operation;

pub const MIN_DPI: u32 = 36;
pub const MAX_DPI: u32 = 1200;

/// Parameters supplied with a submission.
///
/// Stored as JSON on the job row so the worker, which only receives a job id,
/// can read them back.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct JobParams {
    /// Page selection for split, e.g. `1-3,5`. Each range becomes one output file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_ranges: Option<String>,
    /// JPEG quality (1-100) for image output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    /// Rasterisation resolution for PDF to image conversion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpi: Option<u32>,
}

impl JobParams {
    /// Checks the parameters required or accepted by `operation`.
    pub fn validate_for(&self, operation: Operation) -> Result<(), ValidationError> {
        if operation == Operation::Split {
            let ranges = self
                .page_ranges
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .ok_or(ValidationError::MissingParameter {
                    name: "page_ranges",
                })?;
            parse_page_ranges(ranges)?;
        }

        if let Some(quality) = self.quality {
            if !(1..=100).contains(&quality) {
                return Err(ValidationError::InvalidQuality(quality));
            }
        }

        if let Some(dpi) = self.dpi {
            if !(MIN_DPI..=MAX_DPI).contains(&dpi) {
                return Err(ValidationError::InvalidDpi {
                    value: dpi,
                    min: MIN_DPI,
                    max: MAX_DPI,
                });
            }
        }

        Ok(())
    }
}

/// An inclusive, 1-based page range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    pub fn contains(&self, page: u32) -> bool {
        (self.start..=self.end).contains(&page)
    }

    /// File-name friendly label: `3` or `1-3`.
    pub fn label(&self) -> String {
        if self.start == self.end {
            self.start.to_string()
        } else {
            format!("{}-{}", self.start, self.end)
        }
    }
}

/// Parses a comma separated list such as `1-3, 5, 7-7`.
pub fn parse_page_ranges(value: &str) -> Result<Vec<PageRange>, ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidPageRange {
        value: value.to_string(),
        reason,
    };

    let mut ranges = Vec::new();
    for part in value.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(invalid("empty range".to_string()));
        }

        let (start, end) = match part.split_once('-') {
            Some((start, end)) => (parse_page(start, &invalid)?, parse_page(end, &invalid)?),
            None => {
                let page = parse_page(part, &invalid)?;
                (page, page)
            }
        };

        if start > end {
            return Err(invalid(format!("range {}-{} is reversed", start, end)));
        }

        ranges.push(PageRange { start, end });
    }

    Ok(ranges)
}

fn parse_page(
    raw: &str,
    invalid: &dyn Fn(String) -> ValidationError,
) -> Result<u32, ValidationError> {
    let raw = raw.trim();
    match raw.parse::<u32>() {
        Ok(0) => Err(invalid("pages are numbered from 1".to_string())),
        Ok(page) => Ok(page),
        Err(_) => Err(invalid(format!("'{}' is not a page number", raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_and_ranges() {
        let ranges = parse_page_ranges("1-3, 5,7-8").unwrap();
        assert_eq!(
            ranges,
            vec![
                PageRange { start: 1, end: 3 },
                PageRange { start: 5, end: 5 },
                PageRange { start: 7, end: 8 },
            ]
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_page_ranges("").is_err());
        assert!(parse_page_ranges("1,,2").is_err());
        assert!(parse_page_ranges("a-b").is_err());
        assert!(parse_page_ranges("0-2").is_err());
        assert!(parse_page_ranges("5-2").is_err());
    }

    #[test]
    fn test_range_label() {
        assert_eq!(PageRange { start: 4, end: 4 }.label(), "4");
        assert_eq!(PageRange { start: 1, end: 3 }.label(), "1-3");
    }

    #[test]
    fn test_split_requires_page_ranges() {
        let params = JobParams::default();
        assert_eq!(
            params.validate_for(Operation::Split),
            Err(ValidationError::MissingParameter {
                name: "page_ranges"
            })
        );

        let blank = JobParams {
            page_ranges: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            blank.validate_for(Operation::Split),
            Err(ValidationError::MissingParameter { .. })
        ));
    }

    #[test]
    fn test_quality_and_dpi_bounds() {
        let params = JobParams {
            quality: Some(0),
            ..Default::default()
        };
        assert_eq!(
            params.validate_for(Operation::ToJpg),
            Err(ValidationError::InvalidQuality(0))
        );

        let params = JobParams {
            dpi: Some(5000),
            ..Default::default()
        };
        assert!(matches!(
            params.validate_for(Operation::ToJpg),
            Err(ValidationError::InvalidDpi { value: 5000, .. })
        ));

        let params = JobParams {
            quality: Some(80),
            dpi: Some(150),
            ..Default::default()
        };
        assert!(params.validate_for(Operation::ToJpg).is_ok());
    }

    #[test]
    fn test_params_reject_unknown_fields() {
        let result: Result<JobParams, _> = serde_json::from_str(r#"{"pages":"1-2"}"#);
        assert!(result.is_err());
    }
}
