//! Shape checks run before anything is persisted.

use super::SubmitRequest;
use crate::error::ValidationError;

pub fn validate(request: &SubmitRequest) -> Result<(), ValidationError> {
    let operation = request.operation;
    let files = &request.files;

    if files.is_empty() {
        return Err(ValidationError::NoFiles);
    }
    if files.iter().any(|f| f.name.trim().is_empty()) {
        return Err(ValidationError::EmptyFileName);
    }
    if let Some(empty) = files.iter().find(|f| f.bytes.is_empty()) {
        return Err(ValidationError::EmptyFile {
            name: empty.name.clone(),
        });
    }

    if files.len() < operation.min_inputs() {
        return Err(ValidationError::TooFewFiles {
            operation: operation.to_string(),
            required: operation.min_inputs(),
            actual: files.len(),
        });
    }
    if let Some(max) = operation.max_inputs() {
        if files.len() > max {
            return Err(ValidationError::TooManyFiles {
                operation: operation.to_string(),
                actual: files.len(),
            });
        }
    }

    request.params.validate_for(operation)
}
