//! Object storage for uploaded inputs and produced artifacts.

pub mod filesystem;

use std::path::{Component, Path};

pub use filesystem::FileObjectStore;

use crate::error::StorageError;

/// Blob storage addressed by relative, slash-separated keys such as
/// `uploads/<job id>.pdf`.
pub trait ObjectStore: Send + Sync {
    /// Creates the bucket if it does not exist. Called once at startup.
    fn ensure_bucket(&self) -> Result<(), StorageError>;

    /// Stores `bytes` under `path`. A stored object is either fully visible
    /// or absent.
    fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError>;

    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    fn exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Removes the object. Deleting a missing object succeeds.
    fn delete(&self, path: &str) -> Result<(), StorageError>;
}

/// MIME type for an object name, falling back to `application/octet-stream`.
pub fn content_type_for(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Rejects keys that could escape the bucket.
pub fn validate_object_path(path: &str) -> Result<(), StorageError> {
    let invalid = |reason| StorageError::InvalidPath {
        path: path.to_string(),
        reason,
    };

    if path.trim().is_empty() {
        return Err(invalid("path is empty"));
    }
    if path.contains('\\') || path.contains('\0') {
        return Err(invalid("path contains a forbidden character"));
    }
    if path.ends_with('/') {
        return Err(invalid("path names a directory"));
    }
    for component in Path::new(path).components() {
        match component {
            Component::Normal(_) => {}
            Component::ParentDir => return Err(invalid("parent directory references are not allowed")),
            Component::CurDir => return Err(invalid("'.' segments are not allowed")),
            Component::RootDir | Component::Prefix(_) => {
                return Err(invalid("path must be relative"))
            }
        }
    }
    Ok(())
}
