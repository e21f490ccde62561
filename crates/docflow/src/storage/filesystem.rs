use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::{validate_object_path, ObjectStore};
use crate::error::StorageError;

/// Object store laid out as `<root>/<bucket>/<key>` on the local filesystem.
pub struct FileObjectStore {
    bucket_dir: PathBuf,
}

impl FileObjectStore {
    pub fn new<P: AsRef<Path>>(root: P, bucket: &str) -> Self {
        Self {
            bucket_dir: root.as_ref().join(bucket),
        }
    }

    pub fn bucket_dir(&self) -> &Path {
        &self.bucket_dir
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        validate_object_path(path)?;
        Ok(self.bucket_dir.join(path))
    }

    fn ensure_directory(&self, path: &Path) -> Result<(), StorageError> {
        if !path.exists() {
            std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        Ok(())
    }
}

impl ObjectStore for FileObjectStore {
    fn ensure_bucket(&self) -> Result<(), StorageError> {
        self.ensure_directory(&self.bucket_dir)?;
        log::info!("Object store bucket ready at {}", self.bucket_dir.display());
        Ok(())
    }

    fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        let dir = target.parent().unwrap_or(self.bucket_dir.as_path()).to_path_buf();
        self.ensure_directory(&dir)?;

        let write_err = |source| StorageError::WriteFile {
            path: target.clone(),
            source,
        };

        // Stage next to the target so the final rename stays on one filesystem.
        let mut staged = NamedTempFile::new_in(&dir).map_err(write_err)?;
        staged.write_all(bytes).map_err(write_err)?;
        staged.as_file().sync_all().map_err(write_err)?;
        staged
            .persist(&target)
            .map_err(|e| write_err(e.error))?;

        log::debug!("Stored {} ({} bytes, {})", path, bytes.len(), content_type);
        Ok(())
    }

    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let source = self.resolve(path)?;
        std::fs::read(&source).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound {
                    path: path.to_string(),
                }
            } else {
                StorageError::ReadFile { path: source, source: e }
            }
        })
    }

    fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let target = self.resolve(path)?;
        Ok(target.is_file())
    }

    fn delete(&self, path: &str) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        match std::fs::remove_file(&target) {
            Ok(()) => {
                log::debug!("Deleted {}", path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFile {
                path: target,
                source: e,
            }),
        }
    }
}
