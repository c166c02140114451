use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::StorageError;

/// Outcome of a file removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    /// The file was already gone; treated as success.
    Missing,
}

/// Writes and removes mirrored files. Assumes it is the only writer of the
/// destination directories.
#[derive(Debug, Clone, Default)]
pub struct FileStorage;

impl FileStorage {
    pub fn new() -> Self {
        Self
    }

    /// Fully overwrites `folder/filename` with `content`, creating `folder` if needed.
    pub fn write(
        &self,
        folder: &Path,
        filename: &str,
        content: &[u8],
    ) -> Result<PathBuf, StorageError> {
        self.ensure_directory(folder)?;

        let path = folder.join(filename);
        std::fs::write(&path, content).map_err(|e| StorageError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        debug!("Wrote {} bytes to {}", content.len(), path.display());
        Ok(path)
    }

    /// Deletes `folder/filename`. A missing file is not an error.
    pub fn remove(&self, folder: &Path, filename: &str) -> Result<Removal, StorageError> {
        let path = folder.join(filename);

        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed {}", path.display());
                Ok(Removal::Removed)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("File {} not found, nothing to remove", path.display());
                Ok(Removal::Missing)
            }
            Err(e) => Err(StorageError::RemoveFile { path, source: e }),
        }
    }

    fn ensure_directory(&self, path: &Path) -> Result<(), StorageError> {
        if path.is_dir() {
            return Ok(());
        }
        match std::fs::create_dir_all(path) {
            Ok(()) => Ok(()),
            // Lost a creation race; the directory is there now.
            Err(e) if e.kind() == ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
            Err(e) => Err(StorageError::CreateDirectory {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }
}
