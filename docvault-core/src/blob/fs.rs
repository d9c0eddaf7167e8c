//! Filesystem blob backend.
//!
//! Objects are files under a root directory; storage key segments become
//! subdirectories. Writes go to a uniquely named temporary file in the target
//! directory which is synced and then moved into place, so readers see either
//! no object or the complete object.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use super::{check_deadline, validate_storage_key, BlobBackend, BlobError, BlobLocation, BlobResult, WritePolicy};
use crate::Deadline;

fn io_error(context: &str, path: &Path, err: &std::io::Error) -> BlobError {
    BlobError::Backend(format!("{context} '{}': {err}", path.display()))
}

/// Blob backend storing each object as a file under `root`.
#[derive(Debug, Clone)]
pub struct FsBlobBackend {
    root: PathBuf,
    policy: WritePolicy,
}

impl FsBlobBackend {
    /// Opens a backend rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::Backend`] if the directory cannot be created.
    pub fn new<P: AsRef<Path>>(root: P) -> BlobResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .map_err(|e| io_error("failed to create blob root", &root, &e))?;
        Ok(Self {
            root,
            policy: WritePolicy::RejectExisting,
        })
    }

    /// Sets the behaviour for writes to an occupied key.
    #[must_use]
    pub const fn with_policy(mut self, policy: WritePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Root directory of the backend.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> PathBuf {
        key.split('/').fold(self.root.clone(), |path, segment| path.join(segment))
    }

    fn write_temp(dir: &Path, data: &[u8]) -> BlobResult<PathBuf> {
        let temp = dir.join(format!(".{}.tmp", Uuid::new_v4().simple()));
        let mut file =
            File::create(&temp).map_err(|e| io_error("failed to create temp file", &temp, &e))?;
        let written = file
            .write_all(data)
            .and_then(|()| file.sync_all());
        if let Err(e) = written {
            let _ = fs::remove_file(&temp);
            return Err(io_error("failed to write temp file", &temp, &e));
        }
        Ok(temp)
    }

    fn commit(&self, key: &str, temp: &Path, target: &Path) -> BlobResult<()> {
        match self.policy {
            WritePolicy::Overwrite => fs::rename(temp, target).map_err(|e| {
                let _ = fs::remove_file(temp);
                io_error("failed to move blob into place", target, &e)
            }),
            WritePolicy::RejectExisting => {
                // hard_link refuses an existing target, rename would replace it
                let linked = fs::hard_link(temp, target);
                let _ = fs::remove_file(temp);
                match linked {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                        Err(BlobError::AlreadyExists {
                            key: key.to_string(),
                        })
                    }
                    Err(e) => Err(io_error("failed to link blob into place", target, &e)),
                }
            }
        }
    }

    #[cfg(unix)]
    fn sync_directory(dir: &Path) {
        if let Ok(handle) = File::open(dir) {
            let _ = handle.sync_all();
        }
    }

    #[cfg(not(unix))]
    fn sync_directory(_dir: &Path) {}
}

impl BlobBackend for FsBlobBackend {
    fn put(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
        deadline: Deadline,
    ) -> BlobResult<BlobLocation> {
        validate_storage_key(key)?;
        check_deadline(key, deadline)?;

        let target = self.object_path(key);
        let dir = target
            .parent()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);
        fs::create_dir_all(&dir).map_err(|e| io_error("failed to create directory", &dir, &e))?;

        let temp = Self::write_temp(&dir, data)?;
        self.commit(key, &temp, &target)?;
        Self::sync_directory(&dir);

        debug!(key, size = data.len(), content_type, "blob written");
        Ok(BlobLocation {
            key: key.to_string(),
            url: format!("file://{}", target.display()),
        })
    }

    fn get(&self, key: &str, deadline: Deadline) -> BlobResult<Vec<u8>> {
        validate_storage_key(key)?;
        check_deadline(key, deadline)?;
        let path = self.object_path(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(BlobError::NotFound {
                key: key.to_string(),
            }),
            Err(e) => Err(io_error("failed to read blob", &path, &e)),
        }
    }

    fn delete(&self, key: &str, deadline: Deadline) -> BlobResult<()> {
        validate_storage_key(key)?;
        check_deadline(key, deadline)?;
        let path = self.object_path(key);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(key, "blob deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("failed to delete blob", &path, &e)),
        }
    }

    fn write_policy(&self) -> WritePolicy {
        self.policy
    }
}
