// src/lock.rs

//! Exclusive lock on an installation prefix
//!
//! Every operation that changes a prefix (install, uninstall) holds this
//! lock from start to finish, so two `formulary` processes never interleave
//! writes to the same `bin` directory or registry.

use crate::error::{Error, Result};
use fs2::FileExt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Held `flock(LOCK_EX)` on the prefix lock file, released on drop
pub struct PrefixLock {
    /// Kept open to maintain the lock
    file: File,
    path: PathBuf,
}

impl PrefixLock {
    /// Acquire the lock, blocking until it is available
    pub fn acquire<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = open_lock_file(&path)?;

        file.lock_exclusive()
            .map_err(|e| Error::IoError(format!("Failed to lock {}: {}", path.display(), e)))?;

        debug!("Acquired prefix lock at {}", path.display());
        Ok(Self { file, path })
    }

    /// Try to acquire the lock without blocking
    ///
    /// `Ok(None)` means another process holds it.
    pub fn try_acquire<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref().to_path_buf();
        let file = open_lock_file(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!("Acquired prefix lock at {}", path.display());
                Ok(Some(Self { file, path }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                debug!("Prefix lock already held at {}", path.display());
                Ok(None)
            }
            Err(e) => Err(Error::IoError(format!(
                "Failed to lock {}: {}",
                path.display(),
                e
            ))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(File::create(path)?)
}

impl Drop for PrefixLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        debug!("Released prefix lock at {}", self.path.display());
    }
}
