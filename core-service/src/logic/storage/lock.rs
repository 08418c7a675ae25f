//! Single-instance guard
//!
//! The device store has no cross-process locking beyond atomic rename, so
//! overlapping scheduled runs would silently drop updates. A lock file created
//! with `create_new` keeps mutating runs exclusive.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use super::StoreError;

/// Locks older than this are left over from a killed run
const STALE_AFTER: Duration = Duration::from_secs(30 * 60);

/// Held for the lifetime of a mutating run; removes the lock file on drop
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
}

impl InstanceLock {
    pub fn acquire(path: &Path) -> Result<Self, StoreError> {
        match Self::try_create(path) {
            Ok(lock) => Ok(lock),
            Err(StoreError::Locked(_)) if Self::is_stale(path) => {
                log::warn!("Removing stale lock {}", path.display());
                fs::remove_file(path).map_err(|e| StoreError::io(path, e))?;
                Self::try_create(path)
            }
            Err(e) => Err(e),
        }
    }

    fn try_create(path: &Path) -> Result<Self, StoreError> {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                let _ = writeln!(file, "{}", std::process::id());
                Ok(Self {
                    path: path.to_path_buf(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(StoreError::Locked(path.to_path_buf()))
            }
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    fn is_stale(path: &Path) -> bool {
        fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .map(|age| age > STALE_AFTER)
            .unwrap_or(false)
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("Failed to release lock {}: {}", self.path.display(), e);
        }
    }
}
