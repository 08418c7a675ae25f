//! Storage Module - Atomic JSON persistence with backup recovery
//!
//! Every persisted file goes through `atomic_write`: the store is never
//! observed half-written, and the previous version is kept as `<file>.bak`.
//!
//! # Components
//! - `mod.rs`: `atomic_write`, `safe_load`, `DataPaths`
//! - `lock.rs`: single-instance guard for mutating runs
//!
//! # Failure Strategy
//! Primary unreadable -> load `.bak` (copied back over the primary only by
//! `safe_load_restoring`). Both unreadable -> empty state + WARN.

pub mod lock;

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::constants;

pub use lock::InstanceLock;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported schema version {found} (max supported {supported})")]
    UnsupportedSchema { found: u32, supported: u32 },

    #[error("Another monitor instance holds {0}")]
    Locked(PathBuf),

    #[error("Invalid data in {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

// ============================================================================
// DATA PATHS
// ============================================================================

/// Locations of every file the monitor reads or writes
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub data_dir: PathBuf,
    pub devices: PathBuf,
    pub correlation_state: PathBuf,
    pub incident_counter: PathBuf,
    pub last_summary: PathBuf,
    pub last_lan_ip: PathBuf,
    pub lock: PathBuf,
    pub security_log: PathBuf,
    pub export_dir: PathBuf,
}

impl DataPaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            devices: data_dir.join(constants::KNOWN_DEVICES_FILE),
            correlation_state: data_dir.join(constants::CORRELATION_STATE_FILE),
            incident_counter: data_dir.join(constants::INCIDENT_COUNTER_FILE),
            last_summary: data_dir.join(constants::LAST_SUMMARY_FILE),
            last_lan_ip: data_dir.join(constants::LAST_LAN_FILE),
            lock: data_dir.join(constants::LOCK_FILE),
            security_log: data_dir.join(constants::SECURITY_LOG_FILE),
            export_dir: data_dir.join(constants::EXPORT_DIR),
            data_dir,
        }
    }

    /// Paths rooted at `HSP_DATA_DIR` / the platform data dir
    pub fn from_env() -> Self {
        Self::new(constants::get_data_dir())
    }

    pub fn ensure_data_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir).map_err(|e| StoreError::io(&self.data_dir, e))
    }
}

// ============================================================================
// PATH HELPERS
// ============================================================================

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// `known_devices.json` -> `known_devices.json.bak`
pub fn backup_path(path: &Path) -> PathBuf {
    with_suffix(path, ".bak")
}

/// `known_devices.json` -> `known_devices.json.tmp`
pub fn temp_path(path: &Path) -> PathBuf {
    with_suffix(path, ".tmp")
}

// ============================================================================
// ATOMIC WRITE
// ============================================================================

/// Serialize `data` as pretty JSON and write it atomically
pub fn atomic_write<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(data)?;
    atomic_write_bytes(path, &json)
}

/// Write raw bytes atomically: temp file + fsync, rotate old file to `.bak`,
/// rename temp into place.
pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
    }

    let tmp = temp_path(path);
    {
        let mut file = File::create(&tmp).map_err(|e| StoreError::io(&tmp, e))?;
        file.write_all(bytes).map_err(|e| StoreError::io(&tmp, e))?;
        file.flush().map_err(|e| StoreError::io(&tmp, e))?;
        file.sync_all().map_err(|e| StoreError::io(&tmp, e))?;
    }

    if path.exists() {
        let bak = backup_path(path);
        fs::rename(path, &bak).map_err(|e| StoreError::io(&bak, e))?;
    }

    fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))?;
    Ok(())
}

// ============================================================================
// SAFE LOAD
// ============================================================================

/// Load a JSON file into `T`, recovering from `.bak` on corruption.
/// Missing file -> `T::default()`.
pub fn safe_load<T: DeserializeOwned + Default>(path: &Path) -> T {
    safe_load_with(path, |bytes| Ok(serde_json::from_slice(bytes)?))
}

/// Like `safe_load` with a custom decoder (used for schema migration).
/// Never writes to disk.
pub fn safe_load_with<T, F>(path: &Path, decode: F) -> T
where
    T: Default,
    F: Fn(&[u8]) -> Result<T, StoreError>,
{
    load_inner(path, &decode, false)
}

/// Like `safe_load_with`, but a good backup is also copied over a corrupt
/// primary so the next atomic write does not rotate the corrupt file onto it.
pub fn safe_load_restoring<T, F>(path: &Path, decode: F) -> T
where
    T: Default,
    F: Fn(&[u8]) -> Result<T, StoreError>,
{
    load_inner(path, &decode, true)
}

fn load_inner<T, F>(path: &Path, decode: &F, restore: bool) -> T
where
    T: Default,
    F: Fn(&[u8]) -> Result<T, StoreError>,
{
    if !path.exists() {
        return T::default();
    }

    let primary_err = match read_and_decode(path, decode) {
        Ok(value) => return value,
        Err(e) => e,
    };

    log::warn!("{} is corrupted: {}", path.display(), primary_err);

    let bak = backup_path(path);
    if bak.exists() {
        match read_and_decode(&bak, decode) {
            Ok(value) => {
                log::warn!("Recovered {} from backup", path.display());
                if restore {
                    if let Err(e) = fs::copy(&bak, path) {
                        log::warn!("Could not restore backup file in place: {}", e);
                    }
                }
                return value;
            }
            Err(e) => log::warn!("Backup {} is unreadable too: {}", bak.display(), e),
        }
    }

    log::warn!("No valid backup for {} - starting with empty state", path.display());
    T::default()
}

fn read_and_decode<T, F>(path: &Path, decode: &F) -> Result<T, StoreError>
where
    F: Fn(&[u8]) -> Result<T, StoreError>,
{
    let bytes = fs::read(path).map_err(|e| StoreError::io(path, e))?;
    decode(&bytes)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_atomic_write_rotates_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut first = BTreeMap::new();
        first.insert("a".to_string(), 1u32);
        atomic_write(&path, &first).unwrap();
        assert!(!backup_path(&path).exists());

        let mut second = first.clone();
        second.insert("b".to_string(), 2);
        atomic_write(&path, &second).unwrap();

        assert!(backup_path(&path).exists());
        assert!(!temp_path(&path).exists());

        let loaded: BTreeMap<String, u32> = safe_load(&path);
        assert_eq!(loaded, second);
    }

    #[test]
    fn test_corrupt_primary_restores_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut first = BTreeMap::new();
        first.insert("a".to_string(), 1u32);
        atomic_write(&path, &first).unwrap();
        atomic_write(&path, &BTreeMap::<String, u32>::new()).unwrap();

        fs::write(&path, b"{ not json").unwrap();

        let decode = |bytes: &[u8]| -> Result<BTreeMap<String, u32>, StoreError> {
            Ok(serde_json::from_slice(bytes)?)
        };
        let loaded = safe_load_restoring(&path, decode);
        assert_eq!(loaded, first);

        // Primary was repaired in place
        let again: BTreeMap<String, u32> = safe_load(&path);
        assert_eq!(again, first);
    }

    #[test]
    fn test_read_only_load_leaves_corrupt_primary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut first = BTreeMap::new();
        first.insert("a".to_string(), 1u32);
        atomic_write(&path, &first).unwrap();
        atomic_write(&path, &BTreeMap::<String, u32>::new()).unwrap();
        fs::write(&path, b"{ corrupt").unwrap();

        let loaded: BTreeMap<String, u32> = safe_load(&path);
        assert_eq!(loaded, first);
        assert_eq!(fs::read(&path).unwrap(), b"{ corrupt");
    }

    #[test]
    fn test_both_corrupt_yields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, b"garbage").unwrap();
        fs::write(backup_path(&path), b"more garbage").unwrap();

        let loaded: BTreeMap<String, u32> = safe_load(&path);
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded: Vec<u32> = safe_load(&dir.path().join("nope.json"));
        assert!(loaded.is_empty());
    }
}
