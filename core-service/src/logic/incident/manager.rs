//! Incident lifecycle: persistent ID allocation + OPEN/CLOSED transitions
//!
//! A device holds at most one incident. Opening is a no-op while one is OPEN;
//! closing is a no-op unless one is OPEN. IDs are never reused.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Utc};

use super::types::{Incident, IncidentStatus, Severity};
use crate::logic::device::DeviceRecord;
use crate::logic::storage::{self, StoreError};

// ============================================================================
// ID COUNTER
// ============================================================================

/// Monotonic incident number shared by all devices.
///
/// The backing file holds the next number to allocate (starting at 1). The
/// incremented value is persisted before the ID is handed out, so a crash can
/// skip a number but never repeat one.
#[derive(Debug)]
pub struct IncidentCounter {
    path: Option<PathBuf>,
    next: u64,
}

impl IncidentCounter {
    pub fn new(path: &Path) -> Self {
        Self {
            path: Some(path.to_path_buf()),
            next: 1,
        }
    }

    /// Counter without a backing file (tests, read-only runs)
    pub fn in_memory(start: u64) -> Self {
        Self {
            path: None,
            next: start.max(1),
        }
    }

    pub fn next_id(&mut self) -> Result<String, StoreError> {
        self.next_id_at(Utc::now())
    }

    pub fn next_id_at(&mut self, now: DateTime<Utc>) -> Result<String, StoreError> {
        let current = match &self.path {
            Some(path) => read_counter(path)?,
            None => self.next,
        };

        if let Some(path) = &self.path {
            storage::atomic_write_bytes(path, (current + 1).to_string().as_bytes())?;
        }
        self.next = current + 1;

        Ok(format!("INC-{}-{:04}", now.year(), current))
    }

    /// Number the next call will allocate
    pub fn peek(&self) -> Result<u64, StoreError> {
        match &self.path {
            Some(path) => read_counter(path),
            None => Ok(self.next),
        }
    }
}

fn read_counter(path: &Path) -> Result<u64, StoreError> {
    if !path.exists() {
        return Ok(1);
    }
    let raw = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    raw.trim()
        .parse::<u64>()
        .map(|n| n.max(1))
        .map_err(|_| StoreError::Invalid {
            path: path.to_path_buf(),
            reason: format!("incident counter is not a number: {:?}", raw.trim()),
        })
}

// ============================================================================
// TRANSITIONS
// ============================================================================

/// Open an incident unless one is already OPEN.
///
/// Returns `Ok(true)` when a new incident was created. A counter failure
/// leaves the device untouched.
pub fn open_incident(
    device: &mut DeviceRecord,
    counter: &mut IncidentCounter,
    severity: Severity,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<bool, StoreError> {
    if device.has_open_incident() {
        return Ok(false);
    }

    let id = counter.next_id_at(now)?;
    log::info!("Incident {} opened for {} [{}]: {}", id, device.ip, severity, reason);
    device.incident = Some(Incident::open(id, severity, reason, now));
    Ok(true)
}

/// Close the device's OPEN incident. Returns true on transition.
pub fn close_incident(device: &mut DeviceRecord, reason: &str, now: DateTime<Utc>) -> bool {
    let Some(incident) = device.incident.as_mut() else {
        return false;
    };
    if !incident.is_open() {
        return false;
    }

    incident.status = IncidentStatus::Closed;
    incident.closed_at = Some(now);
    incident.closure_reason = Some(reason.to_string());
    log::info!("Incident {} closed for {}: {}", incident.id, device.ip, reason);
    true
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 10, 8, 30, 0).unwrap()
    }

    fn device() -> DeviceRecord {
        DeviceRecord::new("192.168.1.50", "aa:bb:cc:00:11:22", "Unknown", now())
    }

    #[test]
    fn test_counter_starts_at_one_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".incident_counter");

        let mut counter = IncidentCounter::new(&path);
        assert_eq!(counter.next_id_at(now()).unwrap(), "INC-2025-0001");
        assert_eq!(counter.next_id_at(now()).unwrap(), "INC-2025-0002");
        assert_eq!(fs::read_to_string(&path).unwrap(), "3");

        let mut reopened = IncidentCounter::new(&path);
        assert_eq!(reopened.next_id_at(now()).unwrap(), "INC-2025-0003");
    }

    #[test]
    fn test_counter_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".incident_counter");
        fs::write(&path, "seven").unwrap();

        let mut counter = IncidentCounter::new(&path);
        assert!(counter.next_id_at(now()).is_err());

        let mut device = device();
        assert!(open_incident(&mut device, &mut counter, Severity::High, "x", now()).is_err());
        assert!(device.incident.is_none());
    }

    #[test]
    fn test_open_is_idempotent() {
        let mut counter = IncidentCounter::in_memory(1);
        let mut device = device();

        assert!(open_incident(&mut device, &mut counter, Severity::High, "Risk score exceeded threshold", now()).unwrap());
        let later = now() + Duration::minutes(5);
        assert!(!open_incident(&mut device, &mut counter, Severity::High, "Risk score exceeded threshold", later).unwrap());

        let incident = device.incident.as_ref().unwrap();
        assert_eq!(incident.id, "INC-2025-0001");
        assert_eq!(incident.opened_at, now());
        assert_eq!(counter.peek().unwrap(), 2);
    }

    #[test]
    fn test_close_then_reopen_allocates_new_id() {
        let mut counter = IncidentCounter::in_memory(41);
        let mut device = device();

        open_incident(&mut device, &mut counter, Severity::High, "Risk score exceeded threshold", now()).unwrap();
        assert!(close_incident(&mut device, "Risk score normalized", now() + Duration::hours(1)));
        assert!(!close_incident(&mut device, "again", now() + Duration::hours(2)));

        let closed = device.incident.clone().unwrap();
        assert_eq!(closed.status, IncidentStatus::Closed);
        assert_eq!(closed.closure_reason.as_deref(), Some("Risk score normalized"));
        assert_eq!(closed.duration(), Some(Duration::hours(1)));

        open_incident(&mut device, &mut counter, Severity::Critical, "Malicious infrastructure", now()).unwrap();
        assert_eq!(device.incident.as_ref().unwrap().id, "INC-2025-0042");
    }

    #[test]
    fn test_close_without_incident_is_noop() {
        let mut device = device();
        assert!(!close_incident(&mut device, "Risk score normalized", now()));
        assert!(device.incident.is_none());
    }
}
