//! Device store schema handling
//!
//! - v2 (current): `{"schema_version": 2, "devices": {ip: record}}`
//! - v1 (legacy): bare `{ip: record}` map with boolean one-shot flags
//!   (`alerted_new`, `vendor_warned`, `malicious_flagged`) and ISO timestamps
//!   that may lack a UTC offset.

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use super::types::{DeviceRecord, DeviceStore, SCHEMA_VERSION};
use crate::logic::storage::{self, StoreError};

const LEGACY_FLAGS: [(&str, &str); 3] = [
    ("alerted_new", "new_device_alerted"),
    ("vendor_warned", "vendor_warned"),
    ("malicious_flagged", "malicious_flagged"),
];

/// Load the device store, migrating older layouts and recovering from backup.
/// Read-only: a corrupt primary is left as it is.
pub fn load_store(path: &Path) -> DeviceStore {
    storage::safe_load_with(path, decode_store)
}

/// `load_store` for runs that will write the store back
pub fn load_store_for_update(path: &Path) -> DeviceStore {
    storage::safe_load_restoring(path, decode_store)
}

pub fn save_store(path: &Path, store: &DeviceStore) -> Result<(), StoreError> {
    storage::atomic_write(path, store)
}

/// Decode any supported layout into the current schema
pub fn decode_store(bytes: &[u8]) -> Result<DeviceStore, StoreError> {
    let value: Value = serde_json::from_slice(bytes)?;

    let version = value
        .get("schema_version")
        .and_then(Value::as_u64)
        .map(|v| v as u32);

    match version {
        Some(v) if v > SCHEMA_VERSION => Err(StoreError::UnsupportedSchema {
            found: v,
            supported: SCHEMA_VERSION,
        }),
        Some(_) => decode_records(value),
        None => migrate_v1(value),
    }
}

fn invalid(reason: &str) -> StoreError {
    StoreError::Invalid {
        path: Path::new("known_devices.json").to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Deserialize each device record on its own; malformed records are skipped
fn decode_records(value: Value) -> Result<DeviceStore, StoreError> {
    let Value::Object(mut root) = value else {
        return Err(invalid("expected a JSON object"));
    };
    let devices = match root.remove("devices") {
        Some(Value::Object(devices)) => devices,
        None | Some(Value::Null) => Map::new(),
        Some(_) => return Err(invalid("`devices` must be an object")),
    };

    let mut store = DeviceStore::default();
    for (ip, raw) in devices {
        match serde_json::from_value::<DeviceRecord>(raw) {
            Ok(device) => {
                store.devices.insert(ip, device);
            }
            Err(e) => log::warn!("Skipping malformed device record for {}: {}", ip, e),
        }
    }
    Ok(store)
}

fn migrate_v1(value: Value) -> Result<DeviceStore, StoreError> {
    let Value::Object(entries) = value else {
        return Err(invalid("expected a JSON object of devices"));
    };

    let mut devices = Map::new();
    for (ip, device) in entries {
        match device {
            Value::Object(obj) => {
                devices.insert(ip.clone(), Value::Object(migrate_device(&ip, obj)));
            }
            other => log::warn!("Skipping malformed legacy record for {}: {}", ip, other),
        }
    }

    let mut root = Map::new();
    root.insert("schema_version".to_string(), Value::from(SCHEMA_VERSION));
    root.insert("devices".to_string(), Value::Object(devices));

    let store = decode_records(Value::Object(root))?;
    log::info!("Migrated legacy device store ({} devices) to schema v{}", store.len(), SCHEMA_VERSION);
    Ok(store)
}

fn migrate_device(ip: &str, mut obj: Map<String, Value>) -> Map<String, Value> {
    obj.entry("ip").or_insert_with(|| Value::from(ip));

    let mac = obj.get("mac").and_then(Value::as_str).map(str::to_lowercase);
    if let Some(mac) = mac {
        obj.insert("mac".to_string(), Value::from(mac));
    }

    let mut triggers = Vec::new();
    for (flag, trigger) in LEGACY_FLAGS {
        if obj.remove(flag).and_then(|v| v.as_bool()).unwrap_or(false) {
            triggers.push(Value::from(trigger));
        }
    }
    obj.insert("triggers".to_string(), Value::Array(triggers));

    // Scores were unbounded ints in v1
    let risk = obj.get("risk_score").and_then(Value::as_i64).unwrap_or(0).clamp(0, 100);
    obj.insert("risk_score".to_string(), Value::from(risk));

    if let Some(Value::Array(history)) = obj.get_mut("risk_history") {
        for entry in history.iter_mut() {
            if let Some(score) = entry.get("risk_score").and_then(Value::as_i64) {
                entry["risk_score"] = Value::from(score.clamp(0, 100));
            }
        }
    }

    if !normalize_timestamp(&mut obj, "first_seen") {
        obj.insert("first_seen".to_string(), Value::from(Utc::now().to_rfc3339()));
    }
    normalize_timestamp(&mut obj, "last_risk_update");
    normalize_timestamp(&mut obj, "trusted_since");

    if let Some(Value::Array(events)) = obj.get_mut("events") {
        events.retain_mut(|e| match e {
            Value::Object(event) => normalize_timestamp(event, "timestamp"),
            _ => false,
        });
    }

    if let Some(Value::Object(incident)) = obj.get_mut("incident") {
        normalize_timestamp(incident, "opened_at");
        normalize_timestamp(incident, "closed_at");
        for key in ["status", "severity"] {
            let upper = incident.get(key).and_then(Value::as_str).map(str::to_uppercase);
            if let Some(upper) = upper {
                incident.insert(key.to_string(), Value::from(upper));
            }
        }
    } else {
        obj.remove("incident");
    }

    obj
}

/// Rewrite `obj[key]` as RFC 3339 UTC. Unparseable values are dropped.
/// Returns true if a valid timestamp remains.
fn normalize_timestamp(obj: &mut Map<String, Value>, key: &str) -> bool {
    let parsed = obj.get(key).and_then(Value::as_str).and_then(parse_legacy_timestamp);
    match parsed {
        Some(ts) => {
            obj.insert(key.to_string(), Value::from(ts.to_rfc3339()));
            true
        }
        None => {
            obj.remove(key);
            false
        }
    }
}

/// Accepts RFC 3339, or a naive ISO timestamp interpreted as UTC
pub fn parse_legacy_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw.replace(' ', "T")) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
