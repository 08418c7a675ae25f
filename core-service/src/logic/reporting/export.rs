//! Device and timeline exports (`exports/` under the data directory)

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use csv::Writer;
use serde_json::json;

use crate::logic::device::{DeviceRecord, DeviceStore};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Unsupported export format: {0} (expected json or csv)")]
    UnsupportedFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

fn ensure_dir(dir: &Path) -> Result<(), ExportError> {
    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    fs::write(path, bytes).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ============================================================================
// DEVICES
// ============================================================================

/// Write `soc_devices.{json,csv}` and return its path
pub fn export_devices(
    store: &DeviceStore,
    export_dir: &Path,
    format: ExportFormat,
    now: DateTime<Utc>,
) -> Result<PathBuf, ExportError> {
    ensure_dir(export_dir)?;
    let out = export_dir.join(format!("soc_devices.{}", format.extension()));

    let bytes = match format {
        ExportFormat::Json => {
            let devices: Vec<&DeviceRecord> = store.values().collect();
            let payload = json!({
                "generated_utc": now.to_rfc3339(),
                "device_count": devices.len(),
                "devices": devices,
            });
            serde_json::to_vec_pretty(&payload)?
        }
        ExportFormat::Csv => devices_csv(store)?,
    };

    write_file(&out, &bytes)?;
    log::info!("Exported {} devices to {}", store.len(), out.display());
    Ok(out)
}

fn devices_csv(store: &DeviceStore) -> Result<Vec<u8>, ExportError> {
    let mut writer = Writer::from_writer(vec![]);

    writer.write_record([
        "ip",
        "mac",
        "vendor",
        "trusted",
        "manual_override",
        "risk_score",
        "blocked",
        "first_seen",
    ])?;

    for d in store.values() {
        writer.write_record([
            d.ip.as_str(),
            d.mac.as_str(),
            d.vendor.as_str(),
            &d.trusted.to_string(),
            &d.manual_override.to_string(),
            &d.risk_score.to_string(),
            &d.blocked.to_string(),
            &d.first_seen.to_rfc3339(),
        ])?;
    }

    writer.into_inner().map_err(|e| ExportError::Csv(e.into_error().into()))
}

// ============================================================================
// TIMELINE
// ============================================================================

/// Write `timeline_<ip>.{json,csv}` and return its path
pub fn export_timeline(
    store: &DeviceStore,
    ip: &str,
    export_dir: &Path,
    format: ExportFormat,
) -> Result<PathBuf, ExportError> {
    let device = store
        .get(ip)
        .ok_or_else(|| ExportError::DeviceNotFound(ip.to_string()))?;

    ensure_dir(export_dir)?;
    let file_ip = ip.replace(':', "_");
    let out = export_dir.join(format!("timeline_{}.{}", file_ip, format.extension()));

    let bytes = match format {
        ExportFormat::Json => serde_json::to_vec_pretty(&json!({
            "ip": ip,
            "event_count": device.events.len(),
            "events": device.events,
        }))?,
        ExportFormat::Csv => {
            let mut writer = Writer::from_writer(vec![]);
            writer.write_record(["timestamp", "event"])?;
            for event in &device.events {
                writer.write_record([event.timestamp.to_rfc3339().as_str(), event.message.as_str()])?;
            }
            writer.into_inner().map_err(|e| ExportError::Csv(e.into_error().into()))?
        }
    };

    write_file(&out, &bytes)?;
    log::info!("Exported {} timeline events to {}", device.events.len(), out.display());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::device::add_event;

    fn store() -> DeviceStore {
        let now = Utc::now();
        let mut d = DeviceRecord::new("10.0.0.7", "AA:BB:CC:DD:EE:07", "Acme, Inc.", now);
        d.risk_score = 42;
        add_event(&mut d, "First seen on network", now);
        add_event(&mut d, "Unknown vendor detected", now);
        let mut store = DeviceStore::default();
        store.insert(d);
        store
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!(matches!("xml".parse::<ExportFormat>(), Err(ExportError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_devices_json() {
        let dir = tempfile::tempdir().unwrap();
        let out = export_devices(&store(), &dir.path().join("exports"), ExportFormat::Json, Utc::now()).unwrap();
        assert!(out.ends_with("soc_devices.json"));

        let value: serde_json::Value = serde_json::from_slice(&fs::read(&out).unwrap()).unwrap();
        assert_eq!(value["device_count"], 1);
        assert_eq!(value["devices"][0]["ip"], "10.0.0.7");
    }

    #[test]
    fn test_devices_csv_quotes_fields() {
        let dir = tempfile::tempdir().unwrap();
        let out = export_devices(&store(), dir.path(), ExportFormat::Csv, Utc::now()).unwrap();

        let mut reader = csv::Reader::from_path(&out).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.get(0), Some("ip"));
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get(2), Some("Acme, Inc."));
        assert_eq!(rows[0].get(5), Some("42"));
    }

    #[test]
    fn test_timeline_exports() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();

        let csv_out = export_timeline(&store, "10.0.0.7", dir.path(), ExportFormat::Csv).unwrap();
        assert!(csv_out.ends_with("timeline_10.0.0.7.csv"));
        let text = fs::read_to_string(&csv_out).unwrap();
        assert!(text.starts_with("timestamp,event\n"));
        assert_eq!(text.lines().count(), 3);

        let json_out = export_timeline(&store, "10.0.0.7", dir.path(), ExportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&fs::read(&json_out).unwrap()).unwrap();
        assert_eq!(value["event_count"], 2);

        assert!(matches!(
            export_timeline(&store, "10.9.9.9", dir.path(), ExportFormat::Json),
            Err(ExportError::DeviceNotFound(_))
        ));
    }
}
