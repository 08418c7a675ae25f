//! Security Log Recorder
//!
//! Append-only JSONL writer for `security.log`. One object per line:
//! `{"timestamp", "level", "message", ...fields}`. Never colourised.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::logic::alerts::AlertLevel;

// ============================================================================
// ENTRY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: AlertLevel,
    pub message: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl LogEntry {
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

// ============================================================================
// RECORDER
// ============================================================================

/// Structured security log. Opened in append mode per entry so concurrent
/// readers (`tail -f`) always see whole lines.
#[derive(Debug)]
pub struct SecurityLog {
    path: PathBuf,
    written: AtomicU64,
}

impl SecurityLog {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            written: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record an entry. `fields` must be a JSON object (or null); anything
    /// else is stored under `"data"`. Failures are logged, never raised.
    pub fn log_event(&self, level: AlertLevel, message: &str, fields: Value) {
        self.log_event_at(level, message, fields, Utc::now());
    }

    pub fn log_event_at(&self, level: AlertLevel, message: &str, fields: Value, now: DateTime<Utc>) {
        let fields = match fields {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };

        let entry = LogEntry {
            timestamp: now,
            level,
            message: message.to_string(),
            fields,
        };

        if let Err(e) = self.append(&entry) {
            log::error!("Failed to write security log {}: {}", self.path.display(), e);
        }
    }

    fn append(&self, entry: &LogEntry) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, entry)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        self.written.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Entries written by this instance
    pub fn entries_written(&self) -> u64 {
        self.written.load(Ordering::SeqCst)
    }
}

// ============================================================================
// QUERY API
// ============================================================================

/// Read every parseable entry; malformed lines are skipped
pub fn read_entries(path: &Path) -> std::io::Result<Vec<LogEntry>> {
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if let Ok(entry) = serde_json::from_str::<LogEntry>(&line) {
            entries.push(entry);
        }
    }

    Ok(entries)
}
