//! Telemetry Module
//!
//! Structured security logging. Every automated decision (block, incident,
//! audit finding, daily summary) leaves a JSONL line in `security.log`.
//!
//! ## Structure
//! - `recorder.rs` - `SecurityLog` append-only writer + `read_entries`

pub mod recorder;

pub use recorder::{read_entries, LogEntry, SecurityLog};
