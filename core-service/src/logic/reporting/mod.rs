//! Reporting Module - read-only SOC views over the device store
//!
//! # Components
//! - `summary.rs`: fleet summary + daily summary log entry
//! - `metrics.rs`: MTTD / MTTR and action counts
//! - `visualize.rs`: risk history bars, incident table, decay projection
//! - `export.rs`: JSON / CSV exports

pub mod summary;
pub mod metrics;
pub mod visualize;
pub mod export;

pub use summary::{log_daily_summary, render_summary, summarize, SocSummary, Verdict};
pub use metrics::{calculate_metrics, render_metrics, SocMetrics};
pub use visualize::{render_decay_view, render_incident_summary, render_risk_history, RiskLevel};
pub use export::{export_devices, export_timeline, ExportError, ExportFormat};
