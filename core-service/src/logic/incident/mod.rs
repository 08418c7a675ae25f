//! Incident Module - per-device incident records
//!
//! # Components
//! - `types.rs`: `Incident`, `IncidentStatus`, `Severity`
//! - `manager.rs`: `IncidentCounter`, `open_incident`, `close_incident`

pub mod types;
pub mod manager;

pub use types::{Incident, IncidentStatus, Severity};
pub use manager::{close_incident, open_incident, IncidentCounter};
