//! Device Module - Registry of observed LAN devices
//!
//! # Components
//! - `types.rs`: `DeviceRecord`, `DeviceStore`, `Trigger`
//! - `migrate.rs`: schema versioning + load/save of `known_devices.json`
//! - `timeline.rs`: append-only event timeline
//! - `history.rs`: daily risk snapshots

pub mod types;
pub mod migrate;
pub mod timeline;
pub mod history;

pub use types::{
    DeviceRecord, DeviceStore, DeviceEvent, RiskSnapshot, Trigger,
    normalize_mac, UNKNOWN_VENDOR, SCHEMA_VERSION, MAX_RISK,
};
pub use migrate::{load_store, load_store_for_update, save_store};
pub use timeline::{add_event, render_timeline};
pub use history::record_risk_snapshot;
