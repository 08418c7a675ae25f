//! Device Timeline - append-only audit trail per device

use chrono::{DateTime, Utc};

use super::types::{DeviceEvent, DeviceRecord, DeviceStore};

/// Append an event. Entries are never edited or removed.
pub fn add_event(device: &mut DeviceRecord, message: &str, now: DateTime<Utc>) {
    device.events.push(DeviceEvent {
        timestamp: now,
        message: message.to_string(),
    });
}

/// Human-readable timeline for `--timeline <ip>`
pub fn render_timeline(store: &DeviceStore, ip: &str) -> String {
    let Some(device) = store.get(ip) else {
        return format!("Device not found: {}\n", ip);
    };

    let mut out = format!("\n=== INCIDENT TIMELINE: {} ===\n\n", ip);

    if device.events.is_empty() {
        out.push_str("No events recorded for this device.\n");
        return out;
    }

    for event in &device.events {
        out.push_str(&format!(
            "[{}] {}\n",
            event.timestamp.format("%Y-%m-%d %H:%M"),
            event.message
        ));
    }
    out
}
