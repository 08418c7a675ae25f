//! Text visualisations for `--visualize`

use chrono::{DateTime, Utc};

use crate::logic::alerts::AlertLevel;
use crate::logic::device::DeviceStore;
use crate::logic::risk::decay_score;

pub const BAR_WIDTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    High,
    Medium,
    Low,
    Info,
}

impl RiskLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            70.. => RiskLevel::High,
            40..=69 => RiskLevel::Medium,
            15..=39 => RiskLevel::Low,
            _ => RiskLevel::Info,
        }
    }

    fn alert_level(&self) -> AlertLevel {
        match self {
            RiskLevel::High => AlertLevel::High,
            RiskLevel::Medium => AlertLevel::Medium,
            RiskLevel::Low => AlertLevel::Low,
            RiskLevel::Info => AlertLevel::Info,
        }
    }
}

/// `score`% of `BAR_WIDTH`, padded with `empty`
pub fn draw_bar(score: u8, filled: char, empty: char) -> String {
    let n = (score.min(100) as usize * BAR_WIDTH) / 100;
    let mut bar: String = std::iter::repeat(filled).take(n).collect();
    bar.extend(std::iter::repeat(empty).take(BAR_WIDTH - n));
    bar
}

pub fn render_risk_history(store: &DeviceStore) -> String {
    let mut out = String::from("\n=== RISK HISTORY ===\n\n");

    for device in store.values().filter(|d| !d.risk_history.is_empty()) {
        out.push_str(&device.ip);
        out.push('\n');
        for snap in &device.risk_history {
            out.push_str(&format!(
                "{} | {} {}\n",
                snap.date,
                draw_bar(snap.risk_score, '█', ' '),
                snap.risk_score
            ));
        }
        out.push('\n');
    }
    out
}

/// `id | ip | severity | status | duration`
pub fn render_incident_summary(store: &DeviceStore) -> String {
    let mut out = String::from("\n=== INCIDENT SUMMARY ===\n\n");

    for device in store.values() {
        let Some(incident) = &device.incident else {
            continue;
        };
        let duration = match incident.duration() {
            Some(d) => {
                let secs = d.num_seconds().max(0);
                format!("{}m {}s", secs / 60, secs % 60)
            }
            None => "OPEN".to_string(),
        };
        out.push_str(&format!(
            "{} | {} | {} | {} | {}\n",
            incident.id, device.ip, incident.severity, incident.status.as_str(), duration
        ));
    }
    out
}

/// Current score, projected score after pending decay, and elapsed days
pub fn render_decay_view(store: &DeviceStore, per_day: u8, now: DateTime<Utc>) -> String {
    if store.is_empty() {
        return "No device data available.\n".to_string();
    }

    let mut out = String::from("\n=== DEVICE RISK DECAY VIEW ===\n");
    out.push_str("IP ADDRESS        RISK TREND\n");
    out.push_str(&"-".repeat(65));
    out.push('\n');

    let mut devices: Vec<_> = store.values().collect();
    devices.sort_by(|a, b| b.risk_score.cmp(&a.risk_score));

    for device in devices {
        let current = device.risk_score;
        let days = device
            .last_risk_update
            .map_or(0, |last| (now - last).num_days().max(0));
        let projected = decay_score(current, days, per_day, 0);

        let line = format!(
            "{:<17} [{}] {} -> {} ({}d)",
            device.ip,
            draw_bar(current, '█', '░'),
            current,
            projected,
            days
        );
        let level = RiskLevel::from_score(current).alert_level();
        out.push_str(&format!("{}\n", level.paint(&line)));
    }

    out.push_str("\nLegend:\n");
    for (label, level) in [
        ("  HIGH   >= 70", AlertLevel::High),
        ("  MEDIUM >= 40", AlertLevel::Medium),
        ("  LOW    >= 15", AlertLevel::Low),
        ("  INFO   < 15", AlertLevel::Info),
    ] {
        out.push_str(&format!("{}\n", level.paint(label)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::device::{record_risk_snapshot, DeviceRecord};
    use crate::logic::incident::{close_incident, Incident, Severity};
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_bar_width() {
        assert_eq!(draw_bar(0, '#', '.'), ".".repeat(20));
        assert_eq!(draw_bar(50, '#', '.'), format!("{}{}", "#".repeat(10), ".".repeat(10)));
        assert_eq!(draw_bar(100, '#', '.').chars().count(), BAR_WIDTH);
        assert_eq!(draw_bar(250, '#', '.'), "#".repeat(20));
    }

    #[test]
    fn test_risk_levels() {
        assert_eq!(RiskLevel::from_score(70), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(69), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(15), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(14), RiskLevel::Info);
    }

    #[test]
    fn test_incident_summary_durations() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut store = DeviceStore::default();

        let mut closed = DeviceRecord::new("10.0.0.1", "", "Acme", t0);
        closed.incident = Some(Incident::open("INC-2025-0001".into(), Severity::High, "x", t0));
        close_incident(&mut closed, "Risk score normalized", t0 + Duration::seconds(125));
        store.insert(closed);

        let mut open = DeviceRecord::new("10.0.0.2", "", "Acme", t0);
        open.incident = Some(Incident::open("INC-2025-0002".into(), Severity::Critical, "x", t0));
        store.insert(open);

        let table = render_incident_summary(&store);
        assert!(table.contains("INC-2025-0001 | 10.0.0.1 | HIGH | CLOSED | 2m 5s"));
        assert!(table.contains("INC-2025-0002 | 10.0.0.2 | CRITICAL | OPEN | OPEN"));
    }

    #[test]
    fn test_history_and_decay_views() {
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        let mut d = DeviceRecord::new("10.0.0.3", "", "Acme", now);
        d.risk_score = 60;
        d.last_risk_update = Some(now - Duration::days(2));
        record_risk_snapshot(&mut d, 60, now.date_naive());
        let mut store = DeviceStore::default();
        store.insert(d);

        let history = render_risk_history(&store);
        assert!(history.contains("2025-01-10 |"));
        assert!(history.contains(" 60"));

        let decay = render_decay_view(&store, 5, now);
        assert!(decay.contains("60 -> 50 (2d)"));
        assert!(decay.contains("Legend:"));

        assert_eq!(render_decay_view(&DeviceStore::default(), 5, now), "No device data available.\n");
    }
}
