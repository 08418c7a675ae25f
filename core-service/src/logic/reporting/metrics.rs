//! SOC metrics: incident counts, MTTD / MTTR, action counts from timelines

use serde::Serialize;

use crate::logic::device::DeviceStore;
use crate::logic::incident::IncidentStatus;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SocMetrics {
    pub incidents_opened: usize,
    pub incidents_closed: usize,
    /// Mean `opened_at - first_seen`
    pub mttd_seconds: i64,
    /// Mean `closed_at - opened_at` over closed incidents
    pub mttr_seconds: i64,
    pub auto_actions: usize,
    pub manual_actions: usize,
}

fn mean(total: i64, count: i64) -> i64 {
    if count == 0 {
        0
    } else {
        total / count
    }
}

pub fn calculate_metrics(store: &DeviceStore) -> SocMetrics {
    let mut metrics = SocMetrics::default();
    let (mut mttd_total, mut mttd_count) = (0i64, 0i64);
    let (mut mttr_total, mut mttr_count) = (0i64, 0i64);

    for device in store.values() {
        if let Some(incident) = &device.incident {
            metrics.incidents_opened += 1;
            mttd_total += (incident.opened_at - device.first_seen).num_seconds();
            mttd_count += 1;

            if incident.status == IncidentStatus::Closed {
                metrics.incidents_closed += 1;
                if let Some(duration) = incident.duration() {
                    mttr_total += duration.num_seconds();
                    mttr_count += 1;
                }
            }
        }

        for event in &device.events {
            let msg = event.message.to_lowercase();
            if msg.contains("blocked") || msg.contains("auto") {
                metrics.auto_actions += 1;
            }
            if msg.contains("manual") {
                metrics.manual_actions += 1;
            }
        }
    }

    metrics.mttd_seconds = mean(mttd_total, mttd_count);
    metrics.mttr_seconds = mean(mttr_total, mttr_count);
    metrics
}

pub fn render_metrics(m: &SocMetrics) -> String {
    format!(
        "\n=== SOC METRICS ===\n\n\
         Incidents Opened : {}\n\
         Incidents Closed : {}\n\
         MTTD             : {} seconds\n\
         MTTR             : {} seconds\n\
         Auto Actions     : {}\n\
         Manual Actions   : {}\n",
        m.incidents_opened, m.incidents_closed, m.mttd_seconds, m.mttr_seconds, m.auto_actions, m.manual_actions
    )
}
