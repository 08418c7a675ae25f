//! Daily risk decay
//!
//! Whole elapsed days since `last_risk_update` each remove `per_day` points.
//! Devices without a timestamp are stamped, not decayed.

use chrono::{DateTime, Utc};

use crate::logic::device::DeviceStore;

/// `score - days * per_day`, never below `floor`, never above `score`
pub fn decay_score(score: u8, days: i64, per_day: u8, floor: u8) -> u8 {
    if days <= 0 {
        return score;
    }
    let decayed = score as i64 - days.saturating_mul(per_day as i64);
    decayed.max(floor as i64).min(score as i64) as u8
}

/// Apply decay to every device. Returns how many devices changed.
pub fn apply_risk_decay(store: &mut DeviceStore, per_day: u8, floor: u8, now: DateTime<Utc>) -> usize {
    let mut changed = 0;

    for device in store.devices.values_mut() {
        let Some(last) = device.last_risk_update else {
            device.last_risk_update = Some(now);
            changed += 1;
            continue;
        };

        let days = (now - last).num_days();
        if days < 1 {
            continue;
        }

        let before = device.risk_score;
        device.risk_score = decay_score(before, days, per_day, floor);
        device.last_risk_update = Some(now);
        changed += 1;

        if device.risk_score != before {
            log::debug!("Decayed {} from {} to {} ({} days)", device.ip, before, device.risk_score, days);
        }
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::device::DeviceRecord;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_decay_is_monotonic() {
        for score in [0u8, 4, 5, 50, 100] {
            assert_eq!(decay_score(score, 0, 5, 0), score);
            for days in 1..40 {
                assert!(decay_score(score, days, 5, 0) <= score);
            }
        }
        assert_eq!(decay_score(60, 3, 5, 0), 45);
        assert_eq!(decay_score(10, 30, 5, 0), 0);
        assert_eq!(decay_score(10, 30, 5, 3), 3);
        assert_eq!(decay_score(2, 1, 5, 3), 2);
    }

    #[test]
    fn test_apply_decay_stamps_and_decays() {
        let mut store = DeviceStore::default();

        let mut stale = DeviceRecord::new("10.0.0.2", "aa:00:00:00:00:02", "Acme", now());
        stale.risk_score = 60;
        stale.last_risk_update = Some(now() - Duration::days(2) - Duration::hours(3));
        store.insert(stale);

        let mut fresh = DeviceRecord::new("10.0.0.3", "aa:00:00:00:00:03", "Acme", now());
        fresh.risk_score = 60;
        fresh.last_risk_update = Some(now() - Duration::hours(23));
        store.insert(fresh);

        let mut unstamped = DeviceRecord::new("10.0.0.4", "aa:00:00:00:00:04", "Acme", now());
        unstamped.risk_score = 60;
        store.insert(unstamped);

        assert_eq!(apply_risk_decay(&mut store, 5, 0, now()), 2);

        let stale = store.get("10.0.0.2").unwrap();
        assert_eq!(stale.risk_score, 50);
        assert_eq!(stale.last_risk_update, Some(now()));

        let fresh = store.get("10.0.0.3").unwrap();
        assert_eq!(fresh.risk_score, 60);
        assert_eq!(fresh.last_risk_update, Some(now() - Duration::hours(23)));

        let unstamped = store.get("10.0.0.4").unwrap();
        assert_eq!(unstamped.risk_score, 60);
        assert_eq!(unstamped.last_risk_update, Some(now()));
    }
}
