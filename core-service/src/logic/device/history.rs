//! Risk History - one snapshot per calendar date (UTC)

use chrono::NaiveDate;

use super::types::{DeviceRecord, RiskSnapshot};

/// Record today's score; a same-day re-scan overwrites instead of appending
pub fn record_risk_snapshot(device: &mut DeviceRecord, risk_score: u8, date: NaiveDate) {
    if let Some(entry) = device.risk_history.iter_mut().find(|e| e.date == date) {
        entry.risk_score = risk_score;
        return;
    }

    device.risk_history.push(RiskSnapshot { date, risk_score });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_same_day_overwrites() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut device = DeviceRecord::new("10.0.0.7", "aa:bb:cc:00:00:07", "Acme", now);
        let day = now.date_naive();

        record_risk_snapshot(&mut device, 35, day);
        record_risk_snapshot(&mut device, 60, day);
        assert_eq!(device.risk_history.len(), 1);
        assert_eq!(device.risk_history[0].risk_score, 60);

        record_risk_snapshot(&mut device, 55, day.succ_opt().unwrap());
        assert_eq!(device.risk_history.len(), 2);
        assert_eq!(device.risk_history[1].risk_score, 55);
    }
}
