use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::snapshot::TransportationSnapshot;

/// Utilization above which a bus is flagged as crowded.
pub const UTILIZATION_ALERT_PERCENT: f64 = 80.0;

/// Figures derived locally from a snapshot for the dashboard header.
///
/// These never replace the source's [`OperationalSummary`](crate::snapshot::OperationalSummary);
/// they only count what is present in the snapshot itself.
#[derive(Debug, Default, Serialize)]
pub struct SnapshotStats {
    pub computed_at: DateTime<Utc>,
    pub buses: usize,
    pub active: usize,
    pub maintenance: usize,

    pub incidents: usize,
    pub high_priority_incidents: usize,

    /// Display ids of buses over [`UTILIZATION_ALERT_PERCENT`].
    pub crowded_buses: Vec<String>,
    /// Source-reported average utilization, rounded for display.
    pub average_utilization_rounded: i64,
}

impl SnapshotStats {
    pub fn from_snapshot(snapshot: &TransportationSnapshot) -> Self {
        let mut s = SnapshotStats {
            computed_at: Utc::now(),
            buses: snapshot.buses.len(),
            incidents: snapshot.all_incidents.len(),
            average_utilization_rounded: snapshot.summary.average_utilization.round() as i64,
            ..Default::default()
        };

        for bus in &snapshot.buses {
            if bus.is_active() {
                s.active += 1;
            }

            if bus.is_in_maintenance() {
                s.maintenance += 1;
            }

            if is_crowded(bus.capacity) {
                s.crowded_buses.push(bus.id.clone());
            }
        }

        s.high_priority_incidents = snapshot
            .all_incidents
            .iter()
            .filter(|i| i.details.is_high_priority())
            .count();

        s
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    pub fn active_pct(&self) -> f64 {
        Self::pct(self.active, self.buses)
    }

    pub fn high_priority_pct(&self) -> f64 {
        Self::pct(self.high_priority_incidents, self.incidents)
    }
}

pub fn is_crowded(utilization: f64) -> bool {
    utilization > UTILIZATION_ALERT_PERCENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::tests::{incident, line};
    use crate::pipeline::build_snapshot;
    use crate::payload::RawPayload;
    use crate::snapshot::OperationalSummary;
    use chrono::NaiveTime;

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(SnapshotStats::pct(10, 0), 0.0);
    }

    #[test]
    fn test_pct_normal_values() {
        assert_eq!(SnapshotStats::pct(50, 100), 50.0);
        assert_eq!(SnapshotStats::pct(1, 4), 25.0);
    }

    #[test]
    fn test_from_empty_snapshot() {
        let stats = SnapshotStats::from_snapshot(&TransportationSnapshot::empty());
        assert_eq!(stats.buses, 0);
        assert_eq!(stats.active_pct(), 0.0);
        assert!(stats.crowded_buses.is_empty());
    }

    #[test]
    fn test_from_snapshot_counts() {
        let mut busy = line(1, "Active", vec![]);
        busy.passengers.utilization_percentage = 95.0;
        busy.incidents = vec![incident(1, "High"), incident(2, "Low")];
        let mut edge = line(2, "Active", vec![]);
        edge.passengers.utilization_percentage = 80.0;
        let parked = line(3, "Maintenance", vec![]);

        let payload = RawPayload {
            bus_lines: Some(vec![busy, edge, parked]),
            operational_summary: Some(OperationalSummary {
                average_utilization: 58.5,
                ..Default::default()
            }),
        };
        let now = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        let snapshot = build_snapshot(&payload, &now).unwrap();
        let stats = SnapshotStats::from_snapshot(&snapshot);

        assert_eq!(stats.buses, 3);
        assert_eq!(stats.active, 2);
        assert_eq!(stats.maintenance, 1);
        assert_eq!(stats.incidents, 2);
        assert_eq!(stats.high_priority_incidents, 1);
        assert_eq!(stats.high_priority_pct(), 50.0);
        assert_eq!(stats.crowded_buses, vec!["Bus 1".to_string()]);
        assert_eq!(stats.average_utilization_rounded, 59);
    }
}
