//! Output formatting for snapshots and the dashboard.
//!
//! Supports JSON rendering and a log-based dashboard view.

use anyhow::Result;
use chrono::Timelike;
use tracing::{debug, info, warn};

use crate::poller::DashboardState;
use crate::schedule::{ScheduleView, StopStatus, schedule_view};
use crate::snapshot::TransportationSnapshot;
use crate::stats::{SnapshotStats, is_crowded};

/// Logs a snapshot using Rust's debug pretty-print format.
pub fn print_pretty(snapshot: &TransportationSnapshot) {
    debug!("{:#?}", snapshot);
}

/// Serializes a snapshot to JSON, optionally pretty-printed.
pub fn render_json(snapshot: &TransportationSnapshot, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(snapshot)?
    } else {
        serde_json::to_string(snapshot)?
    };
    Ok(json)
}

/// Logs the dashboard: summary, incidents, and the selected bus schedule.
pub fn log_dashboard<T: Timelike>(state: &DashboardState, now: &T) -> Result<()> {
    if state.is_loading() {
        info!("Loading transportation data");
        return Ok(());
    }

    if let Some(banner) = &state.error {
        warn!(banner = %banner, "Dashboard error");
    }

    let snapshot = &state.snapshot;
    let summary = &snapshot.summary;
    let stats = SnapshotStats::from_snapshot(snapshot);

    info!(
        total_buses = summary.total_buses,
        active = summary.active_buses,
        in_maintenance = summary.maintenance_buses,
        avg_utilization = %format!("{}%", stats.average_utilization_rounded),
        high_priority_incidents = stats.high_priority_incidents,
        crowded = ?stats.crowded_buses,
        "Operational summary"
    );

    if snapshot.all_incidents.is_empty() {
        info!("All systems operational. No active incidents.");
    }
    for incident in &snapshot.all_incidents {
        info!(
            bus_id = incident.bus_id,
            bus_name = %incident.bus_name,
            kind = %incident.details.kind,
            reported = %incident.details.reported_time,
            priority = %incident.details.priority,
            "{}",
            incident.details.description
        );
    }

    let Some(bus) = state.selected_bus() else {
        return Ok(());
    };

    info!(
        bus = %bus.id,
        route = %bus.name,
        route_number = %bus.route_number,
        status = %bus.status,
        utilization = %format!("{}%", bus.capacity),
        crowded = is_crowded(bus.capacity),
        next_stop = %bus.next_stop_name,
        lat = bus.current_location.lat,
        lng = bus.current_location.lng,
        "Selected bus"
    );

    match schedule_view(bus, now)? {
        ScheduleView::NoActiveRoute { status } => {
            info!(
                "This bus is currently {} and has no active route schedule.",
                status.to_lowercase()
            );
        }
        ScheduleView::Table(rows) => {
            for row in rows {
                let label = match row.status {
                    StopStatus::Inactive => "Inactive",
                    StopStatus::NextStop => "Next Stop",
                    StopStatus::EnRoute => "En Route",
                };
                info!(stop = %row.name, arrival = %row.time, status = label, "Schedule");
            }
        }
    }

    Ok(())
}
