//! View-model types handed to the presentation layer.

use serde::{Deserialize, Serialize};

use crate::payload::RawIncident;

/// A `lat`/`lng` pair, renamed from the source's `latitude`/`longitude`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// One stop on a normalized route. `time` is the raw `"HH:MM"` or `"N/A"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStop {
    pub name: String,
    pub time: String,
    pub coords: Coordinates,
}

/// A normalized bus.
///
/// `id` is the position-derived display id (`"Bus 1"`, `"Bus 2"`, ...). It
/// is only meaningful within the snapshot that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusData {
    pub id: String,
    pub name: String,
    pub route_number: String,
    pub status: String,
    /// Utilization percentage, copied from the source.
    pub capacity: f64,
    pub current_location: Coordinates,
    pub next_stop_name: String,
    pub route: Vec<RouteStop>,
}

impl BusData {
    pub fn is_active(&self) -> bool {
        self.status == "Active"
    }

    pub fn is_in_maintenance(&self) -> bool {
        self.status == "Maintenance"
    }
}

/// A raw incident annotated with the bus line it was reported on.
///
/// Identity is `(bus_id, details.id)`; the same incident id may appear under
/// two different lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Incident {
    #[serde(flatten)]
    pub details: RawIncident,
    pub bus_id: u64,
    pub bus_name: String,
}

/// Operational totals computed by the source. Trusted as-is.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OperationalSummary {
    pub total_buses: u32,
    pub active_buses: u32,
    pub maintenance_buses: u32,
    pub total_capacity: u32,
    pub current_passengers: u32,
    pub average_utilization: f64,
}

/// One complete normalized dataset produced by one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransportationSnapshot {
    pub buses: Vec<BusData>,
    pub summary: OperationalSummary,
    #[serde(rename = "allIncidents")]
    pub all_incidents: Vec<Incident>,
}

impl TransportationSnapshot {
    /// The canonical empty snapshot: no buses, all-zero summary, no incidents.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True only for the canonical empty snapshot, summary included.
    pub fn is_empty(&self) -> bool {
        *self == Self::empty()
    }

    pub fn find_bus(&self, id: &str) -> Option<&BusData> {
        self.buses.iter().find(|bus| bus.id == id)
    }
}
