//! JSON parser and wire types for the transit data source.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::snapshot::OperationalSummary;

/// Time sentinel used by the source for stops without a scheduled arrival.
pub const NO_ARRIVAL: &str = "N/A";

/// Top-level payload returned by the transit API.
///
/// Both keys are optional: a missing or `null` `bus_lines` is an empty list
/// and a missing `operational_summary` is the all-zero summary.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPayload {
    #[serde(default)]
    pub bus_lines: Option<Vec<RawBusLine>>,
    #[serde(default)]
    pub operational_summary: Option<OperationalSummary>,
}

impl RawPayload {
    pub fn bus_lines(&self) -> &[RawBusLine] {
        self.bus_lines.as_deref().unwrap_or_default()
    }

    pub fn summary(&self) -> OperationalSummary {
        self.operational_summary.clone().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawCoordinates {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawPassengers {
    #[serde(default)]
    pub current: f64,
    #[serde(default)]
    pub capacity: f64,
    pub utilization_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawStop {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    /// `"HH:MM"` or [`NO_ARRIVAL`].
    pub estimated_arrival: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub is_next_stop: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawIncident {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub reported_by: String,
    pub reported_time: String,
    pub status: String,
    pub priority: String,
}

impl RawIncident {
    pub fn is_high_priority(&self) -> bool {
        self.priority == "High"
    }
}

/// One bus line as published by the source. Read-only to this crate.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawBusLine {
    pub id: u64,
    pub name: String,
    pub route_number: String,
    pub status: String,
    pub current_location: RawCoordinates,
    pub passengers: RawPassengers,
    pub bus_stops: Vec<RawStop>,
    pub incidents: Vec<RawIncident>,
}

/// Decodes a raw transit payload from JSON bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not JSON or a bus line is missing a
/// required field.
pub fn parse_payload(bytes: &[u8]) -> Result<RawPayload> {
    serde_json::from_slice(bytes).context("transit payload is not valid JSON for the expected shape")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_object_returns_default_payload() {
        let payload = parse_payload(b"{}").unwrap();
        assert!(payload.bus_lines().is_empty());
        assert_eq!(payload.summary(), OperationalSummary::default());
    }

    #[test]
    fn test_parse_null_bus_lines_is_empty() {
        let payload = parse_payload(br#"{"bus_lines": null}"#).unwrap();
        assert!(payload.bus_lines().is_empty());
    }

    #[test]
    fn test_parse_invalid_bytes() {
        assert!(parse_payload(&[0xFF, 0xFE, 0x00]).is_err());
        assert!(parse_payload(b"[1, 2, 3]").is_err());
    }

    #[test]
    fn test_parse_line_missing_required_field_fails() {
        let json = br#"{"bus_lines": [{"id": 1, "name": "Route 1"}]}"#;
        assert!(parse_payload(json).is_err());
    }

    #[test]
    fn test_parse_partial_summary_defaults_missing_fields() {
        let json = br#"{"operational_summary": {"total_buses": 4, "average_utilization": 41.5}}"#;
        let summary = parse_payload(json).unwrap().summary();
        assert_eq!(summary.total_buses, 4);
        assert_eq!(summary.active_buses, 0);
        assert_eq!(summary.average_utilization, 41.5);
    }

    #[test]
    fn test_parse_line_tolerates_unread_fields_missing_or_fractional() {
        let json = br#"{"bus_lines": [{
            "id": 4, "name": "Route 4", "route_number": "R4", "status": "Active",
            "current_location": {"latitude": 3.1, "longitude": 101.7},
            "passengers": {"current": 12.5, "utilization_percentage": 31.25},
            "bus_stops": [{"name": "Depot", "estimated_arrival": "09:00", "latitude": 3.2, "longitude": 101.8}],
            "incidents": []
        }]}"#;
        let payload = parse_payload(json).unwrap();
        let line = &payload.bus_lines()[0];

        assert_eq!(line.passengers.current, 12.5);
        assert_eq!(line.passengers.capacity, 0.0);
        assert_eq!(line.bus_stops[0].id, 0);
        assert!(!line.bus_stops[0].is_next_stop);
    }

    #[test]
    fn test_parse_incident_type_field() {
        let json = br#"{
            "id": 3, "type": "Delay", "description": "Traffic", "reported_by": "Driver",
            "reported_time": "08:10", "status": "Open", "priority": "High"
        }"#;
        let incident: RawIncident = serde_json::from_slice(json).unwrap();
        assert_eq!(incident.kind, "Delay");
        assert!(incident.is_high_priority());
    }
}
