//! Converts raw bus lines into the [`BusData`] view model.

use anyhow::{Context, Result};
use chrono::Timelike;

use crate::payload::{RawBusLine, RawCoordinates, RawStop};
use crate::schedule::{UNKNOWN_STOP, next_stop_index};
use crate::snapshot::{BusData, Coordinates, RouteStop};

impl From<&RawCoordinates> for Coordinates {
    fn from(raw: &RawCoordinates) -> Self {
        Coordinates {
            lat: raw.latitude,
            lng: raw.longitude,
        }
    }
}

impl From<&RawStop> for RouteStop {
    fn from(stop: &RawStop) -> Self {
        RouteStop {
            name: stop.name.clone(),
            time: stop.estimated_arrival.clone(),
            coords: Coordinates {
                lat: stop.latitude,
                lng: stop.longitude,
            },
        }
    }
}

/// Display id for the bus at 0-based `position` in the payload.
pub fn display_id(position: usize) -> String {
    format!("Bus {}", position + 1)
}

/// Name of the nearest future stop on `stops`, or `"Unknown"`.
///
/// The source's `is_next_stop` flag is ignored; the answer comes from the
/// estimated arrival times alone.
pub fn resolve_next_stop_name<T: Timelike>(stops: &[RawStop], now: &T) -> Result<String> {
    let times = stops.iter().map(|stop| stop.estimated_arrival.as_str());
    let name = match next_stop_index(times, now)? {
        Some(index) => stops[index].name.clone(),
        None => UNKNOWN_STOP.to_string(),
    };
    Ok(name)
}

/// Normalizes one bus line found at 0-based `position` in the payload.
///
/// # Errors
///
/// Returns an error if any timed stop does not match `"HH:MM"`.
pub fn normalize_line<T: Timelike>(line: &RawBusLine, position: usize, now: &T) -> Result<BusData> {
    let next_stop_name = resolve_next_stop_name(&line.bus_stops, now)
        .with_context(|| format!("bus line {} ({}) has a malformed stop time", line.id, line.name))?;

    Ok(BusData {
        id: display_id(position),
        name: line.name.clone(),
        route_number: line.route_number.clone(),
        status: line.status.clone(),
        capacity: line.passengers.utilization_percentage,
        current_location: Coordinates::from(&line.current_location),
        next_stop_name,
        route: line.bus_stops.iter().map(RouteStop::from).collect(),
    })
}

/// Normalizes every line in payload order. Fails on the first bad line.
pub fn normalize_lines<T: Timelike>(lines: &[RawBusLine], now: &T) -> Result<Vec<BusData>> {
    lines
        .iter()
        .enumerate()
        .map(|(position, line)| normalize_line(line, position, now))
        .collect()
}
