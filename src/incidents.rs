//! Flattens per-line incident lists into one dashboard-wide list.

use crate::payload::RawBusLine;
use crate::snapshot::Incident;

/// Incidents of one line, annotated with the line's raw id and name.
pub fn line_incidents(line: &RawBusLine) -> impl Iterator<Item = Incident> + '_ {
    line.incidents.iter().map(move |incident| Incident {
        details: incident.clone(),
        bus_id: line.id,
        bus_name: line.name.clone(),
    })
}

/// All incidents in line order, then per-line order. No deduplication.
pub fn aggregate_incidents(lines: &[RawBusLine]) -> Vec<Incident> {
    lines.iter().flat_map(line_incidents).collect()
}
