//! Time-of-day arithmetic and next-stop resolution.
//!
//! Comparisons are made against the reference instant's own calendar day.
//! There is no rollover: at 23:50 a stop at 00:10 is 1420 minutes in the
//! past, not 20 minutes in the future.

use anyhow::{Result, bail};
use chrono::{NaiveTime, Timelike};
use serde::Serialize;

use crate::payload::NO_ARRIVAL;
use crate::snapshot::{BusData, RouteStop};

/// Name reported when a bus has no upcoming stop.
pub const UNKNOWN_STOP: &str = "Unknown";

/// Parses a strict `"HH:MM"` string (hour 0-23, minute 0-59).
pub fn parse_hhmm(time: &str) -> Result<NaiveTime> {
    let bytes = time.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        bail!("invalid stop time {time:?}: expected HH:MM");
    }

    let (hour, minute) = (&time[..2], &time[3..]);
    if !hour.bytes().chain(minute.bytes()).all(|b| b.is_ascii_digit()) {
        bail!("invalid stop time {time:?}: expected HH:MM");
    }

    match NaiveTime::from_hms_opt(hour.parse::<u32>()?, minute.parse::<u32>()?, 0) {
        Some(t) => Ok(t),
        None => bail!("invalid stop time {time:?}: out of range"),
    }
}

/// Minutes from `now` until `time` on the same day. Positive means later
/// today; zero or negative means now or already past. Seconds are ignored.
///
/// The `"N/A"` sentinel is not accepted here; callers skip it.
pub fn minutes_until<T: Timelike>(time: &str, now: &T) -> Result<i64> {
    let stop = parse_hhmm(time)?;
    let stop_minutes = i64::from(stop.hour() * 60 + stop.minute());
    let now_minutes = i64::from(now.hour() * 60 + now.minute());
    Ok(stop_minutes - now_minutes)
}

/// Index of the stop with the smallest strictly positive minutes-until.
///
/// Stops timed `"N/A"` are skipped. On ties the earliest stop wins. Returns
/// `None` when no stop is in the future.
pub fn next_stop_index<'a, T, I>(times: I, now: &T) -> Result<Option<usize>>
where
    T: Timelike,
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(usize, i64)> = None;

    for (index, time) in times.into_iter().enumerate() {
        if time == NO_ARRIVAL {
            continue;
        }

        let diff = minutes_until(time, now)?;
        if diff > 0 && best.is_none_or(|(_, min)| diff < min) {
            best = Some((index, diff));
        }
    }

    Ok(best.map(|(index, _)| index))
}

/// How a stop is shown in the schedule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopStatus {
    Inactive,
    NextStop,
    EnRoute,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleRow {
    pub name: String,
    pub time: String,
    pub status: StopStatus,
}

/// Schedule view for one bus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ScheduleView {
    /// The bus is not active or has no timed stops; only its status is shown.
    NoActiveRoute { status: String },
    Table(Vec<ScheduleRow>),
}

/// A bus has an active route when it is `Active` and at least one stop is timed.
pub fn has_active_route(bus: &BusData) -> bool {
    bus.is_active() && bus.route.iter().any(|stop| stop.time != NO_ARRIVAL)
}

/// Builds the schedule table for `bus` as of `now`.
pub fn schedule_view<T: Timelike>(bus: &BusData, now: &T) -> Result<ScheduleView> {
    if !has_active_route(bus) {
        return Ok(ScheduleView::NoActiveRoute {
            status: bus.status.clone(),
        });
    }

    let next = next_stop_index(route_times(&bus.route), now)?;

    let rows = bus
        .route
        .iter()
        .enumerate()
        .map(|(index, stop)| {
            let status = if stop.time == NO_ARRIVAL {
                StopStatus::Inactive
            } else if Some(index) == next {
                StopStatus::NextStop
            } else {
                StopStatus::EnRoute
            };

            ScheduleRow {
                name: stop.name.clone(),
                time: stop.time.clone(),
                status,
            }
        })
        .collect();

    Ok(ScheduleView::Table(rows))
}

fn route_times(route: &[RouteStop]) -> impl Iterator<Item = &str> {
    route.iter().map(|stop| stop.time.as_str())
}
