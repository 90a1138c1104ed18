//! Fetch, normalize and aggregate one transit payload into a snapshot.
//!
//! Every entry point returns a [`RefreshOutcome`]. Transport failures,
//! non-2xx answers and malformed data all degrade to the canonical empty
//! snapshot for the whole refresh; nothing here returns an error.

use std::fmt;

use anyhow::Result;
use chrono::{Local, NaiveTime, Timelike};
use tracing::{debug, error, info};

use crate::fetch::{HttpClient, fetch_uncached};
use crate::incidents::line_incidents;
use crate::normalize::normalize_line;
use crate::payload::{RawPayload, parse_payload};
use crate::snapshot::TransportationSnapshot;

/// Why a refresh fell back to the empty snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The source answered with a non-2xx status.
    HttpStatus(u16),
    /// The request never produced a response.
    Transport(String),
    /// The body could not be parsed or normalized.
    Malformed(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::HttpStatus(status) => write!(f, "API response failed with status {status}"),
            FallbackReason::Transport(msg) => write!(f, "transport failure: {msg}"),
            FallbackReason::Malformed(msg) => write!(f, "malformed payload: {msg}"),
        }
    }
}

/// Result of one refresh. Always carries a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Fresh(TransportationSnapshot),
    Fallback {
        snapshot: TransportationSnapshot,
        reason: FallbackReason,
    },
}

impl RefreshOutcome {
    pub fn fallback(reason: FallbackReason) -> Self {
        error!(%reason, "Failed to fetch or process transportation data");
        RefreshOutcome::Fallback {
            snapshot: TransportationSnapshot::empty(),
            reason,
        }
    }

    pub fn snapshot(&self) -> &TransportationSnapshot {
        match self {
            RefreshOutcome::Fresh(snapshot) => snapshot,
            RefreshOutcome::Fallback { snapshot, .. } => snapshot,
        }
    }

    pub fn into_snapshot(self) -> TransportationSnapshot {
        match self {
            RefreshOutcome::Fresh(snapshot) => snapshot,
            RefreshOutcome::Fallback { snapshot, .. } => snapshot,
        }
    }

    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        match self {
            RefreshOutcome::Fresh(_) => None,
            RefreshOutcome::Fallback { reason, .. } => Some(reason),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback_reason().is_some()
    }
}

/// Normalizes every line and collects its incidents in the same pass.
pub fn build_snapshot<T: Timelike>(payload: &RawPayload, now: &T) -> Result<TransportationSnapshot> {
    let lines = payload.bus_lines();
    let mut buses = Vec::with_capacity(lines.len());
    let mut all_incidents = Vec::new();

    for (position, line) in lines.iter().enumerate() {
        buses.push(normalize_line(line, position, now)?);
        all_incidents.extend(line_incidents(line));
    }

    Ok(TransportationSnapshot {
        buses,
        summary: payload.summary(),
        all_incidents,
    })
}

/// Runs parse, normalize and aggregate over an already-fetched body.
pub fn snapshot_from_bytes<T: Timelike>(bytes: &[u8], now: &T) -> RefreshOutcome {
    let built = parse_payload(bytes).and_then(|payload| build_snapshot(&payload, now));

    match built {
        Ok(snapshot) => {
            debug!(
                buses = snapshot.buses.len(),
                incidents = snapshot.all_incidents.len(),
                "Snapshot built"
            );
            RefreshOutcome::Fresh(snapshot)
        }
        Err(e) => RefreshOutcome::fallback(FallbackReason::Malformed(format!("{e:#}"))),
    }
}

/// Fetches a fresh payload and builds a snapshot as of the local wall clock.
pub async fn fetch_snapshot<C: HttpClient + ?Sized>(client: &C, url: &str) -> RefreshOutcome {
    refresh(client, url, || Local::now().time()).await
}

/// Like [`fetch_snapshot`] with a fixed reference time of day.
pub async fn fetch_snapshot_at<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
    now: NaiveTime,
) -> RefreshOutcome {
    refresh(client, url, || now).await
}

#[tracing::instrument(skip(client, url, now), fields(source = %url))]
async fn refresh<C, F>(client: &C, url: &str, now: F) -> RefreshOutcome
where
    C: HttpClient + ?Sized,
    F: FnOnce() -> NaiveTime,
{
    let response = match fetch_uncached(client, url).await {
        Ok(response) => response,
        Err(e) => return RefreshOutcome::fallback(FallbackReason::Transport(format!("{e:#}"))),
    };

    if !response.status.is_success() {
        return RefreshOutcome::fallback(FallbackReason::HttpStatus(response.status.as_u16()));
    }

    debug!(bytes = response.body.len(), "Payload received, normalizing");
    let outcome = snapshot_from_bytes(&response.body, &now());
    if let RefreshOutcome::Fresh(snapshot) = &outcome {
        info!(
            buses = snapshot.buses.len(),
            incidents = snapshot.all_incidents.len(),
            "Transportation data refreshed"
        );
    }
    outcome
}
