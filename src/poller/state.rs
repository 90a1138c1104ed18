//! Dashboard state shown to the presentation layer and its transitions.

use anyhow::{Result, bail};
use tracing::{debug, info, warn};

use crate::pipeline::{FallbackReason, RefreshOutcome};
use crate::snapshot::{BusData, TransportationSnapshot};

/// Banner text shown when a refresh failed outside the pipeline's own fallback.
pub const LOAD_ERROR_MESSAGE: &str = "Failed to load data. Please check network connection.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No refresh has completed yet.
    Loading,
    /// A snapshot (possibly empty) is available.
    Ready,
}

/// Everything the dashboard renders.
///
/// `error` is a banner layered over `snapshot`; the snapshot slot is always
/// populated once `phase` is [`Phase::Ready`].
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardState {
    pub phase: Phase,
    pub snapshot: TransportationSnapshot,
    pub error: Option<String>,
    pub last_fallback: Option<FallbackReason>,
    pub selected_bus_id: Option<String>,
    pub refresh_count: u64,
    applied_generation: Option<u64>,
    initial_selection_done: bool,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Loading,
            snapshot: TransportationSnapshot::empty(),
            error: None,
            last_fallback: None,
            selected_bus_id: None,
            refresh_count: 0,
            applied_generation: None,
            initial_selection_done: false,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    pub fn selected_bus(&self) -> Option<&BusData> {
        self.selected_bus_id
            .as_deref()
            .and_then(|id| self.snapshot.find_bus(id))
    }

    /// Applies the completion of refresh `generation`.
    ///
    /// Completions older than the last applied one are dropped and `false` is
    /// returned. A failed refresh raises the error banner and resets the
    /// snapshot to empty.
    pub fn apply(&mut self, generation: u64, result: Result<RefreshOutcome>) -> bool {
        if self.applied_generation.is_some_and(|applied| generation <= applied) {
            debug!(generation, applied = ?self.applied_generation, "Discarding stale refresh");
            return false;
        }
        self.applied_generation = Some(generation);
        self.refresh_count += 1;
        self.phase = Phase::Ready;

        match result {
            Ok(outcome) => {
                self.error = None;
                self.last_fallback = outcome.fallback_reason().cloned();
                self.snapshot = outcome.into_snapshot();
            }
            Err(e) => {
                warn!(error = %e, generation, "Error fetching transportation data");
                self.error = Some(LOAD_ERROR_MESSAGE.to_string());
                self.last_fallback = None;
                self.snapshot = TransportationSnapshot::empty();
            }
        }

        self.reconcile_selection();
        true
    }

    /// Selects the bus with display id `bus_id`.
    ///
    /// # Errors
    ///
    /// Fails if the bus is not in the current snapshot or is in maintenance.
    pub fn select(&mut self, bus_id: &str) -> Result<()> {
        let Some(bus) = self.snapshot.find_bus(bus_id) else {
            bail!("bus {bus_id:?} is not in the current snapshot");
        };
        if bus.is_in_maintenance() {
            bail!("bus {bus_id:?} is in maintenance and cannot be selected");
        }

        self.selected_bus_id = Some(bus_id.to_string());
        self.initial_selection_done = true;
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected_bus_id = None;
    }

    fn reconcile_selection(&mut self) {
        if let Some(id) = &self.selected_bus_id {
            if self.snapshot.find_bus(id).is_none() {
                info!(bus_id = %id, "Selected bus left the snapshot, clearing selection");
                self.selected_bus_id = None;
            }
            return;
        }

        if self.initial_selection_done {
            return;
        }

        let buses = &self.snapshot.buses;
        let first = buses.iter().find(|bus| bus.is_active()).or(buses.first());
        if let Some(bus) = first {
            debug!(bus_id = %bus.id, "Initial bus selection");
            self.selected_bus_id = Some(bus.id.clone());
            self.initial_selection_done = true;
        }
    }
}
