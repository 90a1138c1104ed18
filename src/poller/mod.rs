//! Live polling of the transit source.
//!
//! [`DashboardState`] holds the snapshot, selection and banner flags, and
//! [`Poller`] drives it from a fixed-interval refresh loop.

mod controller;
mod state;

pub use controller::{DEFAULT_REFRESH_INTERVAL, Poller, PollerHandle};
pub use state::{DashboardState, LOAD_ERROR_MESSAGE, Phase};
