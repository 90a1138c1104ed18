pub mod fetch;
pub mod incidents;
pub mod normalize;
pub mod output;
pub mod payload;
pub mod pipeline;
pub mod poller;
pub mod schedule;
pub mod snapshot;
pub mod stats;
