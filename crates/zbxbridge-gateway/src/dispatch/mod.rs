//! Dispatch engine exports.
//!
//! Maps decoded trapper items onto catalog gauges and tallies outcomes.

pub mod dispatcher;

pub use dispatcher::{DispatchSummary, Dispatcher, ItemOutcome, SkipReason};
