//! In-process metrics.
//!
//! Gauge vectors for catalog metrics and atomic counters for the bridge itself,
//! rendered in the Prometheus text format by the `/metrics` handler.

pub mod metrics;

pub use metrics::{BridgeMetrics, Counter, CounterVec, GaugeVec};
