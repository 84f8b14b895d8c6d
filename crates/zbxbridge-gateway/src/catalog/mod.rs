//! Metric catalog: which Zabbix keys are exported, under what name and labels.
//!
//! Loaded once at startup; any invalid entry is fatal so the bridge never
//! serves with a half-applied catalog.

pub mod registry;
pub mod schema;

pub use registry::{derive_name, MetricDefinition, MetricRegistry, HOST_LABEL};
pub use schema::CatalogEntry;
