//! zbxbridge gateway library entry.
//!
//! Wires the metric catalog, dispatcher, trapper transport and scrape endpoint
//! into one service. Consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod logging;
pub mod obs;
pub mod ops;
pub mod policy;
pub mod router;
pub mod transport;
