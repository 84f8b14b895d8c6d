//! Transport layer (Zabbix trapper over TCP).
//!
//! Exposes the accept loop / connection handler and the envelope I/O helpers
//! it is built on.

pub mod codec;
pub mod trapper;

pub use trapper::{handle_connection, serve, ConnOutcome, Stage};
