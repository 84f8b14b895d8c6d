//! zbxbridge core: transport-agnostic protocol primitives and the error type.
//!
//! This crate defines the Zabbix trapper wire envelope, the sender request
//! decoder and the shared error surface used by the gateway. It carries no
//! transport or runtime dependencies so it can be reused by tooling and tests.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Every malformed
//! frame or payload surfaces as a `BridgeError`, so a hostile sender can only
//! ever abort its own connection.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{BridgeError, ErrorKind, Result};
