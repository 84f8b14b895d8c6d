//! Connection admission policy.
//!
//! Compiles the configured client allow-list into a lookup structure the
//! accept loop consults before reading any bytes.

pub mod allowlist;

pub use allowlist::ClientAllowlist;
