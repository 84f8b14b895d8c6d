//! Top-level facade crate for zbxbridge.
//!
//! Re-exports the protocol core and the gateway library so users can depend on a single crate.

pub mod core {
    pub use zbxbridge_core::*;
}

pub mod gateway {
    pub use zbxbridge_gateway::*;
}
