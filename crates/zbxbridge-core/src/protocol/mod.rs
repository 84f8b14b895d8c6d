//! Zabbix trapper protocol.
//!
//! - `frame`: the binary `ZBXD` envelope (magic, version, u64 LE length).
//! - `item`: the JSON sender request carried inside the envelope.
//!
//! All parsers are panic-free: malformed input is reported as `BridgeError`
//! instead of panicking or indexing raw buffers.

pub mod frame;
pub mod item;
