//! Bridge config loader (strict parsing).
//!
//! Precedence: built-in defaults < YAML file < command line / `ZI_*` env.

pub mod cli;
pub mod schema;

use std::fs;

use zbxbridge_core::error::{BridgeError, Result};

pub use cli::Cli;
pub use schema::{BridgeConfig, LogFormat, LogSection, MetricsSection, ServerSection};

pub fn load_from_file(path: &str) -> Result<BridgeConfig> {
    let cfg = parse_file(path)?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn load_from_str(s: &str) -> Result<BridgeConfig> {
    let cfg = parse_str(s)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Parse without validating, for callers that apply overrides first.
pub fn parse_file(path: &str) -> Result<BridgeConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| BridgeError::Config(format!("read config {path} failed: {e}")))?;
    parse_str(&s)
}

pub fn parse_str(s: &str) -> Result<BridgeConfig> {
    serde_yaml::from_str(s).map_err(|e| BridgeError::Config(format!("invalid yaml: {e}")))
}
