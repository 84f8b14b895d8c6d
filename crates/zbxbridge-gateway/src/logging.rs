//! `tracing` subscriber setup.
//!
//! `RUST_LOG` wins when set; otherwise `log.level` from the config is used.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use zbxbridge_core::error::{BridgeError, Result};

use crate::config::{LogFormat, LogSection};

pub fn init(log: &LogSection) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(&log.level)
            .map_err(|e| BridgeError::Config(format!("log.level {:?}: {e}", log.level)))?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    match log.format {
        LogFormat::Text => registry.with(fmt::layer()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    }
    .map_err(|e| BridgeError::Config(format!("logging init failed: {e}")))
}
