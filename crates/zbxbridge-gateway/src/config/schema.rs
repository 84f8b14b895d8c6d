use std::net::{IpAddr, SocketAddr};

use serde::Deserialize;
use zbxbridge_core::error::{BridgeError, Result};

use crate::catalog::registry::is_valid_metric_name;
use crate::policy::ClientAllowlist;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub metrics: MetricsSection,

    #[serde(default)]
    pub log: LogSection,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            metrics: MetricsSection::default(),
            log: LogSection::default(),
        }
    }
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(BridgeError::Config(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        self.server.validate()?;
        self.metrics.validate()?;
        self.log.validate()?;

        let trapper = self.server.socket_addr()?;
        let scrape = self.metrics.socket_addr()?;
        if trapper.port() != 0 && trapper == scrape {
            return Err(BridgeError::Config(format!(
                "server and metrics listeners must differ (both {trapper})"
            )));
        }
        Ok(())
    }
}

/// Trapper (sender-facing) listener.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    #[serde(default = "default_server_port")]
    pub listen_port: u16,

    /// Bound on reading one request (header and body together).
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,

    /// IPs or CIDR blocks; empty allows everyone.
    #[serde(default)]
    pub allowed_clients: Vec<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            listen_port: default_server_port(),
            read_timeout_ms: default_read_timeout_ms(),
            max_payload_bytes: default_max_payload_bytes(),
            allowed_clients: Vec::new(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;
        if !(100..=600_000).contains(&self.read_timeout_ms) {
            return Err(BridgeError::Config(
                "server.read_timeout_ms must be between 100 and 600000".into(),
            ));
        }
        if !(1024..=(1 << 30)).contains(&self.max_payload_bytes) {
            return Err(BridgeError::Config(
                "server.max_payload_bytes must be between 1024 and 1073741824".into(),
            ));
        }
        self.allowlist()?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        socket_addr("server", &self.listen_address, self.listen_port)
    }

    pub fn allowlist(&self) -> Result<ClientAllowlist> {
        ClientAllowlist::compile(&self.allowed_clients)
    }
}

/// Scrape listener and catalog.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    #[serde(default = "default_metrics_port")]
    pub listen_port: u16,

    /// Catalog file path.
    #[serde(default = "default_catalog_file")]
    pub file: String,

    /// Prefix for derived metric names.
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            listen_port: default_metrics_port(),
            file: default_catalog_file(),
            namespace: default_namespace(),
        }
    }
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;
        if self.file.is_empty() {
            return Err(BridgeError::Config("metrics.file must not be empty".into()));
        }
        if !self.namespace.is_empty() && !is_valid_metric_name(&self.namespace) {
            return Err(BridgeError::Config(format!(
                "metrics.namespace is not a valid metric name prefix: {:?}",
                self.namespace
            )));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        socket_addr("metrics", &self.listen_address, self.listen_port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogSection {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl LogSection {
    pub fn validate(&self) -> Result<()> {
        tracing_subscriber::EnvFilter::try_new(&self.level)
            .map_err(|e| BridgeError::Config(format!("log.level {:?}: {e}", self.level)))?;
        Ok(())
    }
}

fn socket_addr(section: &str, address: &str, port: u16) -> Result<SocketAddr> {
    let ip: IpAddr = address.parse().map_err(|_| {
        BridgeError::Config(format!("{section}.listen_address is not an IP address: {address}"))
    })?;
    Ok(SocketAddr::new(ip, port))
}

fn default_listen_address() -> String {
    "0.0.0.0".into()
}
fn default_server_port() -> u16 {
    10051
}
fn default_metrics_port() -> u16 {
    2112
}
fn default_read_timeout_ms() -> u64 {
    30_000
}
fn default_max_payload_bytes() -> usize {
    16 << 20
}
fn default_catalog_file() -> String {
    "metrics.json".into()
}
fn default_namespace() -> String {
    "zabbix".into()
}
fn default_log_level() -> String {
    "info".into()
}
