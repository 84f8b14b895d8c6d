use clap::Parser;
use zbxbridge_core::error::Result;

use super::schema::{BridgeConfig, LogFormat};

/// Zabbix trapper to Prometheus bridge.
///
/// Every flag falls back to its `ZI_*` environment variable, then to the YAML
/// file given with `--config`, then to the built-in default.
#[derive(Debug, Default, Parser)]
#[command(name = "zbxbridge-gateway", version)]
pub struct Cli {
    /// Optional YAML config file
    #[arg(long, env = "ZI_CONFIG")]
    pub config: Option<String>,

    /// IP for the trapper server to listen on [default: 0.0.0.0]
    #[arg(long = "server.listen-address", env = "ZI_SERVER_LISTEN_ADDRESS")]
    pub server_listen_address: Option<String>,

    /// Port for the trapper server to listen on [default: 10051]
    #[arg(long = "server.listen-port", env = "ZI_SERVER_LISTEN_PORT")]
    pub server_listen_port: Option<u16>,

    /// Comma separated IPs / CIDR blocks allowed to push [default: all]
    #[arg(long = "server.allowed-clients", env = "ZI_SERVER_ALLOWED_CLIENTS", value_delimiter = ',')]
    pub server_allowed_clients: Option<Vec<String>>,

    /// IP for the metrics endpoint to listen on [default: 0.0.0.0]
    #[arg(long = "metrics.listen-address", env = "ZI_METRICS_LISTEN_ADDRESS")]
    pub metrics_listen_address: Option<String>,

    /// Port for the metrics endpoint to listen on [default: 2112]
    #[arg(long = "metrics.listen-port", env = "ZI_METRICS_LISTEN_PORT")]
    pub metrics_listen_port: Option<u16>,

    /// Metric catalog file [default: metrics.json]
    #[arg(long = "metrics.file", env = "ZI_METRICS_FILE")]
    pub metrics_file: Option<String>,

    /// Prefix for derived metric names [default: zabbix]
    #[arg(long = "metrics.namespace", env = "ZI_METRICS_NAMESPACE")]
    pub metrics_namespace: Option<String>,

    /// Log filter directive [default: info]
    #[arg(long = "log.level", env = "ZI_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log output format [default: text]
    #[arg(long = "log.format", env = "ZI_LOG_FORMAT", value_enum)]
    pub log_format: Option<LogFormat>,
}

impl Cli {
    /// Resolve the effective configuration and validate it.
    pub fn load_config(&self) -> Result<BridgeConfig> {
        let mut cfg = match &self.config {
            Some(path) => super::parse_file(path)?,
            None => BridgeConfig::default(),
        };
        self.apply(&mut cfg);
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply(&self, cfg: &mut BridgeConfig) {
        if let Some(v) = &self.server_listen_address {
            cfg.server.listen_address = v.clone();
        }
        if let Some(v) = self.server_listen_port {
            cfg.server.listen_port = v;
        }
        if let Some(v) = &self.server_allowed_clients {
            cfg.server.allowed_clients = v.iter().filter(|s| !s.trim().is_empty()).cloned().collect();
        }
        if let Some(v) = &self.metrics_listen_address {
            cfg.metrics.listen_address = v.clone();
        }
        if let Some(v) = self.metrics_listen_port {
            cfg.metrics.listen_port = v;
        }
        if let Some(v) = &self.metrics_file {
            cfg.metrics.file = v.clone();
        }
        if let Some(v) = &self.metrics_namespace {
            cfg.metrics.namespace = v.clone();
        }
        if let Some(v) = &self.log_level {
            cfg.log.level = v.clone();
        }
        if let Some(v) = self.log_format {
            cfg.log.format = v;
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn defaults_without_flags() {
        let cfg = Cli::default().load_config().unwrap();
        assert_eq!(cfg.server.listen_port, 10051);
        assert_eq!(cfg.metrics.listen_port, 2112);
        assert_eq!(cfg.metrics.file, "metrics.json");
        assert_eq!(cfg.metrics.namespace, "zabbix");
        assert!(cfg.server.allowed_clients.is_empty());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli {
            server_listen_port: Some(20051),
            metrics_file: Some("/etc/zbxbridge/catalog.json".into()),
            server_allowed_clients: Some(vec!["10.0.0.0/8".into(), " ".into(), "127.0.0.1".into()]),
            log_format: Some(LogFormat::Json),
            ..Cli::default()
        };
        let cfg = cli.load_config().unwrap();
        assert_eq!(cfg.server.listen_port, 20051);
        assert_eq!(cfg.metrics.file, "/etc/zbxbridge/catalog.json");
        assert_eq!(cfg.server.allowed_clients, ["10.0.0.0/8", "127.0.0.1"]);
        assert_eq!(cfg.log.format, LogFormat::Json);
        assert_eq!(cfg.metrics.listen_port, 2112);
    }

    // command-line values win over any ZI_* variable, so only flagged fields are checked
    #[test]
    fn flag_names_parse() {
        let cli = Cli::try_parse_from([
            "zbxbridge-gateway",
            "--server.listen-port",
            "20051",
            "--server.allowed-clients",
            "10.0.0.0/8,127.0.0.1",
            "--log.format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.server_listen_port, Some(20051));
        assert_eq!(
            cli.server_allowed_clients.as_deref(),
            Some(&["10.0.0.0/8".to_string(), "127.0.0.1".to_string()][..])
        );
        assert_eq!(cli.log_format, Some(LogFormat::Json));
    }

    #[test]
    fn bad_override_fails_validation() {
        let cli = Cli {
            server_listen_address: Some("not-an-ip".into()),
            ..Cli::default()
        };
        assert_eq!(cli.load_config().unwrap_err().kind().as_str(), "CONFIG");
    }
}
