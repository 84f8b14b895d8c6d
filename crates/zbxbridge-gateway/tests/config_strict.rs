#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use zbxbridge_gateway::config::{self, LogFormat};

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
server:
  listen_port: 10051
  read_timout_ms: 5000 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.kind().as_str(), "CONFIG");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.server.socket_addr().unwrap().to_string(), "0.0.0.0:10051");
    assert_eq!(cfg.metrics.socket_addr().unwrap().to_string(), "0.0.0.0:2112");
    assert_eq!(cfg.server.read_timeout_ms, 30_000);
    assert_eq!(cfg.log.format, LogFormat::Text);
}

#[test]
fn full_config() {
    let ok = r#"
version: 1
server:
  listen_address: "127.0.0.1"
  listen_port: 20051
  read_timeout_ms: 5000
  max_payload_bytes: 65536
  allowed_clients: ["10.0.0.0/8", "192.168.1.7"]
metrics:
  listen_address: "::"
  listen_port: 9112
  file: "/etc/zbxbridge/metrics.json"
  namespace: "zbx"
log:
  level: "info,zbxbridge_gateway=debug"
  format: json
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.server.max_payload_bytes, 65536);
    assert_eq!(cfg.metrics.namespace, "zbx");
    assert_eq!(cfg.log.format, LogFormat::Json);
    assert!(cfg.server.allowlist().unwrap().is_allowed("10.1.1.1".parse().unwrap()));
}

#[test]
fn wrong_version_rejected() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert_eq!(err.kind().as_str(), "CONFIG");
}

#[test]
fn out_of_range_values_rejected() {
    for bad in [
        "version: 1\nserver: { read_timeout_ms: 10 }\n",
        "version: 1\nserver: { max_payload_bytes: 12 }\n",
        "version: 1\nserver: { listen_address: \"localhost\" }\n",
        "version: 1\nserver: { allowed_clients: [\"10.0.0.0/40\"] }\n",
        "version: 1\nmetrics: { namespace: \"zbx-bridge\" }\n",
        "version: 1\nlog: { format: xml }\n",
        "version: 1\nserver: { listen_port: 2112 }\n",
    ] {
        let err = config::load_from_str(bad).expect_err(bad);
        assert_eq!(err.kind().as_str(), "CONFIG", "{bad}");
    }
}

#[test]
fn shipped_examples_are_valid() {
    let cfg = config::load_from_file("../../deploy/zbxbridge.example.yaml").expect("example config");
    assert_eq!(cfg.server.allowed_clients.len(), 2);

    let reg = zbxbridge_gateway::catalog::MetricRegistry::load_from_file(
        "../../deploy/metrics.example.json",
        &cfg.metrics.namespace,
    )
    .expect("example catalog");
    assert_eq!(reg.lookup("system.cpu.load").unwrap().exposed_name, "zabbix_system_cpu_load");
}
