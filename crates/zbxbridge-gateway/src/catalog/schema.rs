use serde::Deserialize;

/// One entry of the metric catalog file (a JSON array of these).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogEntry {
    /// Zabbix item key without parameters, e.g. `net.if.in`.
    pub zabbix_key: String,

    /// Exposed metric name. Derived from `zabbix_key` when absent or empty.
    #[serde(default)]
    pub metric: Option<String>,

    #[serde(default)]
    pub help: Option<String>,

    /// Label names for the key parameters, in parameter order.
    #[serde(default)]
    pub args: Vec<String>,
}
