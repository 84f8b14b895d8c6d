use std::collections::{HashMap, HashSet};

use zbxbridge_core::error::{BridgeError, Result};

use super::schema::CatalogEntry;
use crate::obs::metrics::BRIDGE_COUNTER_NAMES;
use crate::obs::GaugeVec;

/// Label prepended to every catalog metric.
pub const HOST_LABEL: &str = "host";

/// Resolved catalog entry. Immutable once the registry is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDefinition {
    pub external_key: String,
    pub exposed_name: String,
    pub help: String,
    /// Declared parameter labels, without the leading `host`.
    pub label_names: Vec<String>,
}

impl MetricDefinition {
    /// Number of label values a series of this metric carries (`host` included).
    pub fn arity(&self) -> usize {
        1 + self.label_names.len()
    }
}

/// Catalog definitions plus the live gauge store.
///
/// The maps themselves are never mutated after construction; gauge values are
/// synchronized inside each `GaugeVec`, so the registry can be shared through
/// an `Arc` without a lock.
pub struct MetricRegistry {
    by_key: HashMap<String, MetricDefinition>,
    gauges: HashMap<String, GaugeVec>,
    order: Vec<String>,
}

impl std::fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("metrics", &self.order)
            .finish()
    }
}

impl MetricRegistry {
    /// Parse and validate a catalog document.
    pub fn load(catalog: &[u8], namespace: &str) -> Result<Self> {
        let entries: Vec<CatalogEntry> = serde_json::from_slice(catalog)
            .map_err(|e| BridgeError::Catalog(format!("invalid catalog json: {e}")))?;
        Self::from_entries(entries, namespace)
    }

    pub fn load_from_file(path: &str, namespace: &str) -> Result<Self> {
        let raw = std::fs::read(path)
            .map_err(|e| BridgeError::Catalog(format!("read catalog {path} failed: {e}")))?;
        Self::load(&raw, namespace)
    }

    pub fn from_entries(entries: Vec<CatalogEntry>, namespace: &str) -> Result<Self> {
        let mut by_key = HashMap::with_capacity(entries.len());
        let mut gauges = HashMap::with_capacity(entries.len());
        let mut order = Vec::with_capacity(entries.len());

        for (idx, entry) in entries.into_iter().enumerate() {
            let def = compile_entry(idx, entry, namespace)?;

            if by_key.contains_key(&def.external_key) {
                return Err(BridgeError::Catalog(format!(
                    "duplicate zabbix_key: {}",
                    def.external_key
                )));
            }
            if gauges.contains_key(&def.exposed_name) {
                return Err(BridgeError::Catalog(format!(
                    "duplicate metric name: {} (zabbix_key={})",
                    def.exposed_name, def.external_key
                )));
            }

            let labels = std::iter::once(HOST_LABEL.to_string())
                .chain(def.label_names.iter().cloned())
                .collect();
            gauges.insert(
                def.exposed_name.clone(),
                GaugeVec::new(def.exposed_name.clone(), def.help.clone(), labels),
            );
            order.push(def.exposed_name.clone());
            by_key.insert(def.external_key.clone(), def);
        }

        Ok(Self { by_key, gauges, order })
    }

    /// Resolve a base key. A miss is a normal outcome, not an error.
    pub fn lookup(&self, external_key: &str) -> Option<&MetricDefinition> {
        self.by_key.get(external_key)
    }

    /// Last-write-wins update of one series.
    ///
    /// Returns false, leaving every series untouched, for an unknown metric or
    /// a label tuple of the wrong length.
    pub fn set(&self, exposed_name: &str, label_values: &[String], value: f64) -> bool {
        match self.gauges.get(exposed_name) {
            Some(g) => g.set(label_values, value),
            None => false,
        }
    }

    pub fn get(&self, exposed_name: &str, label_values: &[&str]) -> Option<f64> {
        self.gauges.get(exposed_name)?.get(label_values)
    }

    pub fn series_count(&self, exposed_name: &str) -> usize {
        self.gauges.get(exposed_name).map(GaugeVec::len).unwrap_or(0)
    }

    /// Number of catalog metrics.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Render every catalog gauge, in catalog order.
    pub fn render(&self, out: &mut String) {
        for name in &self.order {
            if let Some(g) = self.gauges.get(name) {
                g.render(out);
            }
        }
    }
}

/// `cpu.load` + `zabbix` => `zabbix_cpu_load`.
pub fn derive_name(namespace: &str, external_key: &str) -> String {
    let base = external_key.replace('.', "_");
    if namespace.is_empty() {
        base
    } else {
        format!("{namespace}_{base}")
    }
}

fn compile_entry(idx: usize, entry: CatalogEntry, namespace: &str) -> Result<MetricDefinition> {
    if entry.zabbix_key.is_empty() {
        return Err(BridgeError::Catalog(format!(
            "entry #{idx}: empty zabbix_key is not supported"
        )));
    }

    let exposed_name = match entry.metric {
        Some(m) if !m.is_empty() => m,
        _ => derive_name(namespace, &entry.zabbix_key),
    };
    if !is_valid_metric_name(&exposed_name) {
        return Err(BridgeError::Catalog(format!(
            "zabbix_key={}: invalid metric name {exposed_name:?}",
            entry.zabbix_key
        )));
    }
    if BRIDGE_COUNTER_NAMES.contains(&exposed_name.as_str()) {
        return Err(BridgeError::Catalog(format!(
            "zabbix_key={}: metric name {exposed_name:?} is reserved for bridge counters",
            entry.zabbix_key
        )));
    }

    let mut seen = HashSet::new();
    for arg in &entry.args {
        if !is_valid_label_name(arg) || arg == HOST_LABEL {
            return Err(BridgeError::Catalog(format!(
                "zabbix_key={}: invalid label name {arg:?}",
                entry.zabbix_key
            )));
        }
        if !seen.insert(arg.as_str()) {
            return Err(BridgeError::Catalog(format!(
                "zabbix_key={}: duplicate label name {arg:?}",
                entry.zabbix_key
            )));
        }
    }

    Ok(MetricDefinition {
        external_key: entry.zabbix_key,
        exposed_name,
        help: entry.help.unwrap_or_default(),
        label_names: entry.args,
    })
}

/// `[a-zA-Z_:][a-zA-Z0-9_:]*`
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// `[a-zA-Z_][a-zA-Z0-9_]*`, excluding the reserved `__` prefix.
pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    !name.starts_with("__") && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
