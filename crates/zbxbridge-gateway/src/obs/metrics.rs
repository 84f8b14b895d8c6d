//! Metric primitives and the bridge's own process counters.
//!
//! Counters are atomics; labeled vectors are backed by `DashMap` so that
//! connection tasks can write while the scrape handler renders. Gauge values
//! are stored as `f64` bit patterns in `AtomicU64` cells.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// Escape a label value for the text exposition format.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

/// Escape a HELP text (quotes are left alone there).
fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Format a sample value the way Prometheus parses it.
pub(crate) fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        if v > 0.0 {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else {
        v.to_string()
    }
}

fn write_header(out: &mut String, name: &str, help: &str, ty: &str) {
    if !help.is_empty() {
        let _ = writeln!(out, "# HELP {} {}", name, escape_help(help));
    }
    let _ = writeln!(out, "# TYPE {} {}", name, ty);
}

fn write_sample<'a>(
    out: &mut String,
    name: &str,
    labels: impl Iterator<Item = (&'a str, &'a str)>,
    value: &str,
) {
    let label_str = labels
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",");
    if label_str.is_empty() {
        let _ = writeln!(out, "{} {}", name, value);
    } else {
        let _ = writeln!(out, "{}{{{}}} {}", name, label_str, value);
    }
}

/// Unlabeled monotonic counter.
#[derive(Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    fn render(&self, name: &str, help: &str, out: &mut String) {
        write_header(out, name, help, "counter");
        write_sample(out, name, std::iter::empty(), &self.get().to_string());
    }
}

/// Counter keyed by a sorted label set.
#[derive(Default)]
pub struct CounterVec {
    map: DashMap<Vec<(String, String)>, AtomicU64>,
}

impl CounterVec {
    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    /// Increment by an arbitrary value.
    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        let key = Self::key(labels);
        let counter = self.map.entry(key).or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    /// Current value of one series (0 if never incremented).
    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&Self::key(labels))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Sum over every series.
    pub fn sum(&self) -> u64 {
        self.map.iter().map(|r| r.value().load(Ordering::Relaxed)).sum()
    }

    fn key(labels: &[(&str, &str)]) -> Vec<(String, String)> {
        let mut key: Vec<(String, String)> = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        key.sort();
        key
    }

    fn render(&self, name: &str, help: &str, out: &mut String) {
        write_header(out, name, help, "counter");
        let mut rows: Vec<(Vec<(String, String)>, u64)> = self
            .map
            .iter()
            .map(|r| (r.key().clone(), r.value().load(Ordering::Relaxed)))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        for (key, val) in rows {
            let labels = key.iter().map(|(k, v)| (k.as_str(), v.as_str()));
            write_sample(out, name, labels, &val.to_string());
        }
    }
}

/// Gauge vector with a fixed, ordered label schema.
///
/// Series are created on first `set` and overwritten afterwards; they are
/// never removed.
pub struct GaugeVec {
    name: String,
    help: String,
    label_names: Vec<String>,
    series: DashMap<Vec<String>, AtomicU64>,
}

impl GaugeVec {
    pub fn new(name: impl Into<String>, help: impl Into<String>, label_names: Vec<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            label_names,
            series: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// Set one series. Returns false (and changes nothing) when the number of
    /// values does not match the label schema.
    pub fn set(&self, values: &[String], v: f64) -> bool {
        if values.len() != self.label_names.len() {
            return false;
        }
        let bits = v.to_bits();
        if let Some(cell) = self.series.get(values) {
            cell.store(bits, Ordering::Relaxed);
            return true;
        }
        self.series
            .entry(values.to_vec())
            .or_insert_with(|| AtomicU64::new(bits))
            .store(bits, Ordering::Relaxed);
        true
    }

    pub fn get(&self, values: &[&str]) -> Option<f64> {
        let key: Vec<String> = values.iter().map(|s| s.to_string()).collect();
        self.series
            .get(&key)
            .map(|cell| f64::from_bits(cell.load(Ordering::Relaxed)))
    }

    /// Number of live series.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Render in Prometheus text exposition format, series sorted by label values.
    pub fn render(&self, out: &mut String) {
        write_header(out, &self.name, &self.help, "gauge");
        let mut rows: Vec<(Vec<String>, f64)> = self
            .series
            .iter()
            .map(|r| (r.key().clone(), f64::from_bits(r.value().load(Ordering::Relaxed))))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        for (values, v) in rows {
            let labels = self
                .label_names
                .iter()
                .map(String::as_str)
                .zip(values.iter().map(String::as_str));
            write_sample(out, &self.name, labels, &format_value(v));
        }
    }
}

pub const REQUESTS_PROCESSED: &str = "zbxbridge_requests_processed_total";
pub const REQUESTS_INVALID: &str = "zbxbridge_requests_invalid_total";
pub const ITEMS_PROCESSED: &str = "zbxbridge_items_processed_total";
pub const ITEMS_SKIPPED: &str = "zbxbridge_items_skipped_total";
pub const CONNECTIONS_REJECTED: &str = "zbxbridge_connections_rejected_total";

/// Families rendered by [`BridgeMetrics`]; catalog metrics may not reuse them.
pub const BRIDGE_COUNTER_NAMES: [&str; 5] = [
    REQUESTS_PROCESSED,
    REQUESTS_INVALID,
    ITEMS_PROCESSED,
    ITEMS_SKIPPED,
    CONNECTIONS_REJECTED,
];

/// Values of the `reason` label on `zbxbridge_items_skipped_total`.
pub const SKIP_REASONS: [&str; 3] = ["unknown_key", "invalid_value", "cardinality"];

/// Process-wide outcome counters of the trapper listener.
pub struct BridgeMetrics {
    pub requests_processed: Counter,
    pub requests_invalid: Counter,
    pub items_processed: Counter,
    pub items_skipped: CounterVec, // by reason
    pub connections_rejected: Counter,
}

impl Default for BridgeMetrics {
    fn default() -> Self {
        let items_skipped = CounterVec::default();
        for reason in SKIP_REASONS {
            items_skipped.add(&[("reason", reason)], 0);
        }
        Self {
            requests_processed: Counter::default(),
            requests_invalid: Counter::default(),
            items_processed: Counter::default(),
            items_skipped,
            connections_rejected: Counter::default(),
        }
    }
}

impl BridgeMetrics {
    pub fn items_skipped_total(&self) -> u64 {
        self.items_skipped.sum()
    }

    /// Append the bridge's own counters to a scrape body.
    pub fn render(&self, out: &mut String) {
        self.requests_processed.render(
            REQUESTS_PROCESSED,
            "Sender requests that reached dispatch and got a response",
            out,
        );
        self.requests_invalid.render(
            REQUESTS_INVALID,
            "Sender requests aborted on framing or decode errors",
            out,
        );
        self.items_processed
            .render(ITEMS_PROCESSED, "Trapper items applied to a gauge", out);
        self.items_skipped
            .render(ITEMS_SKIPPED, "Trapper items skipped, by reason", out);
        self.connections_rejected.render(
            CONNECTIONS_REJECTED,
            "Connections refused by the client allow-list",
            out,
        );
    }
}
