use std::sync::Arc;

use zbxbridge_core::protocol::item::DataPoint;

use crate::catalog::MetricRegistry;
use crate::obs::BridgeMetrics;

/// Why an item was not applied. Checks run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Base key is not in the catalog.
    UnknownKey,
    /// Value is not numeric.
    InvalidValue,
    /// Parameter count differs from the declared labels.
    Cardinality,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::UnknownKey => "unknown_key",
            SkipReason::InvalidValue => "invalid_value",
            SkipReason::Cardinality => "cardinality",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ItemOutcome {
    Applied(f64),
    Skipped(SkipReason),
}

/// Per-request tally. `processed + skipped == total` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub total: usize,
    pub processed: usize,
    pub skipped: usize,
}

impl DispatchSummary {
    /// What the sender sees as `failed`.
    pub fn failed(&self) -> usize {
        self.total - self.processed
    }
}

/// Applies decoded data points to the catalog gauges.
pub struct Dispatcher {
    registry: Arc<MetricRegistry>,
    metrics: Arc<BridgeMetrics>,
}

impl Dispatcher {
    pub fn new(registry: Arc<MetricRegistry>, metrics: Arc<BridgeMetrics>) -> Self {
        Self { registry, metrics }
    }

    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    /// Apply every point in arrival order.
    pub fn dispatch(&self, points: &[DataPoint]) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        for point in points {
            summary.total += 1;
            match self.apply(point) {
                ItemOutcome::Applied(_) => summary.processed += 1,
                ItemOutcome::Skipped(_) => summary.skipped += 1,
            }
        }
        summary
    }

    /// Apply a single point: lookup, coerce, cardinality, set.
    pub fn apply(&self, point: &DataPoint) -> ItemOutcome {
        let key = &point.key;

        let Some(def) = self.registry.lookup(key.base()) else {
            tracing::warn!(host = %point.host, key = %key.as_str(), "skipping unknown metric");
            return self.skip(SkipReason::UnknownKey);
        };

        let value = match point.value.coerce() {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(host = %point.host, key = %key.as_str(), error = %e, "skipping metric");
                return self.skip(SkipReason::InvalidValue);
            }
        };

        let mut labels = Vec::with_capacity(1 + key.args().len());
        labels.push(point.host.clone());
        labels.extend(key.args().iter().cloned());
        if labels.len() != def.arity() {
            tracing::warn!(
                host = %point.host,
                key = %key.as_str(),
                expected = def.arity() - 1,
                got = key.args().len(),
                "skipping metric (invalid arg cardinality)"
            );
            return self.skip(SkipReason::Cardinality);
        }

        if !self.registry.set(&def.exposed_name, &labels, value) {
            // registry and definition disagree; only possible with a broken catalog build
            tracing::error!(metric = %def.exposed_name, key = %key.as_str(), "gauge rejected update");
            return self.skip(SkipReason::Cardinality);
        }

        self.metrics.items_processed.inc();
        tracing::debug!(
            host = %point.host,
            metric = %def.exposed_name,
            key = %def.external_key,
            args = ?key.args(),
            value,
            "applied"
        );
        ItemOutcome::Applied(value)
    }

    fn skip(&self, reason: SkipReason) -> ItemOutcome {
        self.metrics.items_skipped.inc(&[("reason", reason.as_str())]);
        ItemOutcome::Skipped(reason)
    }
}
