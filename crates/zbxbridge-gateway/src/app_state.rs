//! Shared application state.
//!
//! Built once at startup and cloned into the accept loop, every connection
//! task and the scrape handler. Startup errors are returned, not panicked.

use std::sync::Arc;

use zbxbridge_core::error::Result;

use crate::catalog::MetricRegistry;
use crate::config::BridgeConfig;
use crate::dispatch::Dispatcher;
use crate::obs::BridgeMetrics;
use crate::policy::ClientAllowlist;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    registry: Arc<MetricRegistry>,
    metrics: Arc<BridgeMetrics>,
    dispatcher: Arc<Dispatcher>,
}

struct AppStateInner {
    cfg: BridgeConfig,
    allowlist: ClientAllowlist,
}

impl AppState {
    /// Load the catalog named in `cfg` and wire the components.
    pub fn from_config(cfg: BridgeConfig) -> Result<Self> {
        let registry = MetricRegistry::load_from_file(&cfg.metrics.file, &cfg.metrics.namespace)?;
        if registry.is_empty() {
            tracing::warn!(file = %cfg.metrics.file, "metric catalog is empty; every item will be skipped");
        }
        Self::new(cfg, registry)
    }

    pub fn new(cfg: BridgeConfig, registry: MetricRegistry) -> Result<Self> {
        let allowlist = cfg.server.allowlist()?;

        let registry = Arc::new(registry);
        let metrics = Arc::new(BridgeMetrics::default());
        let dispatcher = Dispatcher::new(Arc::clone(&registry), Arc::clone(&metrics));

        Ok(Self {
            inner: Arc::new(AppStateInner { cfg, allowlist }),
            registry,
            metrics,
            dispatcher: Arc::new(dispatcher),
        })
    }

    pub fn cfg(&self) -> &BridgeConfig {
        &self.inner.cfg
    }

    pub fn allowlist(&self) -> &ClientAllowlist {
        &self.inner.allowlist
    }

    pub fn registry(&self) -> Arc<MetricRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn metrics(&self) -> Arc<BridgeMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Full scrape body: catalog gauges, then the bridge's own counters.
    pub fn render_metrics(&self) -> String {
        let mut out = String::new();
        self.registry.render(&mut out);
        self.metrics.render(&mut out);
        out
    }
}
