use std::sync::Arc;

use anyhow::{Context, Result};
use gateguard_filters::{load_rules_file, ContentFilter, RiskScorer};
use gateguard_interceptors::audit::{StoreAuditSink, TracingAuditSink};
use gateguard_interceptors::metrics::ChainMetrics;
use gateguard_interceptors::{ChainBuilder, InterceptorChain};
use gateguard_store::StoreHandle;
use gateguard_types::{ClockHandle, SystemClock};
use tracing::{info, warn};

use crate::config::GuardConfig;

/// Everything one process needs to answer hook calls.
pub struct GuardService {
    config: GuardConfig,
    store: StoreHandle,
    filter: Arc<ContentFilter>,
    scorer: RiskScorer,
    chain: InterceptorChain,
}

impl GuardService {
    pub async fn connect(config: GuardConfig) -> Result<Self> {
        let store = gateguard_store::connect(&config.store_config())
            .await
            .context("Failed to connect to the shared store")?;
        Self::with_store(config, store, Arc::new(SystemClock))
    }

    pub fn with_store(config: GuardConfig, store: StoreHandle, clock: ClockHandle) -> Result<Self> {
        let filter = Arc::new(load_filter(&config)?);
        let scorer = RiskScorer::from_filter(&filter);
        let metrics = ChainMetrics::default();

        let mut builder = ChainBuilder::new(store.clone(), clock, filter.clone())
            .limits(config.limit_settings())
            .filters(config.filter_settings())
            .metrics(metrics)
            .downstream_timeout(config.downstream_timeout())
            .sink(Arc::new(TracingAuditSink));
        if config.audit.max_entries > 0 {
            builder = builder.sink(Arc::new(StoreAuditSink::new(
                store.clone(),
                config.audit.max_entries,
            )));
        }

        Ok(Self {
            config,
            store,
            filter,
            scorer,
            chain: builder.build(),
        })
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn chain(&self) -> &InterceptorChain {
        &self.chain
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn filter(&self) -> &ContentFilter {
        &self.filter
    }

    pub fn scorer(&self) -> &RiskScorer {
        &self.scorer
    }

    pub async fn healthy(&self) -> bool {
        match self.store.ping().await {
            Ok(()) => true,
            Err(err) => {
                warn!(target: "rate-limiter", op = err.op(), "store health check failed");
                false
            }
        }
    }
}

/// Built-in rule tables plus the optional rules file. A bad rule is fatal.
pub fn load_filter(config: &GuardConfig) -> Result<ContentFilter> {
    let filter = ContentFilter::builtin()
        .context("Built-in filter rules failed to compile")?;
    let Some(path) = config.filters.rules_path.as_ref() else {
        return Ok(filter);
    };
    let extra = load_rules_file(path)
        .with_context(|| format!("Failed to load filter rules from {}", path.display()))?;
    info!(path = %path.display(), rules = extra.len(), "Loaded custom filter rules");
    Ok(filter.with_rules(extra))
}
