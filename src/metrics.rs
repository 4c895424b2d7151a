use std::sync::Mutex;

use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use gateguard_interceptors::metrics::ChainMetricsSnapshot;
use prometheus::{core::Collector, opts, Encoder, IntCounterVec, IntGauge, Registry, TextEncoder};
use tracing::error;

/// Prometheus view over the chain counters. The chain keeps plain atomics;
/// this mirrors them into the registry at scrape time.
pub struct GuardMetrics {
    registry: Registry,
    events: IntCounterVec,
    store_up: IntGauge,
    sync_lock: Mutex<()>,
}

impl GuardMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();
        let events = IntCounterVec::new(
            opts!(
                "gateguard_chain_events_total",
                "Interceptor chain outcomes grouped by event"
            ),
            &["event"],
        )?;
        let store_up = IntGauge::new(
            "gateguard_store_up",
            "Whether the last store health check succeeded",
        )?;
        register(&registry, events.clone());
        register(&registry, store_up.clone());
        Ok(Self {
            registry,
            events,
            store_up,
            sync_lock: Mutex::new(()),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn set_store_up(&self, up: bool) {
        self.store_up.set(i64::from(up));
    }

    pub fn sync(&self, snapshot: &ChainMetricsSnapshot) {
        let _guard = self
            .sync_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for (event, total) in [
            ("request", snapshot.requests),
            ("allowed", snapshot.allowed),
            ("blocked", snapshot.blocked),
            ("rate_limited", snapshot.rate_limited),
            ("content_blocked", snapshot.content_blocked),
            ("store_degraded", snapshot.store_degraded),
            ("downstream_failure", snapshot.downstream_failures),
            ("audit_failure", snapshot.audit_failures),
        ] {
            let counter = self.events.with_label_values(&[event]);
            let delta = total.saturating_sub(counter.get());
            if delta > 0 {
                counter.inc_by(delta);
            }
        }
    }

    pub fn render(&self) -> Response {
        encode(&self.registry)
    }
}

fn register<C>(registry: &Registry, collector: C)
where
    C: Collector + Clone + Send + Sync + 'static,
{
    if let Err(err) = registry.register(Box::new(collector.clone())) {
        if !matches!(err, prometheus::Error::AlreadyReg) {
            error!(?err, "failed to register gateguard metric");
        }
    }
}

fn encode(registry: &Registry) -> Response {
    let encoder = TextEncoder::new();
    let format_type = encoder.format_type().to_string();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&registry.gather(), &mut buffer) {
        error!(?err, "failed to encode prometheus metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, "metric encode error").into_response();
    }

    match (String::from_utf8(buffer), HeaderValue::from_str(&format_type)) {
        (Ok(body), Ok(value)) => ([(CONTENT_TYPE, value)], body).into_response(),
        (Err(err), _) => {
            error!(?err, "metrics buffer not utf-8");
            (StatusCode::INTERNAL_SERVER_ERROR, "metric encode error").into_response()
        }
        (_, Err(err)) => {
            error!(?err, "failed to build content-type header");
            (StatusCode::INTERNAL_SERVER_ERROR, "metric encode error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_is_idempotent_for_the_same_snapshot() {
        let metrics = GuardMetrics::new().expect("metrics");
        let snapshot = ChainMetricsSnapshot {
            requests: 3,
            allowed: 2,
            blocked: 1,
            rate_limited: 1,
            ..Default::default()
        };
        metrics.sync(&snapshot);
        metrics.sync(&snapshot);
        let requests = metrics.events.with_label_values(&["request"]).get();
        assert_eq!(requests, 3);

        metrics.sync(&ChainMetricsSnapshot {
            requests: 5,
            ..snapshot
        });
        assert_eq!(metrics.events.with_label_values(&["request"]).get(), 5);
    }

    #[test]
    fn registry_exposes_both_families() {
        let metrics = GuardMetrics::new().expect("metrics");
        metrics.set_store_up(true);
        metrics.sync(&ChainMetricsSnapshot::default());
        let names: Vec<String> = metrics
            .registry()
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"gateguard_chain_events_total".to_string()));
        assert!(names.contains(&"gateguard_store_up".to_string()));
    }
}
