use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Counters {
    requests: AtomicU64,
    allowed: AtomicU64,
    blocked: AtomicU64,
    rate_limited: AtomicU64,
    content_blocked: AtomicU64,
    store_degraded: AtomicU64,
    downstream_failures: AtomicU64,
    audit_failures: AtomicU64,
}

fn increment(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Per-chain counters; cloned handles share the same cells.
#[derive(Clone, Default)]
pub struct ChainMetrics {
    inner: Arc<Counters>,
}

impl ChainMetrics {
    pub fn record_request(&self) {
        increment(&self.inner.requests);
    }

    pub fn record_allowed(&self) {
        increment(&self.inner.allowed);
    }

    pub fn record_blocked(&self) {
        increment(&self.inner.blocked);
    }

    pub fn record_rate_limited(&self) {
        increment(&self.inner.rate_limited);
    }

    pub fn record_content_blocked(&self) {
        increment(&self.inner.content_blocked);
    }

    pub fn record_store_degraded(&self) {
        increment(&self.inner.store_degraded);
    }

    pub fn record_downstream_failure(&self) {
        increment(&self.inner.downstream_failures);
    }

    pub fn record_audit_failure(&self) {
        increment(&self.inner.audit_failures);
    }

    pub fn snapshot(&self) -> ChainMetricsSnapshot {
        let c = &self.inner;
        ChainMetricsSnapshot {
            requests: c.requests.load(Ordering::Relaxed),
            allowed: c.allowed.load(Ordering::Relaxed),
            blocked: c.blocked.load(Ordering::Relaxed),
            rate_limited: c.rate_limited.load(Ordering::Relaxed),
            content_blocked: c.content_blocked.load(Ordering::Relaxed),
            store_degraded: c.store_degraded.load(Ordering::Relaxed),
            downstream_failures: c.downstream_failures.load(Ordering::Relaxed),
            audit_failures: c.audit_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChainMetricsSnapshot {
    pub requests: u64,
    pub allowed: u64,
    pub blocked: u64,
    pub rate_limited: u64,
    pub content_blocked: u64,
    pub store_degraded: u64,
    pub downstream_failures: u64,
    pub audit_failures: u64,
}
