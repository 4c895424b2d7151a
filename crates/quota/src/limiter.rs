use std::time::Duration;

use gateguard_store::{AdmitRequest, StoreHandle, StoreKeys};
use gateguard_types::{ClockHandle, RateLimitScope, WindowEntry};
use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::QuotaError;
use crate::policy::FailPolicy;

const DEFAULT_EXPIRY_BUFFER: Duration = Duration::from_secs(1);

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LimitStatus {
    #[serde(skip)]
    pub scope: RateLimitScope,
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    /// Unix seconds at which the oldest live entry leaves the window.
    pub reset_at: i64,
    /// Set when the answer came from the fail policy rather than the store.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

impl LimitStatus {
    pub fn retry_after(&self, now_ms: i64) -> u64 {
        (self.reset_at - now_ms.div_euclid(1000)).max(1) as u64
    }
}

/// Continuous sliding-window limiter. Holds no per-scope state; every decision
/// is one atomic store round trip.
#[derive(Clone)]
pub struct SlidingWindowLimiter {
    store: StoreHandle,
    clock: ClockHandle,
    fail_policy: FailPolicy,
    expiry_buffer: Duration,
}

impl SlidingWindowLimiter {
    pub fn new(store: StoreHandle, clock: ClockHandle) -> Self {
        Self {
            store,
            clock,
            fail_policy: FailPolicy::default(),
            expiry_buffer: DEFAULT_EXPIRY_BUFFER,
        }
    }

    pub fn with_fail_policy(mut self, policy: FailPolicy) -> Self {
        self.fail_policy = policy;
        self
    }

    pub fn with_expiry_buffer(mut self, buffer: Duration) -> Self {
        self.expiry_buffer = buffer;
        self
    }

    pub fn fail_policy(&self) -> FailPolicy {
        self.fail_policy
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub async fn check(
        &self,
        scope: &RateLimitScope,
        limit: u64,
        window: Duration,
    ) -> Result<LimitStatus, QuotaError> {
        if window.is_zero() {
            return Err(QuotaError::config("window must be greater than zero"));
        }

        let now = self.clock.now_ms();
        let window_ms = window.as_millis() as i64;
        if limit == 0 {
            return Ok(LimitStatus {
                scope: scope.clone(),
                allowed: false,
                limit,
                remaining: 0,
                reset_at: crate::ceil_secs(now + window_ms),
                degraded: false,
            });
        }

        let req = AdmitRequest {
            now_ms: now,
            window_ms,
            limit,
            member: WindowEntry::at(now).member(),
            expire_ms: window_ms + self.expiry_buffer.as_millis() as i64,
        };

        match self.store.admit(&StoreKeys::window(scope), req).await {
            Ok(outcome) => {
                let reset_at = crate::ceil_secs(outcome.oldest_ms.unwrap_or(now) + window_ms);
                let status = LimitStatus {
                    scope: scope.clone(),
                    allowed: outcome.admitted,
                    limit,
                    remaining: limit.saturating_sub(outcome.count),
                    reset_at,
                    degraded: false,
                };
                debug!(
                    target: "rate-limiter",
                    scope = %scope,
                    allowed = status.allowed,
                    count = outcome.count,
                    limit,
                    "window checked"
                );
                Ok(status)
            }
            Err(err) => {
                warn!(
                    target: "rate-limiter",
                    scope = %scope,
                    op = err.op(),
                    code = err.0.code.0,
                    policy = %self.fail_policy,
                    "store unavailable; applying fail policy"
                );
                Ok(LimitStatus {
                    scope: scope.clone(),
                    allowed: self.fail_policy.admits(),
                    limit,
                    remaining: 0,
                    reset_at: crate::ceil_secs(now + window_ms),
                    degraded: true,
                })
            }
        }
    }
}
