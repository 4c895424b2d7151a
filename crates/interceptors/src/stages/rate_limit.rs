use async_trait::async_trait;
use gateguard_quota::{BlockList, LimitStatus, SlidingWindowLimiter};
use gateguard_types::{InterceptionDecision, RateLimitScope, ScopeKind};
use serde_json::json;
use tracing::{debug, warn};

use crate::context::InterceptContext;
use crate::errors::InterceptError;
use crate::metrics::ChainMetrics;
use crate::request::UNKNOWN_IP;
use crate::settings::LimitSettings;
use crate::stages::{Stage, StageOutcome, RATE_LIMITER_UNAVAILABLE};

pub const GLOBAL_RATE_LIMIT_EXCEEDED: &str = "global_rate_limit_exceeded";
pub const IP_RATE_LIMIT_EXCEEDED: &str = "ip_rate_limit_exceeded";
pub const USER_RATE_LIMIT_EXCEEDED: &str = "user_rate_limit_exceeded";

/// CHECK_RATE_LIMIT: global, then per-IP, then per-user. The first denial
/// wins and writes a block (or a global cool-down).
pub struct RateLimitStage {
    pub limiter: SlidingWindowLimiter,
    pub blocks: BlockList,
    pub limits: LimitSettings,
    pub metrics: ChainMetrics,
}

impl RateLimitStage {
    fn plan(&self, cx: &InterceptContext) -> Vec<(RateLimitScope, u64, &'static str)> {
        let id = &cx.identity;
        if id.malformed {
            return vec![(
                RateLimitScope::ip(UNKNOWN_IP),
                self.limits.unknown_limit,
                IP_RATE_LIMIT_EXCEEDED,
            )];
        }
        let mut plan = vec![
            (
                RateLimitScope::global(),
                self.limits.global_limit,
                GLOBAL_RATE_LIMIT_EXCEEDED,
            ),
            (
                RateLimitScope::ip(id.ip.as_str()),
                self.limits.per_ip_limit,
                IP_RATE_LIMIT_EXCEEDED,
            ),
        ];
        if !id.is_anonymous() {
            plan.push((
                RateLimitScope::user(id.user_id.as_str()),
                self.limits.per_user_limit,
                USER_RATE_LIMIT_EXCEEDED,
            ));
        }
        plan
    }

    async fn deny(
        &self,
        cx: &InterceptContext,
        scope: &RateLimitScope,
        status: &LimitStatus,
        reason: &'static str,
    ) -> InterceptionDecision {
        if status.degraded {
            self.metrics.record_store_degraded();
            return InterceptionDecision::block(RATE_LIMITER_UNAVAILABLE).with_retry_after(1);
        }

        let penalty = if scope.is_global() {
            self.limits.global_cooldown
        } else {
            self.limits.block_duration
        };
        if let Err(err) = self.blocks.block(&scope.scope_key(), reason, penalty).await {
            warn!(
                target: "rate-limiter",
                scope = %scope,
                error = %err,
                "failed to record block; denial stands"
            );
        }

        let retry_after = status
            .retry_after(self.limiter.now_ms())
            .max(penalty.as_secs());
        warn!(
            target: "rate-limiter",
            request_id = %cx.request_id,
            scope = %scope,
            limit = status.limit,
            retry_after,
            reason,
            "rate limit exceeded"
        );
        InterceptionDecision::block(reason)
            .with_retry_after(retry_after)
            .with_meta("scope", json!(scope.kind.as_str()))
            .with_meta("limit", json!(status.limit))
    }
}

#[async_trait]
impl Stage for RateLimitStage {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    async fn handle(&self, cx: &mut InterceptContext) -> Result<StageOutcome, InterceptError> {
        for (scope, limit, reason) in self.plan(cx) {
            let status = self
                .limiter
                .check(&scope, limit, self.limits.window)
                .await?;
            match scope.kind {
                ScopeKind::Global => cx.rate_limits.global = Some(status.clone()),
                ScopeKind::PerIp => cx.rate_limits.ip = Some(status.clone()),
                ScopeKind::PerUser => cx.rate_limits.user = Some(status.clone()),
            }

            if !status.allowed {
                let decision = self.deny(cx, &scope, &status, reason).await;
                return Ok(StageOutcome::ShortCircuit(decision));
            }
            if status.degraded {
                self.metrics.record_store_degraded();
                cx.warn(format!("{scope} admitted without metering"));
            }
            debug!(
                target: "rate-limiter",
                scope = %scope,
                remaining = status.remaining,
                "admitted"
            );
        }
        Ok(StageOutcome::Continue)
    }
}
