use async_trait::async_trait;
use gateguard_quota::blocklist::STORE_UNAVAILABLE_REASON;
use gateguard_quota::BlockList;
use gateguard_types::{ClockHandle, InterceptionDecision, RateLimitScope};
use serde_json::json;
use tracing::warn;

use crate::context::InterceptContext;
use crate::errors::InterceptError;
use crate::metrics::ChainMetrics;
use crate::stages::{Stage, StageOutcome, RATE_LIMITER_UNAVAILABLE};

pub const TEMPORARILY_BLOCKED: &str = "temporarily_blocked";

/// CHECK_BLOCKED: one lookup per scope the request belongs to, global
/// cool-down first.
pub struct BlockCheckStage {
    pub blocks: BlockList,
    pub clock: ClockHandle,
    pub metrics: ChainMetrics,
}

pub(crate) fn scopes_for(cx: &InterceptContext) -> Vec<RateLimitScope> {
    let id = &cx.identity;
    let mut scopes = Vec::with_capacity(3);
    if !id.malformed {
        scopes.push(RateLimitScope::global());
    }
    scopes.push(RateLimitScope::ip(id.ip.as_str()));
    if !id.is_anonymous() {
        scopes.push(RateLimitScope::user(id.user_id.as_str()));
    }
    scopes
}

#[async_trait]
impl Stage for BlockCheckStage {
    fn name(&self) -> &'static str {
        "block_check"
    }

    async fn handle(&self, cx: &mut InterceptContext) -> Result<StageOutcome, InterceptError> {
        for scope in scopes_for(cx) {
            let Some(entry) = self.blocks.is_blocked(&scope.scope_key()).await? else {
                continue;
            };
            if entry.reason == STORE_UNAVAILABLE_REASON {
                self.metrics.record_store_degraded();
                return Ok(StageOutcome::ShortCircuit(
                    InterceptionDecision::block(RATE_LIMITER_UNAVAILABLE).with_retry_after(1),
                ));
            }
            let retry_after = entry.retry_after(self.clock.now_ms());
            warn!(
                target: "security",
                request_id = %cx.request_id,
                scope = %scope,
                blocked_reason = %entry.reason,
                retry_after,
                "request from blocked scope"
            );
            return Ok(StageOutcome::ShortCircuit(
                InterceptionDecision::block(TEMPORARILY_BLOCKED)
                    .with_retry_after(retry_after)
                    .with_meta("scope", json!(scope.kind.as_str()))
                    .with_meta("blocked_reason", json!(entry.reason)),
            ));
        }
        Ok(StageOutcome::Continue)
    }
}
