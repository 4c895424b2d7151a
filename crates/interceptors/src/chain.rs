use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gateguard_errors::prelude::*;
use gateguard_filters::policy::{CONTENT_POLICY_VIOLATION, PROMPT_INJECTION_RISK};
use gateguard_filters::{ContentFilter, Redactor};
use gateguard_quota::{BlockList, FailPolicy, SlidingWindowLimiter};
use gateguard_store::StoreHandle;
use gateguard_types::{ClockHandle, InterceptionDecision};
use serde_json::{json, Value};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::audit::AuditSink;
use crate::context::{InterceptContext, RateLimits};
use crate::errors::{to_http_response, InterceptError};
use crate::metrics::ChainMetrics;
use crate::request::HookRequest;
use crate::settings::{FilterSettings, LimitSettings};
use crate::stages::block_check::TEMPORARILY_BLOCKED;
use crate::stages::rate_limit::{
    GLOBAL_RATE_LIMIT_EXCEEDED, IP_RATE_LIMIT_EXCEEDED, USER_RATE_LIMIT_EXCEEDED,
};
use crate::stages::{
    AuditLogStage, BlockCheckStage, FilterRequestStage, FilterResponseStage, RateLimitStage,
    ResponseStage, Stage, StageOutcome, RATE_LIMITER_UNAVAILABLE,
};

pub const ALLOWED: &str = "allowed";

/// The protected call the chain wraps.
#[async_trait]
pub trait Downstream: Send + Sync {
    async fn call(&self, request: &HookRequest) -> Result<Value, InterceptError>;
}

pub fn code_for_reason(reason: &str) -> ErrorCode {
    match reason {
        GLOBAL_RATE_LIMIT_EXCEEDED
        | IP_RATE_LIMIT_EXCEEDED
        | USER_RATE_LIMIT_EXCEEDED
        | RATE_LIMITER_UNAVAILABLE => codes::QUOTA_RATELIMIT,
        TEMPORARILY_BLOCKED => codes::QUOTA_BLOCKED,
        CONTENT_POLICY_VIOLATION | PROMPT_INJECTION_RISK => codes::POLICY_CONTENT_BLOCKED,
        _ => codes::POLICY_CONTENT_BLOCKED,
    }
}

#[derive(Clone, Debug)]
pub struct BeforeOutcome {
    pub decision: InterceptionDecision,
    pub context: InterceptContext,
}

impl BeforeOutcome {
    pub fn is_block(&self) -> bool {
        self.decision.is_block()
    }

    pub fn rate_limits(&self) -> &RateLimits {
        &self.context.rate_limits
    }

    pub fn http_status(&self) -> u16 {
        if self.is_block() {
            spec_of(code_for_reason(&self.decision.reason)).http_status
        } else {
            200
        }
    }

    /// `{action, reason, retry_after?, rate_limits?}`
    pub fn to_hook_output(&self) -> Value {
        let mut out = json!({
            "action": self.decision.action,
            "reason": self.decision.reason,
        });
        if let Some(retry_after) = self.decision.retry_after {
            out["retry_after"] = json!(retry_after);
        }
        let limits = self.rate_limits();
        if !limits.is_empty() {
            out["rate_limits"] = json!(limits);
        }
        out
    }
}

#[derive(Clone, Debug)]
pub struct ChainResponse {
    pub decision: InterceptionDecision,
    pub status: u16,
    pub body: Value,
}

pub struct InterceptorChain {
    before: Vec<Box<dyn Stage>>,
    after: Vec<Box<dyn ResponseStage>>,
    clock: ClockHandle,
    fail_policy: FailPolicy,
    downstream_timeout: Duration,
    metrics: ChainMetrics,
}

impl InterceptorChain {
    pub fn new(
        before: Vec<Box<dyn Stage>>,
        after: Vec<Box<dyn ResponseStage>>,
        clock: ClockHandle,
    ) -> Self {
        Self {
            before,
            after,
            clock,
            fail_policy: FailPolicy::default(),
            downstream_timeout: Duration::from_secs(30),
            metrics: ChainMetrics::default(),
        }
    }

    pub fn with_fail_policy(mut self, policy: FailPolicy) -> Self {
        self.fail_policy = policy;
        self
    }

    pub fn with_downstream_timeout(mut self, limit: Duration) -> Self {
        self.downstream_timeout = limit;
        self
    }

    pub fn with_metrics(mut self, metrics: ChainMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &ChainMetrics {
        &self.metrics
    }

    pub fn context(&self, request: HookRequest) -> InterceptContext {
        InterceptContext::new(request, self.clock.now_ms())
    }

    /// CHECK_BLOCKED, CHECK_RATE_LIMIT and FILTER_REQUEST. Stage errors never
    /// escape; they become an allow-with-warning or a block per fail policy.
    pub async fn before(&self, request: HookRequest) -> BeforeOutcome {
        self.metrics.record_request();
        let mut cx = self.context(request);

        for stage in &self.before {
            let decision = match stage.handle(&mut cx).await {
                Ok(StageOutcome::Continue) => continue,
                Ok(StageOutcome::ShortCircuit(decision)) => decision,
                Err(err) => {
                    warn!(
                        target: "security",
                        stage = stage.name(),
                        code = err.code().0,
                        policy = %self.fail_policy,
                        "stage failed"
                    );
                    if self.fail_policy.admits() {
                        cx.warn(format!("{} skipped", stage.name()));
                        continue;
                    }
                    InterceptionDecision::block(stage.failure_reason()).with_retry_after(1)
                }
            };
            return self.blocked(cx, decision);
        }

        self.metrics.record_allowed();
        let mut decision = InterceptionDecision::allow(ALLOWED);
        if !cx.warnings.is_empty() {
            decision = decision.with_meta("warnings", json!(cx.warnings));
        }
        BeforeOutcome {
            decision,
            context: cx,
        }
    }

    fn blocked(&self, cx: InterceptContext, decision: InterceptionDecision) -> BeforeOutcome {
        self.metrics.record_blocked();
        match code_for_reason(&decision.reason) {
            codes::QUOTA_RATELIMIT | codes::QUOTA_BLOCKED => self.metrics.record_rate_limited(),
            _ => self.metrics.record_content_blocked(),
        }
        info!(
            target: "security",
            request_id = %cx.request_id,
            client_ip = %cx.identity.ip,
            user_id = %cx.identity.user_id,
            reason = %decision.reason,
            retry_after = decision.retry_after,
            "request blocked"
        );
        BeforeOutcome {
            decision,
            context: cx,
        }
    }

    /// FILTER_RESPONSE and AUDIT_LOG. Always returns a response.
    pub async fn after(&self, cx: &mut InterceptContext, mut response: Value) -> Value {
        for stage in &self.after {
            if let Err(err) = stage.handle(cx, &mut response).await {
                warn!(
                    target: "audit",
                    stage = stage.name(),
                    code = err.code().0,
                    "after stage failed"
                );
            }
        }
        response
    }

    /// Full call: before, protected call, after. Reaches RESPOND exactly once.
    pub async fn run(&self, request: HookRequest, downstream: &dyn Downstream) -> ChainResponse {
        let outcome = self.before(request).await;
        if outcome.is_block() {
            return ChainResponse {
                status: outcome.http_status(),
                body: outcome.to_hook_output(),
                decision: outcome.decision,
            };
        }

        let BeforeOutcome {
            decision,
            mut context,
        } = outcome;
        let (status, body) =
            match call_with_timeout(self.downstream_timeout, downstream, &context.request).await {
                Ok(body) => (200, body),
                Err(err) => {
                    self.metrics.record_downstream_failure();
                    warn!(
                        target: "security",
                        request_id = %context.request_id,
                        code = err.code().0,
                        "protected call failed"
                    );
                    to_http_response(&err)
                }
            };
        let body = self.after(&mut context, body).await;
        ChainResponse {
            decision,
            status,
            body,
        }
    }
}

async fn call_with_timeout(
    limit: Duration,
    downstream: &dyn Downstream,
    request: &HookRequest,
) -> Result<Value, InterceptError> {
    match timeout(limit, downstream.call(request)).await {
        Ok(res) => res,
        Err(_) => Err(InterceptError::downstream("protected call timed out")),
    }
}

/// Assembles the standard five-stage chain over one store.
pub struct ChainBuilder {
    store: StoreHandle,
    clock: ClockHandle,
    filter: Arc<ContentFilter>,
    limits: LimitSettings,
    filters: FilterSettings,
    sinks: Vec<Arc<dyn AuditSink>>,
    metrics: ChainMetrics,
    downstream_timeout: Duration,
}

impl ChainBuilder {
    pub fn new(store: StoreHandle, clock: ClockHandle, filter: Arc<ContentFilter>) -> Self {
        Self {
            store,
            clock,
            filter,
            limits: LimitSettings::default(),
            filters: FilterSettings::default(),
            sinks: Vec::new(),
            metrics: ChainMetrics::default(),
            downstream_timeout: Duration::from_secs(30),
        }
    }

    pub fn limits(mut self, limits: LimitSettings) -> Self {
        self.limits = limits;
        self
    }

    pub fn filters(mut self, filters: FilterSettings) -> Self {
        self.filters = filters;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn metrics(mut self, metrics: ChainMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn downstream_timeout(mut self, limit: Duration) -> Self {
        self.downstream_timeout = limit;
        self
    }

    pub fn build(self) -> InterceptorChain {
        let policy = self.limits.fail_policy;
        let limiter = SlidingWindowLimiter::new(self.store.clone(), self.clock.clone())
            .with_fail_policy(policy);
        let blocks =
            BlockList::new(self.store.clone(), self.clock.clone()).with_fail_policy(policy);
        let redactor = self.filters.redact_responses.then(|| {
            Redactor::new(self.filter.clone()).with_max_bytes(self.filters.max_response_bytes)
        });

        let before: Vec<Box<dyn Stage>> = vec![
            Box::new(BlockCheckStage {
                blocks: blocks.clone(),
                clock: self.clock.clone(),
                metrics: self.metrics.clone(),
            }),
            Box::new(RateLimitStage {
                limiter,
                blocks,
                limits: self.limits,
                metrics: self.metrics.clone(),
            }),
            Box::new(FilterRequestStage::new(self.filter.clone(), self.filters)),
        ];
        let after: Vec<Box<dyn ResponseStage>> = vec![
            Box::new(FilterResponseStage {
                filter: self.filter,
                redactor,
            }),
            Box::new(AuditLogStage {
                sinks: self.sinks,
                clock: self.clock.clone(),
                metrics: self.metrics.clone(),
            }),
        ];

        InterceptorChain::new(before, after, self.clock)
            .with_fail_policy(policy)
            .with_downstream_timeout(self.downstream_timeout)
            .with_metrics(self.metrics)
    }
}
