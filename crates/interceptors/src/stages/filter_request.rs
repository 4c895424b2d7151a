use std::sync::Arc;

use async_trait::async_trait;
use gateguard_filters::policy::{block_reason, PROMPT_INJECTION_RISK};
use gateguard_filters::{ContentFilter, RiskScorer};
use gateguard_types::{FilterCategory, Finding, InterceptionDecision, Severity};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::context::InterceptContext;
use crate::errors::InterceptError;
use crate::settings::FilterSettings;
use crate::stages::{Stage, StageOutcome};

/// FILTER_REQUEST: rule findings first, then the risk score.
pub struct FilterRequestStage {
    pub filter: Arc<ContentFilter>,
    pub scorer: RiskScorer,
    pub settings: FilterSettings,
}

impl FilterRequestStage {
    pub fn new(filter: Arc<ContentFilter>, settings: FilterSettings) -> Self {
        let scorer = RiskScorer::from_filter(&filter);
        Self {
            filter,
            scorer,
            settings,
        }
    }
}

#[async_trait]
impl Stage for FilterRequestStage {
    fn name(&self) -> &'static str {
        "filter_request"
    }

    fn failure_reason(&self) -> &'static str {
        PROMPT_INJECTION_RISK
    }

    async fn handle(&self, cx: &mut InterceptContext) -> Result<StageOutcome, InterceptError> {
        let text = cx.request.payload_text();
        let findings = self.filter.scan(&text);
        log_findings(&findings, "request", &cx.request_id);
        cx.request_findings = findings;

        if let Some(hit) = self.settings.severity_policy.blocking(&cx.request_findings) {
            warn!(
                target: "security",
                request_id = %cx.request_id,
                rule = %hit.rule,
                severity = hit.severity.as_str(),
                "request blocked by content filter"
            );
            return Ok(StageOutcome::ShortCircuit(
                InterceptionDecision::block(block_reason(hit))
                    .with_meta("rule", json!(hit.rule))
                    .with_meta("category", json!(hit.category.as_str()))
                    .with_meta("severity", json!(hit.severity.as_str())),
            ));
        }

        if self.settings.risk_threshold <= 0.0 {
            return Ok(StageOutcome::Continue);
        }
        let risk = self
            .scorer
            .assess(&text, cx.request.method(), &cx.request.params);
        cx.risk = Some(risk);
        if risk.total >= self.settings.risk_threshold {
            warn!(
                target: "security",
                request_id = %cx.request_id,
                tool = cx.request.method(),
                risk_score = risk.total,
                "prompt injection risk above threshold"
            );
            return Ok(StageOutcome::ShortCircuit(
                InterceptionDecision::block(PROMPT_INJECTION_RISK)
                    .with_meta("risk_score", json!((risk.total * 100.0).round() / 100.0)),
            ));
        }
        debug!(
            target: "security",
            tool = cx.request.method(),
            risk_score = risk.total,
            "request analyzed"
        );
        Ok(StageOutcome::Continue)
    }
}

/// Secret findings go to `secrets`, everything else to `security`. Only the
/// masked excerpt is ever logged.
pub(crate) fn log_findings(findings: &[Finding], phase: &str, request_id: &str) {
    for f in findings {
        let secret = f.category == FilterCategory::SecretLeak;
        match (secret, f.severity) {
            (true, Severity::Info) => info!(
                target: "secrets", phase, request_id, rule = %f.rule, excerpt = %f.matched_excerpt,
                "secret pattern matched"
            ),
            (true, _) => warn!(
                target: "secrets", phase, request_id, rule = %f.rule,
                severity = f.severity.as_str(), excerpt = %f.matched_excerpt,
                "secret pattern matched"
            ),
            (false, Severity::Info) => info!(
                target: "security", phase, request_id, rule = %f.rule,
                category = f.category.as_str(), "content rule matched"
            ),
            (false, _) => warn!(
                target: "security", phase, request_id, rule = %f.rule,
                category = f.category.as_str(), severity = f.severity.as_str(),
                "content rule matched"
            ),
        }
    }
}
