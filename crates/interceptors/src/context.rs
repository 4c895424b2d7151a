use gateguard_filters::RiskAssessment;
use gateguard_quota::LimitStatus;
use gateguard_types::Finding;
use serde::Serialize;
use uuid::Uuid;

use crate::request::{HookRequest, Identity};

/// Limiter answers gathered while checking a request, one per scope consulted.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RateLimits {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global: Option<LimitStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<LimitStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<LimitStatus>,
}

impl RateLimits {
    pub fn is_empty(&self) -> bool {
        self.global.is_none() && self.ip.is_none() && self.user.is_none()
    }
}

/// State for one call. Lives on the caller's stack and is dropped at RESPOND.
#[derive(Clone, Debug)]
pub struct InterceptContext {
    pub request_id: String,
    pub request: HookRequest,
    pub identity: Identity,
    pub started_at_ms: i64,
    pub rate_limits: RateLimits,
    pub request_findings: Vec<Finding>,
    pub response_findings: Vec<Finding>,
    pub risk: Option<RiskAssessment>,
    pub warnings: Vec<String>,
}

impl InterceptContext {
    pub fn new(request: HookRequest, now_ms: i64) -> Self {
        let identity = request.identity();
        let request_id = request
            .id
            .as_ref()
            .map(|id| match id {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Self {
            request_id,
            request,
            identity,
            started_at_ms: now_ms,
            rate_limits: RateLimits::default(),
            request_findings: Vec::new(),
            response_findings: Vec::new(),
            risk: None,
            warnings: Vec::new(),
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}
