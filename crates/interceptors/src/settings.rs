use std::time::Duration;

use gateguard_filters::SeverityPolicy;
use gateguard_quota::FailPolicy;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LimitSettings {
    pub global_limit: u64,
    pub per_ip_limit: u64,
    pub per_user_limit: u64,
    /// Budget for requests that arrive without a usable client address.
    pub unknown_limit: u64,
    pub window: Duration,
    pub block_duration: Duration,
    pub global_cooldown: Duration,
    pub fail_policy: FailPolicy,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            global_limit: 1000,
            per_ip_limit: 100,
            per_user_limit: 100,
            unknown_limit: 10,
            window: Duration::from_secs(60),
            block_duration: Duration::from_secs(300),
            global_cooldown: Duration::from_secs(5),
            fail_policy: FailPolicy::Closed,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterSettings {
    pub severity_policy: SeverityPolicy,
    /// `0.0` disables risk-based blocking.
    pub risk_threshold: f64,
    pub redact_responses: bool,
    pub max_response_bytes: usize,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            severity_policy: SeverityPolicy::default(),
            risk_threshold: 5.0,
            redact_responses: false,
            max_response_bytes: 50_000,
        }
    }
}
