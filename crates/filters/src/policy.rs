use std::fmt;
use std::str::FromStr;

use gateguard_types::{FilterCategory, Finding, Severity};
use serde::{Deserialize, Serialize};

pub const CONTENT_POLICY_VIOLATION: &str = "content_policy_violation";
pub const PROMPT_INJECTION_RISK: &str = "prompt_injection_risk";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterAction {
    Log,
    Block,
}

impl FilterAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            FilterAction::Log => "log",
            FilterAction::Block => "block",
        }
    }
}

impl fmt::Display for FilterAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" | "allow" | "warn" => Ok(FilterAction::Log),
            "block" | "deny" => Ok(FilterAction::Block),
            other => Err(format!("unknown filter action `{other}` (expected log|block)")),
        }
    }
}

/// Maps a finding severity to what the request filter does about it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityPolicy {
    pub info: FilterAction,
    pub warning: FilterAction,
    pub critical: FilterAction,
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self {
            info: FilterAction::Log,
            warning: FilterAction::Log,
            critical: FilterAction::Block,
        }
    }
}

impl SeverityPolicy {
    pub fn action_for(&self, severity: Severity) -> FilterAction {
        match severity {
            Severity::Info => self.info,
            Severity::Warning => self.warning,
            Severity::Critical => self.critical,
        }
    }

    /// The most severe finding the policy blocks on, if any.
    pub fn blocking<'a>(&self, findings: &'a [Finding]) -> Option<&'a Finding> {
        findings
            .iter()
            .filter(|f| self.action_for(f.severity) == FilterAction::Block)
            .max_by_key(|f| f.severity)
    }
}

pub fn block_reason(finding: &Finding) -> &'static str {
    match finding.category {
        FilterCategory::PromptInjection => PROMPT_INJECTION_RISK,
        FilterCategory::SecretLeak | FilterCategory::Pii => CONTENT_POLICY_VIOLATION,
    }
}
