use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::class::{ErrorKind, ErrorSeverity, RetryClass};

/// Stable, dotted error identifier (`STORE.TIMEOUT`). Part of the public
/// contract: callers match on these strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub &'static str);

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        self.0
    }

    pub fn spec(self) -> &'static CodeSpec {
        spec_of(self)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(SPECS
            .iter()
            .find(|spec| spec.code.0 == raw)
            .map_or(codes::UNKNOWN_INTERNAL, |spec| spec.code))
    }
}

#[derive(Clone, Debug)]
pub struct CodeSpec {
    pub code: ErrorCode,
    pub kind: ErrorKind,
    pub http_status: u16,
    pub retryable: RetryClass,
    pub severity: ErrorSeverity,
    pub default_user_msg: &'static str,
}

pub mod codes {
    use super::ErrorCode;

    pub const CONFIG_INVALID: ErrorCode = ErrorCode("CONFIG.INVALID");
    pub const STORE_UNAVAILABLE: ErrorCode = ErrorCode("STORE.UNAVAILABLE");
    pub const STORE_TIMEOUT: ErrorCode = ErrorCode("STORE.TIMEOUT");
    pub const REQUEST_MALFORMED: ErrorCode = ErrorCode("REQUEST.MALFORMED");
    pub const FILTER_RULE_INVALID: ErrorCode = ErrorCode("FILTER.RULE_INVALID");
    pub const QUOTA_RATELIMIT: ErrorCode = ErrorCode("QUOTA.RATE_LIMITED");
    pub const QUOTA_BLOCKED: ErrorCode = ErrorCode("QUOTA.BLOCKED");
    pub const POLICY_CONTENT_BLOCKED: ErrorCode = ErrorCode("POLICY.CONTENT_BLOCKED");
    pub const DOWNSTREAM_UNAVAILABLE: ErrorCode = ErrorCode("DOWNSTREAM.UNAVAILABLE");
    pub const UNKNOWN_INTERNAL: ErrorCode = ErrorCode("UNKNOWN.INTERNAL");
}

const fn spec(
    code: ErrorCode,
    kind: ErrorKind,
    http_status: u16,
    retryable: RetryClass,
    severity: ErrorSeverity,
    default_user_msg: &'static str,
) -> CodeSpec {
    CodeSpec {
        code,
        kind,
        http_status,
        retryable,
        severity,
        default_user_msg,
    }
}

const RETRY_LATER: &str = "Service temporarily unavailable. Please retry later.";
const MISCONFIGURED: &str = "Service is misconfigured.";

static UNKNOWN_SPEC: CodeSpec = spec(
    codes::UNKNOWN_INTERNAL,
    ErrorKind::Unknown,
    500,
    RetryClass::Transient,
    ErrorSeverity::Critical,
    "Internal error. Please retry later.",
);

static SPECS: [CodeSpec; 9] = {
    use crate::code::codes::*;
    use crate::class::ErrorKind as K;
    use crate::class::ErrorSeverity as S;
    use crate::class::RetryClass::{Permanent, Transient};
    [
        spec(CONFIG_INVALID, K::Config, 500, Permanent, S::Critical, MISCONFIGURED),
        spec(STORE_UNAVAILABLE, K::Storage, 503, Transient, S::Warn, RETRY_LATER),
        spec(STORE_TIMEOUT, K::Timeout, 503, Transient, S::Warn, RETRY_LATER),
        spec(
            REQUEST_MALFORMED,
            K::Schema,
            400,
            Permanent,
            S::Info,
            "Your request is invalid. Please check inputs.",
        ),
        spec(FILTER_RULE_INVALID, K::Config, 500, Permanent, S::Critical, MISCONFIGURED),
        spec(
            QUOTA_RATELIMIT,
            K::RateLimit,
            429,
            Transient,
            S::Warn,
            "Too many requests. Please retry later.",
        ),
        spec(
            QUOTA_BLOCKED,
            K::RateLimit,
            429,
            Transient,
            S::Warn,
            "Temporarily blocked. Please retry later.",
        ),
        spec(
            POLICY_CONTENT_BLOCKED,
            K::PolicyDeny,
            403,
            Permanent,
            S::Warn,
            "Request blocked by content policy.",
        ),
        spec(
            DOWNSTREAM_UNAVAILABLE,
            K::Downstream,
            502,
            Transient,
            S::Error,
            "Upstream service is unavailable. Please retry later.",
        ),
    ]
};

/// All registered codes, `UNKNOWN.INTERNAL` last.
pub fn all_specs() -> impl Iterator<Item = &'static CodeSpec> {
    SPECS.iter().chain(std::iter::once(&UNKNOWN_SPEC))
}

/// Codes that were never registered resolve to `UNKNOWN.INTERNAL`.
pub fn spec_of(code: ErrorCode) -> &'static CodeSpec {
    SPECS
        .iter()
        .find(|spec| spec.code == code)
        .unwrap_or(&UNKNOWN_SPEC)
}
