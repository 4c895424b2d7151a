use serde::{Deserialize, Serialize};

/// Broad family an error code belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    Storage,
    Timeout,
    Schema,
    RateLimit,
    PolicyDeny,
    Downstream,
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryClass {
    Transient,
    Permanent,
}

/// Log severity of the error itself; unrelated to content finding severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    Info,
    Warn,
    Error,
    Critical,
}
