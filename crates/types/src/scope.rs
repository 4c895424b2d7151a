use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Global,
    PerIp,
    PerUser,
}

impl ScopeKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ScopeKind::Global => "global",
            ScopeKind::PerIp => "ip",
            ScopeKind::PerUser => "user",
        }
    }
}

/// A countable dimension. Unique per `(kind, key)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RateLimitScope {
    pub kind: ScopeKind,
    pub key: String,
}

impl RateLimitScope {
    pub fn global() -> Self {
        Self {
            kind: ScopeKind::Global,
            key: "all".to_string(),
        }
    }

    pub fn ip(addr: impl Into<String>) -> Self {
        Self {
            kind: ScopeKind::PerIp,
            key: addr.into(),
        }
    }

    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            kind: ScopeKind::PerUser,
            key: user_id.into(),
        }
    }

    /// Stable identifier used for block entries and store keys, e.g. `ip:10.0.0.7`.
    pub fn scope_key(&self) -> String {
        format!("{}:{}", self.kind.as_str(), self.key)
    }

    pub fn is_global(&self) -> bool {
        matches!(self.kind, ScopeKind::Global)
    }
}

impl fmt::Display for RateLimitScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.key)
    }
}
