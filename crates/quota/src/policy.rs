use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What to do when the store cannot answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailPolicy {
    /// Deny while the store is unreachable.
    #[default]
    Closed,
    Open,
}

impl FailPolicy {
    pub fn admits(self) -> bool {
        matches!(self, FailPolicy::Open)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            FailPolicy::Closed => "closed",
            FailPolicy::Open => "open",
        }
    }
}

impl fmt::Display for FailPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "closed" | "fail-closed" | "fail_closed" => Ok(FailPolicy::Closed),
            "open" | "fail-open" | "fail_open" => Ok(FailPolicy::Open),
            other => Err(format!("unknown fail policy '{other}' (expected closed|open)")),
        }
    }
}
