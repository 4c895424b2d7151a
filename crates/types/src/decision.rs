use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Allow,
    Block,
}

/// Output of a single hook invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InterceptionDecision {
    pub action: Action,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl InterceptionDecision {
    pub fn allow(reason: impl Into<String>) -> Self {
        Self {
            action: Action::Allow,
            reason: reason.into(),
            retry_after: None,
            metadata: Map::new(),
        }
    }

    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            action: Action::Block,
            reason: reason.into(),
            retry_after: None,
            metadata: Map::new(),
        }
    }

    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn is_block(&self) -> bool {
        matches!(self.action, Action::Block)
    }
}
