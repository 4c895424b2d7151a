use gateguard_errors::prelude::*;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct FilterError(pub Box<ErrorObj>);

impl FilterError {
    pub fn into_inner(self) -> ErrorObj {
        *self.0
    }

    pub fn invalid_rule(rule: &str, msg: &str) -> Self {
        Self(Box::new(
            ErrorBuilder::new(codes::FILTER_RULE_INVALID)
                .dev_msg(format!("rule `{rule}`: {msg}"))
                .meta_kv("rule", json!(rule))
                .build(),
        ))
    }

    pub fn rules_file(path: &str, msg: &str) -> Self {
        Self(Box::new(
            ErrorBuilder::new(codes::FILTER_RULE_INVALID)
                .dev_msg(format!("{path}: {msg}"))
                .meta_kv("path", json!(path))
                .build(),
        ))
    }

    pub fn rule(&self) -> Option<&str> {
        self.0.meta_str("rule")
    }
}
