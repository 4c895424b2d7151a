use gateguard_errors::prelude::*;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct StoreError(pub Box<ErrorObj>);

impl StoreError {
    pub fn into_inner(self) -> ErrorObj {
        *self.0
    }

    pub fn unavailable(op: &str, msg: &str) -> Self {
        Self(Box::new(
            ErrorBuilder::new(codes::STORE_UNAVAILABLE)
                .dev_msg(msg)
                .meta_kv("op", json!(op))
                .build(),
        ))
    }

    pub fn timeout(op: &str, elapsed_ms: u128) -> Self {
        Self(Box::new(
            ErrorBuilder::new(codes::STORE_TIMEOUT)
                .dev_msg(format!("{op} exceeded {elapsed_ms}ms"))
                .meta_kv("op", json!(op))
                .build(),
        ))
    }

    pub fn codec(op: &str, msg: &str) -> Self {
        Self(Box::new(
            ErrorBuilder::new(codes::UNKNOWN_INTERNAL)
                .user_msg("Store payload error.")
                .dev_msg(msg)
                .meta_kv("op", json!(op))
                .build(),
        ))
    }

    pub fn op(&self) -> &str {
        self.0.meta_str("op").unwrap_or("unknown")
    }

    pub fn is_timeout(&self) -> bool {
        self.0.code == codes::STORE_TIMEOUT
    }
}

impl From<ErrorObj> for StoreError {
    fn from(value: ErrorObj) -> Self {
        Self(Box::new(value))
    }
}
