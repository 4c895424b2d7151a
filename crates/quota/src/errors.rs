use gateguard_errors::prelude::*;
use gateguard_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("invalid quota configuration: {0}")]
    Config(String),
    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

impl QuotaError {
    pub fn config(msg: impl Into<String>) -> Self {
        QuotaError::Config(msg.into())
    }

    pub fn to_error_obj(&self) -> ErrorObj {
        match self {
            QuotaError::Config(msg) => ErrorBuilder::new(codes::CONFIG_INVALID)
                .dev_msg(msg.as_str())
                .build(),
            QuotaError::Store(err) => (*err.0).clone(),
        }
    }
}
