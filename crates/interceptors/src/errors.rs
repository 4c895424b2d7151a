use gateguard_errors::prelude::*;
use gateguard_quota::QuotaError;
use gateguard_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct InterceptError(pub Box<ErrorObj>);

impl InterceptError {
    pub fn into_inner(self) -> ErrorObj {
        *self.0
    }

    pub fn internal(msg: &str) -> Self {
        Self::from_error(
            ErrorBuilder::new(codes::UNKNOWN_INTERNAL)
                .user_msg("Internal error. Please retry later.")
                .dev_msg(msg)
                .build(),
        )
    }

    pub fn downstream(msg: &str) -> Self {
        Self::from_error(
            ErrorBuilder::new(codes::DOWNSTREAM_UNAVAILABLE)
                .dev_msg(msg)
                .build(),
        )
    }

    pub fn from_error(err: ErrorObj) -> Self {
        Self(Box::new(err))
    }

    pub fn code(&self) -> ErrorCode {
        self.0.code
    }
}

impl From<QuotaError> for InterceptError {
    fn from(value: QuotaError) -> Self {
        Self::from_error(value.to_error_obj())
    }
}

impl From<StoreError> for InterceptError {
    fn from(value: StoreError) -> Self {
        Self(value.0)
    }
}

/// Public rendering: code and user message only, never the developer detail.
pub fn to_http_response(err: &InterceptError) -> (u16, serde_json::Value) {
    let obj = &err.0;
    let public = obj.to_public();
    (
        obj.http_status,
        serde_json::json!({
            "error": {
                "code": public.code,
                "message": public.message,
            }
        }),
    )
}
