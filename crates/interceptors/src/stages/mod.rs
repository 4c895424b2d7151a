use async_trait::async_trait;
use gateguard_types::InterceptionDecision;
use serde_json::Value;

use crate::context::InterceptContext;
use crate::errors::InterceptError;

pub mod audit_log;
pub mod block_check;
pub mod filter_request;
pub mod filter_response;
pub mod rate_limit;

pub use audit_log::AuditLogStage;
pub use block_check::BlockCheckStage;
pub use filter_request::FilterRequestStage;
pub use filter_response::FilterResponseStage;
pub use rate_limit::RateLimitStage;

pub const RATE_LIMITER_UNAVAILABLE: &str = "rate_limiter_unavailable";

#[derive(Clone, Debug, PartialEq)]
pub enum StageOutcome {
    Continue,
    ShortCircuit(InterceptionDecision),
}

/// A before-hook stage. Returning `ShortCircuit` jumps straight to RESPOND.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Reason used when the stage errors and the fail policy denies.
    fn failure_reason(&self) -> &'static str {
        RATE_LIMITER_UNAVAILABLE
    }

    async fn handle(&self, cx: &mut InterceptContext) -> Result<StageOutcome, InterceptError>;
}

/// An after-hook stage. May rewrite the response; never blocks.
#[async_trait]
pub trait ResponseStage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(
        &self,
        cx: &mut InterceptContext,
        response: &mut Value,
    ) -> Result<(), InterceptError>;
}
