pub use crate::audit::{AuditRecord, AuditSink, StoreAuditSink, TracingAuditSink};
pub use crate::chain::{BeforeOutcome, ChainBuilder, ChainResponse, Downstream, InterceptorChain};
pub use crate::context::{InterceptContext, RateLimits};
pub use crate::errors::InterceptError;
pub use crate::metrics::{ChainMetrics, ChainMetricsSnapshot};
pub use crate::request::{HookRequest, Identity};
pub use crate::settings::{FilterSettings, LimitSettings};
pub use crate::stages::{ResponseStage, Stage, StageOutcome};
