use std::sync::Arc;

use async_trait::async_trait;
use gateguard_types::ClockHandle;
use serde_json::Value;
use tracing::warn;

use crate::audit::{AuditRecord, AuditSink};
use crate::context::InterceptContext;
use crate::errors::InterceptError;
use crate::metrics::ChainMetrics;
use crate::stages::ResponseStage;

/// AUDIT_LOG: best effort. Sink failures are counted and logged, never
/// returned.
pub struct AuditLogStage {
    pub sinks: Vec<Arc<dyn AuditSink>>,
    pub clock: ClockHandle,
    pub metrics: ChainMetrics,
}

#[async_trait]
impl ResponseStage for AuditLogStage {
    fn name(&self) -> &'static str {
        "audit_log"
    }

    async fn handle(
        &self,
        cx: &mut InterceptContext,
        response: &mut Value,
    ) -> Result<(), InterceptError> {
        let record = AuditRecord::build(cx, response, self.clock.now_ms());
        for sink in &self.sinks {
            if let Err(err) = sink.write(&record).await {
                self.metrics.record_audit_failure();
                warn!(
                    target: "audit",
                    sink = sink.name(),
                    request_id = %record.request_id,
                    code = err.code().0,
                    "audit write failed"
                );
            }
        }
        Ok(())
    }
}
