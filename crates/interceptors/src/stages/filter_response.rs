use std::sync::Arc;

use async_trait::async_trait;
use gateguard_filters::{ContentFilter, Redactor};
use serde_json::Value;

use crate::context::InterceptContext;
use crate::errors::InterceptError;
use crate::stages::filter_request::log_findings;
use crate::stages::ResponseStage;

/// FILTER_RESPONSE: records findings; rewrites the payload only when a
/// redactor is configured.
pub struct FilterResponseStage {
    pub filter: Arc<ContentFilter>,
    pub redactor: Option<Redactor>,
}

#[async_trait]
impl ResponseStage for FilterResponseStage {
    fn name(&self) -> &'static str {
        "filter_response"
    }

    async fn handle(
        &self,
        cx: &mut InterceptContext,
        response: &mut Value,
    ) -> Result<(), InterceptError> {
        let is_text = response.is_string();
        let text = match &*response {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let findings = self.filter.scan(&text);
        log_findings(&findings, "response", &cx.request_id);

        if let Some(redactor) = &self.redactor {
            let redacted = redactor.redact(&text, &findings);
            if redacted != text {
                *response = if is_text {
                    Value::String(redacted)
                } else {
                    serde_json::from_str(&redacted).unwrap_or(Value::String(redacted))
                };
            }
        }
        cx.response_findings = findings;
        Ok(())
    }
}
