use async_trait::async_trait;
use chrono::{SecondsFormat, TimeZone, Utc};
use gateguard_filters::classify;
use gateguard_store::{StoreHandle, StoreKeys};
use gateguard_types::{FilterCategory, Finding, Sensitivity};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::context::InterceptContext;
use crate::errors::InterceptError;

pub const AUDIT_VERSION: &str = "1.0";
pub const EVENT_TOOL_RESPONSE: &str = "tool_response";

const LARGE_RESPONSE_BYTES: usize = 100_000;
const FILE_INDICATORS: &[&str] = &["filename", "filepath", "directory", "file_content"];
const CODE_INDICATORS: &[&str] = &["function", "class", "import", "def ", "var ", "const ", "let "];
const URL_INDICATORS: &[&str] = &["http://", "https://", "ftp://", "file://"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub audit_version: String,
    pub timestamp: String,
    pub event_type: String,
    pub request_id: String,
    pub request_hash: String,
    pub method: String,
    pub params_hash: String,
    pub client_ip: String,
    pub user_id: String,
    pub success: bool,
    pub data_size: usize,
    pub sensitivity: Sensitivity,
    pub tags: Vec<String>,
    pub findings: Vec<Finding>,
    pub duration_ms: i64,
}

impl AuditRecord {
    pub fn build(cx: &InterceptContext, response: &Value, now_ms: i64) -> Self {
        let response_text = response.to_string();
        let sensitivity = classify(&response_text);
        let method = cx.request.method().to_string();
        let success = response.get("error").is_none();
        let tags = security_tags(&method, &response_text, sensitivity, success, &cx.response_findings);
        let timestamp = Utc
            .timestamp_millis_opt(now_ms)
            .single()
            .unwrap_or_else(Utc::now)
            .to_rfc3339_opts(SecondsFormat::Millis, true);

        Self {
            audit_version: AUDIT_VERSION.to_string(),
            timestamp,
            event_type: EVENT_TOOL_RESPONSE.to_string(),
            request_id: cx.request_id.clone(),
            request_hash: short_hash(&serde_json::to_value(&cx.request).unwrap_or(Value::Null)),
            method,
            params_hash: short_hash(&cx.request.params),
            client_ip: cx.identity.ip.clone(),
            user_id: cx.identity.user_id.clone(),
            success,
            data_size: response_text.len(),
            sensitivity,
            tags,
            findings: cx.response_findings.clone(),
            duration_ms: (now_ms - cx.started_at_ms).max(0),
        }
    }
}

/// First 16 hex chars of SHA-256 over the canonical (key-sorted) JSON form.
pub fn short_hash(value: &Value) -> String {
    let digest = Sha256::digest(canonical(value).to_string().as_bytes());
    hex::encode(digest)[..16].to_string()
}

fn canonical(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            Value::Object(
                keys.into_iter()
                    .map(|k| (k.clone(), canonical(&map[k])))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        other => other.clone(),
    }
}

fn security_tags(
    method: &str,
    response_text: &str,
    sensitivity: Sensitivity,
    success: bool,
    findings: &[Finding],
) -> Vec<String> {
    let method = method.to_lowercase();
    let body = response_text.to_lowercase();
    let contains_any = |needles: &[&str]| needles.iter().any(|n| body.contains(n));

    let mut tags = Vec::new();
    let mut tag = |cond: bool, name: &str| {
        if cond {
            tags.push(name.to_string());
        }
    };
    tag(method.contains("file"), "file_operation");
    tag(
        method.contains("network") || method.contains("http"),
        "network_operation",
    );
    tag(
        method.contains("execute") || method.contains("command"),
        "system_operation",
    );
    tag(sensitivity == Sensitivity::High, "sensitive_data");
    tag(contains_any(FILE_INDICATORS), "file_content");
    tag(contains_any(CODE_INDICATORS), "code_content");
    tag(contains_any(URL_INDICATORS), "url_content");
    tag(!success, "error_response");
    tag(response_text.len() > LARGE_RESPONSE_BYTES, "large_response");
    tag(
        findings.iter().any(|f| f.category == FilterCategory::SecretLeak),
        "secret_detected",
    );
    tags
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn write(&self, record: &AuditRecord) -> Result<(), InterceptError>;
}

/// Emits each record as one JSON line on the `audit` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    fn name(&self) -> &'static str {
        "tracing"
    }

    async fn write(&self, record: &AuditRecord) -> Result<(), InterceptError> {
        let line = serde_json::to_string(record)
            .map_err(|err| InterceptError::internal(&format!("audit encode: {err}")))?;
        info!(
            target: "audit",
            request_id = %record.request_id,
            method = %record.method,
            success = record.success,
            sensitivity = record.sensitivity.as_str(),
            record = %line,
            "audit record"
        );
        Ok(())
    }
}

/// Keeps the most recent `max_entries` records in a capped store list.
#[derive(Clone)]
pub struct StoreAuditSink {
    store: StoreHandle,
    max_entries: usize,
}

impl StoreAuditSink {
    pub fn new(store: StoreHandle, max_entries: usize) -> Self {
        Self { store, max_entries }
    }
}

#[async_trait]
impl AuditSink for StoreAuditSink {
    fn name(&self) -> &'static str {
        "store"
    }

    async fn write(&self, record: &AuditRecord) -> Result<(), InterceptError> {
        let line = serde_json::to_string(record)
            .map_err(|err| InterceptError::internal(&format!("audit encode: {err}")))?;
        self.store
            .push_capped(&StoreKeys::audit_log(), &line, self.max_entries)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::HookRequest;
    use serde_json::json;

    #[test]
    fn hashes_ignore_key_order() {
        let a = json!({"b": 1, "a": 2});
        let b: Value = serde_json::from_str(r#"{"a":2,"b":1}"#).unwrap();
        assert_eq!(short_hash(&a), short_hash(&b));
        assert_eq!(short_hash(&a).len(), 16);
    }

    #[test]
    fn record_carries_identity_and_tags() {
        let req = HookRequest::from_value(json!({
            "id": "req-1",
            "method": "read_file",
            "params": {"path": "/etc/hosts"},
            "client": {"ip": "10.1.2.3"},
            "auth": {"user_id": "alice"}
        }));
        let cx = InterceptContext::new(req, 1_000);
        let response = json!({"error": {"code": -32000, "message": "denied"}});
        let record = AuditRecord::build(&cx, &response, 1_250);

        assert_eq!(record.request_id, "req-1");
        assert_eq!(record.client_ip, "10.1.2.3");
        assert_eq!(record.user_id, "alice");
        assert!(!record.success);
        assert_eq!(record.duration_ms, 250);
        assert!(record.tags.contains(&"file_operation".to_string()));
        assert!(record.tags.contains(&"error_response".to_string()));
        assert_eq!(record.timestamp, "1970-01-01T00:00:01.250Z");
    }
}
