use gateguard_errors::prelude::*;
use serde_json::json;

#[test]
fn public_view_hides_operator_detail() {
    let err = ErrorBuilder::new(codes::STORE_UNAVAILABLE)
        .dev_msg("redis connect: connection refused (127.0.0.1:6379)")
        .meta_kv("op", json!("admit"))
        .build();

    let public_view = err.to_public();
    assert_eq!(public_view.code, "STORE.UNAVAILABLE");
    assert_eq!(
        public_view.message,
        "Service temporarily unavailable. Please retry later."
    );
    let rendered = serde_json::to_string(&public_view).unwrap();
    assert!(!rendered.contains("6379"));
    assert_eq!(err.meta_str("op"), Some("admit"));
}

#[test]
fn display_prefers_the_developer_message() {
    let err = ErrorBuilder::new(codes::FILTER_RULE_INVALID)
        .dev_msg("email: unclosed group")
        .build();
    assert_eq!(err.to_string(), "FILTER.RULE_INVALID: email: unclosed group");
    assert_eq!(err.kind, ErrorKind::Config);
    assert_eq!(err.severity, ErrorSeverity::Critical);

    let plain = ErrorBuilder::new(codes::QUOTA_BLOCKED).build();
    assert_eq!(
        plain.to_string(),
        "QUOTA.BLOCKED: Temporarily blocked. Please retry later."
    );
}

#[test]
fn rate_limit_codes_map_to_429() {
    assert_eq!(ErrorBuilder::new(codes::QUOTA_RATELIMIT).build().http_status, 429);
    assert_eq!(ErrorBuilder::new(codes::QUOTA_BLOCKED).build().http_status, 429);
    assert_eq!(codes::POLICY_CONTENT_BLOCKED.spec().http_status, 403);
    assert!(ErrorBuilder::new(codes::STORE_TIMEOUT).build().is_transient());
    assert!(!ErrorBuilder::new(codes::CONFIG_INVALID).build().is_transient());
}

#[test]
fn every_code_is_registered_once() {
    let mut seen: Vec<&str> = all_specs().map(|spec| spec.code.as_str()).collect();
    let total = seen.len();
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), total);
    assert_eq!(total, 10);
}

#[test]
fn unknown_code_deserializes_to_internal() {
    let code: ErrorCode = serde_json::from_str("\"NOPE.MISSING\"").unwrap();
    assert_eq!(code, codes::UNKNOWN_INTERNAL);
    let code: ErrorCode = serde_json::from_str("\"QUOTA.BLOCKED\"").unwrap();
    assert_eq!(code, codes::QUOTA_BLOCKED);
    assert_eq!(spec_of(ErrorCode("NOPE.MISSING")).http_status, 500);
}
