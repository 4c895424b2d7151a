use gateguard_types::RateLimitScope;

/// Builds the logical keys used by the quota and audit layers. Backends add
/// their own namespace prefix on top.
#[derive(Clone, Copy, Debug, Default)]
pub struct StoreKeys;

impl StoreKeys {
    pub fn window(scope: &RateLimitScope) -> String {
        format!("rl:{}:{}", scope.kind.as_str(), scope.key)
    }

    pub fn block(scope_key: &str) -> String {
        format!("block:{scope_key}")
    }

    pub fn audit_log() -> String {
        "audit:log".to_string()
    }
}
