//! Service configuration: defaults, then the YAML file, then environment
//! variables, then validation.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use gateguard_errors::prelude::*;
use gateguard_filters::{FilterAction, SeverityPolicy};
use gateguard_interceptors::settings::{FilterSettings, LimitSettings};
use gateguard_quota::FailPolicy;
use gateguard_store::{StoreBackend, StoreConfig};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ConfigError(pub Box<ErrorObj>);

impl ConfigError {
    pub fn invalid(key: &str, msg: &str) -> Self {
        let obj = ErrorBuilder::new(codes::CONFIG_INVALID)
            .user_msg("Service configuration is invalid.")
            .dev_msg(format!("{key}: {msg}"))
            .meta_kv("key", json!(key))
            .build();
        Self(Box::new(obj))
    }

    pub fn key(&self) -> Option<&str> {
        self.0.meta_str("key")
    }

    pub fn into_inner(self) -> ErrorObj {
        *self.0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub backend: StoreBackend,
    pub url: String,
    pub password: Option<String>,
    pub prefix: String,
    pub timeout_ms: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            url: "redis://127.0.0.1:6379".into(),
            password: None,
            prefix: "gateguard".into(),
            timeout_ms: 50,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsSection {
    pub global: u64,
    pub per_ip: u64,
    pub per_user: u64,
    pub unknown: u64,
    pub window_seconds: u64,
    pub block_duration: u64,
    pub global_cooldown: u64,
    pub fail_policy: FailPolicy,
}

impl Default for LimitsSection {
    fn default() -> Self {
        let defaults = LimitSettings::default();
        Self {
            global: defaults.global_limit,
            per_ip: defaults.per_ip_limit,
            per_user: defaults.per_user_limit,
            unknown: defaults.unknown_limit,
            window_seconds: defaults.window.as_secs(),
            block_duration: defaults.block_duration.as_secs(),
            global_cooldown: defaults.global_cooldown.as_secs(),
            fail_policy: defaults.fail_policy,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FiltersSection {
    pub on_info: FilterAction,
    pub on_warning: FilterAction,
    pub on_critical: FilterAction,
    pub risk_threshold: f64,
    pub redact_responses: bool,
    pub max_response_bytes: usize,
    /// Extra YAML rules merged over the built-in tables.
    pub rules_path: Option<PathBuf>,
}

impl Default for FiltersSection {
    fn default() -> Self {
        let defaults = FilterSettings::default();
        Self {
            on_info: defaults.severity_policy.info,
            on_warning: defaults.severity_policy.warning,
            on_critical: defaults.severity_policy.critical,
            risk_threshold: defaults.risk_threshold,
            redact_responses: defaults.redact_responses,
            max_response_bytes: defaults.max_response_bytes,
            rules_path: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSection {
    /// Records kept in the store list; `0` disables the store sink.
    pub max_entries: usize,
}

impl Default for AuditSection {
    fn default() -> Self {
        Self { max_entries: 1000 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
    pub downstream_timeout_ms: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".into(),
            downstream_timeout_ms: 30_000,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub store: StoreSection,
    pub limits: LimitsSection,
    pub filters: FiltersSection,
    pub audit: AuditSection,
    pub server: ServerSection,
}

impl GuardConfig {
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|err| ConfigError::invalid("file", &err.to_string()))
    }

    /// Applies overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| env::var(key).ok())
    }

    /// Applies overrides from `lookup`; empty values are ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(raw) = get("STORE_BACKEND") {
            self.store.backend = match raw.trim().to_ascii_lowercase().as_str() {
                "memory" => StoreBackend::Memory,
                "redis" => StoreBackend::Redis,
                other => {
                    return Err(ConfigError::invalid(
                        "STORE_BACKEND",
                        &format!("unknown backend `{other}` (expected memory|redis)"),
                    ))
                }
            };
        }
        if let Some(url) = get("REDIS_URL") {
            self.store.url = url;
        }
        if let Some(password) = get("REDIS_PASSWORD") {
            self.store.password = Some(password);
        }
        if let Some(prefix) = get("STORE_PREFIX") {
            self.store.prefix = prefix;
        }
        parse_into(&get, "STORE_TIMEOUT_MS", &mut self.store.timeout_ms)?;

        parse_into(&get, "GLOBAL_LIMIT", &mut self.limits.global)?;
        parse_into(&get, "PER_IP_LIMIT", &mut self.limits.per_ip)?;
        parse_into(&get, "PER_USER_LIMIT", &mut self.limits.per_user)?;
        parse_into(&get, "UNKNOWN_LIMIT", &mut self.limits.unknown)?;
        parse_into(&get, "WINDOW_SECONDS", &mut self.limits.window_seconds)?;
        parse_into(&get, "BLOCK_DURATION", &mut self.limits.block_duration)?;
        parse_into(&get, "GLOBAL_COOLDOWN", &mut self.limits.global_cooldown)?;
        parse_into(&get, "FAIL_POLICY", &mut self.limits.fail_policy)?;

        parse_into(&get, "FILTER_ON_INFO", &mut self.filters.on_info)?;
        parse_into(&get, "FILTER_ON_WARNING", &mut self.filters.on_warning)?;
        parse_into(&get, "FILTER_ON_CRITICAL", &mut self.filters.on_critical)?;
        parse_into(&get, "RISK_THRESHOLD", &mut self.filters.risk_threshold)?;
        if let Some(raw) = get("REDACT_RESPONSES") {
            self.filters.redact_responses = parse_bool("REDACT_RESPONSES", &raw)?;
        }
        parse_into(&get, "MAX_RESPONSE_BYTES", &mut self.filters.max_response_bytes)?;
        if let Some(path) = get("FILTER_RULES_PATH") {
            self.filters.rules_path = Some(PathBuf::from(path));
        }

        parse_into(&get, "AUDIT_MAX_ENTRIES", &mut self.audit.max_entries)?;
        if let Some(bind) = get("GATEGUARD_BIND") {
            self.server.bind = bind;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.window_seconds == 0 {
            return Err(ConfigError::invalid(
                "WINDOW_SECONDS",
                "window must be at least one second",
            ));
        }
        if self.store.timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "STORE_TIMEOUT_MS",
                "store timeout must be positive",
            ));
        }
        if self.store.backend == StoreBackend::Redis && self.store.url.trim().is_empty() {
            return Err(ConfigError::invalid(
                "REDIS_URL",
                "redis backend needs a connection url",
            ));
        }
        if !self.filters.risk_threshold.is_finite() || self.filters.risk_threshold < 0.0 {
            return Err(ConfigError::invalid(
                "RISK_THRESHOLD",
                "threshold must be a non-negative number",
            ));
        }
        if self.filters.max_response_bytes == 0 {
            return Err(ConfigError::invalid(
                "MAX_RESPONSE_BYTES",
                "response size cap must be positive",
            ));
        }
        Ok(())
    }

    pub fn store_config(&self) -> StoreConfig {
        let base = match self.store.backend {
            StoreBackend::Memory => StoreConfig::memory(),
            StoreBackend::Redis => StoreConfig::redis(self.store.url.clone()),
        };
        base.with_prefix(self.store.prefix.clone())
            .with_password(self.store.password.clone())
            .with_timeout(Duration::from_millis(self.store.timeout_ms))
    }

    pub fn limit_settings(&self) -> LimitSettings {
        LimitSettings {
            global_limit: self.limits.global,
            per_ip_limit: self.limits.per_ip,
            per_user_limit: self.limits.per_user,
            unknown_limit: self.limits.unknown,
            window: Duration::from_secs(self.limits.window_seconds),
            block_duration: Duration::from_secs(self.limits.block_duration),
            global_cooldown: Duration::from_secs(self.limits.global_cooldown),
            fail_policy: self.limits.fail_policy,
        }
    }

    pub fn filter_settings(&self) -> FilterSettings {
        FilterSettings {
            severity_policy: SeverityPolicy {
                info: self.filters.on_info,
                warning: self.filters.on_warning,
                critical: self.filters.on_critical,
            },
            risk_threshold: self.filters.risk_threshold,
            redact_responses: self.filters.redact_responses,
            max_response_bytes: self.filters.max_response_bytes,
        }
    }

    pub fn downstream_timeout(&self) -> Duration {
        Duration::from_millis(self.server.downstream_timeout_ms)
    }
}

fn parse_into<T, G>(get: &G, key: &str, slot: &mut T) -> Result<(), ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    if let Some(raw) = get(key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|err: T::Err| ConfigError::invalid(key, &format!("`{raw}`: {err}")))?;
    }
    Ok(())
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::invalid(
            key,
            &format!("`{other}` is not a boolean"),
        )),
    }
}
