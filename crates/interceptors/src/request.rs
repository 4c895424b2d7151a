use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const UNKNOWN_IP: &str = "unknown";
pub const ANONYMOUS_USER: &str = "anonymous";
pub const NO_API_KEY: &str = "none";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_hash: Option<String>,
}

/// Before-hook input. Every field is optional on the wire; gaps are filled in
/// by [`HookRequest::identity`] rather than rejected.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HookRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub client: ClientInfo,
    #[serde(default)]
    pub auth: AuthInfo,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub ip: String,
    pub user_id: String,
    pub api_key_hash: String,
    /// Client address missing or unparsable.
    pub malformed: bool,
}

impl Identity {
    pub fn is_anonymous(&self) -> bool {
        self.user_id == ANONYMOUS_USER
    }
}

impl HookRequest {
    /// Never fails: input that does not fit the request shape becomes an
    /// unidentified request carrying the raw value as params.
    pub fn from_value(value: Value) -> Self {
        if !value.is_object() {
            return Self {
                params: value,
                ..Self::default()
            };
        }
        match serde_json::from_value::<HookRequest>(value.clone()) {
            Ok(req) => req,
            Err(_) => Self {
                params: value,
                ..Self::default()
            },
        }
    }

    pub fn from_slice(raw: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(raw) {
            Ok(value) => Self::from_value(value),
            Err(_) => Self {
                params: Value::String(String::from_utf8_lossy(raw).into_owned()),
                ..Self::default()
            },
        }
    }

    pub fn method(&self) -> &str {
        self.method.as_deref().unwrap_or("unknown")
    }

    pub fn identity(&self) -> Identity {
        let ip = self
            .client
            .ip
            .as_deref()
            .map(str::trim)
            .filter(|ip| ip.parse::<IpAddr>().is_ok());
        Identity {
            ip: ip.unwrap_or(UNKNOWN_IP).to_string(),
            user_id: non_empty(self.auth.user_id.as_deref()).unwrap_or(ANONYMOUS_USER).to_string(),
            api_key_hash: non_empty(self.auth.api_key_hash.as_deref())
                .unwrap_or(NO_API_KEY)
                .to_string(),
            malformed: ip.is_none(),
        }
    }

    /// The part of the request the content filter and risk scorer look at.
    pub fn payload_text(&self) -> String {
        json!({ "method": self.method(), "params": self.params }).to_string()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
