use gateguard_interceptors::request::HookRequest;
use serde_json::Value;

/// After-hook input: either a bare response or a `{request, response}`
/// envelope that ties the response back to its request.
#[derive(Clone, Debug, PartialEq)]
pub struct AfterInput {
    pub request: HookRequest,
    pub response: Value,
    pub enveloped: bool,
}

impl AfterInput {
    pub fn parse(raw: &[u8]) -> Self {
        let value = match serde_json::from_slice::<Value>(raw) {
            Ok(value) => value,
            Err(_) => {
                return Self {
                    request: HookRequest::default(),
                    response: Value::String(String::from_utf8_lossy(raw).into_owned()),
                    enveloped: false,
                }
            }
        };

        match value {
            Value::Object(mut map) if map.contains_key("request") && map.contains_key("response") => {
                let request = map
                    .remove("request")
                    .map(HookRequest::from_value)
                    .unwrap_or_default();
                let response = map.remove("response").unwrap_or(Value::Null);
                Self {
                    request,
                    response,
                    enveloped: true,
                }
            }
            other => Self {
                request: HookRequest::default(),
                response: other,
                enveloped: false,
            },
        }
    }

    /// A bare response goes back out byte for byte unless redaction is on.
    pub fn passes_through(&self, redact: bool) -> bool {
        !self.enveloped && !redact
    }
}

/// Text form of a response: strings verbatim, everything else as JSON.
pub fn render_response(response: &Value) -> String {
    match response {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_carries_request_identity() {
        let raw = json!({
            "request": {"method": "read_file", "client": {"ip": "10.0.0.4"}},
            "response": {"content": "ok"}
        })
        .to_string();
        let input = AfterInput::parse(raw.as_bytes());
        assert!(input.enveloped);
        assert_eq!(input.request.method(), "read_file");
        assert_eq!(input.response, json!({"content": "ok"}));
    }

    #[test]
    fn plain_text_becomes_a_string_response() {
        let input = AfterInput::parse(b"total 0\ndrwxr-xr-x  2 root root");
        assert!(!input.enveloped);
        assert_eq!(render_response(&input.response), "total 0\ndrwxr-xr-x  2 root root");
    }

    #[test]
    fn json_without_envelope_keys_is_the_response() {
        let input = AfterInput::parse(br#"{"response": 1}"#);
        assert!(!input.enveloped);
        assert_eq!(input.response, json!({"response": 1}));
    }

    #[test]
    fn only_bare_unredacted_responses_pass_through() {
        let bare = AfterInput::parse(b"plain");
        assert!(bare.passes_through(false));
        assert!(!bare.passes_through(true));

        let envelope = AfterInput::parse(br#"{"request": {}, "response": "x"}"#);
        assert!(!envelope.passes_through(false));
    }
}
