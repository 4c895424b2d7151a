use gateguard_types::Sensitivity;

const HIGH: &[&str] = &[
    "password",
    "secret",
    "token",
    "key",
    "credential",
    "private_key",
    "api_key",
    "auth_token",
    "session_id",
    "credit_card",
    "ssn",
    "social_security",
];

const MEDIUM: &[&str] = &[
    "email", "phone", "address", "name", "user", "account", "personal", "private",
];

/// Keyword-based sensitivity of a payload, used to tag audit records.
pub fn classify(text: &str) -> Sensitivity {
    let lowered = text.to_lowercase();
    if HIGH.iter().any(|kw| lowered.contains(kw)) {
        Sensitivity::High
    } else if MEDIUM.iter().any(|kw| lowered.contains(kw)) {
        Sensitivity::Medium
    } else {
        Sensitivity::Low
    }
}
