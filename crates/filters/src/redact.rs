use std::collections::BTreeSet;
use std::sync::Arc;

use gateguard_types::Finding;
use regex::Captures;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::rule::{FilterRule, VALUE_GROUP};
use crate::scanner::ContentFilter;

pub const TRUNCATION_MARKER: &str = "\n[TRUNCATED - response too large]";

/// Replaces matched secrets and PII with stable, non-reversible tokens.
#[derive(Clone, Debug)]
pub struct Redactor {
    filter: Arc<ContentFilter>,
    max_bytes: Option<usize>,
}

impl Redactor {
    pub fn new(filter: Arc<ContentFilter>) -> Self {
        Self {
            filter,
            max_bytes: None,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = Some(max_bytes).filter(|n| *n > 0);
        self
    }

    /// Redacts every match of the rules named in `findings`. Prompt-injection
    /// findings are left in place.
    pub fn redact(&self, text: &str, findings: &[Finding]) -> String {
        let names: BTreeSet<&str> = findings.iter().map(|f| f.rule.as_str()).collect();
        let mut out = self.truncate(text);
        for rule in self.filter.rules() {
            if !rule.redacts() || !names.contains(rule.name.as_str()) {
                continue;
            }
            out = redact_rule(rule, &out);
        }
        out
    }

    /// Scans then redacts in one pass; returns the findings alongside.
    pub fn sanitize(&self, text: &str) -> (String, Vec<Finding>) {
        let findings = self.filter.scan(text);
        if findings.iter().all(|f| !is_redactable(&self.filter, f)) {
            return (self.truncate(text), findings);
        }
        let redacted = self.redact(text, &findings);
        info!(target: "secrets", count = findings.len(), "response redacted");
        (redacted, findings)
    }

    fn truncate(&self, text: &str) -> String {
        match self.max_bytes {
            Some(max) if text.len() > max => {
                let mut cut = max;
                while !text.is_char_boundary(cut) {
                    cut -= 1;
                }
                info!(target: "secrets", size = text.len(), max, "response truncated");
                format!("{}{TRUNCATION_MARKER}", &text[..cut])
            }
            _ => text.to_string(),
        }
    }
}

fn is_redactable(filter: &ContentFilter, finding: &Finding) -> bool {
    filter.rule(&finding.rule).map(FilterRule::redacts).unwrap_or(false)
}

fn redact_rule(rule: &FilterRule, text: &str) -> String {
    rule.pattern
        .replace_all(text, |caps: &Captures<'_>| {
            let Some(whole) = caps.get(0) else {
                return String::new();
            };
            match caps.name(VALUE_GROUP) {
                Some(value) => {
                    let start = value.start() - whole.start();
                    let end = value.end() - whole.start();
                    let raw = whole.as_str();
                    format!(
                        "{}{}{}",
                        &raw[..start],
                        token(&rule.name, value.as_str()),
                        &raw[end..]
                    )
                }
                None => token(&rule.name, whole.as_str()),
            }
        })
        .into_owned()
}

pub fn token(rule: &str, secret: &str) -> String {
    let digest = hex::encode(Sha256::digest(secret.as_bytes()));
    format!("[REDACTED_{}_{}]", rule.to_ascii_uppercase(), &digest[..8])
}
