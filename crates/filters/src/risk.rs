use std::collections::HashSet;

use gateguard_types::FilterCategory;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::scanner::ContentFilter;

pub const MAX_SCORE: f64 = 10.0;

const PATTERN_WEIGHT: f64 = 2.0;
const KEYWORD_WEIGHT: f64 = 1.5;
const LONG_TEXT_CHARS: usize = 5000;
const SPECIAL_CHAR_RATIO: f64 = 0.3;
const REPETITION_MIN_WORDS: usize = 50;
const HIGH_RISK_TOOL_WEIGHT: f64 = 2.0;
const PARAMS_WEIGHT: f64 = 0.5;

const RISK_KEYWORDS: &[&str] = &[
    "sudo",
    "chmod",
    "chown",
    "rm -rf",
    "format",
    "delete",
    "drop table",
    "union select",
    "script>",
    "javascript:",
    "eval(",
    "exec(",
    "system(",
    "shell_exec",
    "passthru",
    "proc_open",
    "base64_decode",
    "unserialize",
    "include",
    "require",
];

const HIGH_RISK_TOOLS: &[&str] = &[
    "execute_command",
    "run_shell",
    "file_write",
    "file_read",
    "system_call",
    "eval_code",
    "docker_exec",
    "kubectl_apply",
];

static SPECIAL_CHAR: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"[^\w\s]").ok());

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub content: f64,
    pub context: f64,
    pub total: f64,
}

/// Heuristic prompt-injection scorer. Scores are additive and capped at
/// [`MAX_SCORE`] per text.
#[derive(Clone, Debug)]
pub struct RiskScorer {
    patterns: Vec<Regex>,
}

impl RiskScorer {
    pub fn new(patterns: Vec<Regex>) -> Self {
        Self { patterns }
    }

    /// Uses the filter's prompt-injection rules as the pattern set.
    pub fn from_filter(filter: &ContentFilter) -> Self {
        Self::new(
            filter
                .rules_in(FilterCategory::PromptInjection)
                .map(|rule| rule.pattern.clone())
                .collect(),
        )
    }

    pub fn score(&self, text: &str) -> f64 {
        if text.is_empty() {
            return 0.0;
        }
        let lowered = text.to_lowercase();
        let mut score = 0.0;

        let pattern_hits: usize = self
            .patterns
            .iter()
            .map(|re| re.find_iter(&lowered).count())
            .sum();
        score += pattern_hits as f64 * PATTERN_WEIGHT;

        let keyword_hits: usize = RISK_KEYWORDS
            .iter()
            .map(|kw| lowered.matches(kw).count())
            .sum();
        score += keyword_hits as f64 * KEYWORD_WEIGHT;

        let char_count = text.chars().count();
        if char_count > LONG_TEXT_CHARS {
            score += 1.0;
        }

        if let Some(re) = SPECIAL_CHAR.as_ref() {
            let specials = re.find_iter(text).count();
            if specials as f64 / char_count as f64 > SPECIAL_CHAR_RATIO {
                score += 1.0;
            }
        }

        let words: Vec<&str> = lowered.split_whitespace().collect();
        if words.len() > REPETITION_MIN_WORDS {
            let distinct: HashSet<&str> = words.iter().copied().collect();
            if distinct.len() != words.len() {
                score += 1.0;
            }
        }

        score.min(MAX_SCORE)
    }

    pub fn tool_context(&self, method: &str, params: &Value) -> f64 {
        let mut risk = 0.0;
        if HIGH_RISK_TOOLS.contains(&method) {
            risk += HIGH_RISK_TOOL_WEIGHT;
        }
        risk + self.score(&params.to_string()) * PARAMS_WEIGHT
    }

    /// Content score of the serialized request plus the tool context score.
    pub fn assess(&self, request_text: &str, method: &str, params: &Value) -> RiskAssessment {
        let content = self.score(request_text);
        let context = self.tool_context(method, params);
        RiskAssessment {
            content,
            context,
            total: content + context,
        }
    }
}
