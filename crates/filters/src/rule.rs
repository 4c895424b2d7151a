use std::path::Path;

use gateguard_types::{FilterCategory, Severity};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::FilterError;

/// Named capture that, when present, limits redaction to the captured part of
/// a match (for `key=value` style rules).
pub const VALUE_GROUP: &str = "value";

#[derive(Clone, Debug)]
pub struct FilterRule {
    pub name: String,
    pub pattern: Regex,
    pub category: FilterCategory,
    pub severity: Severity,
}

impl FilterRule {
    pub fn compile(
        name: &str,
        pattern: &str,
        category: FilterCategory,
        severity: Severity,
    ) -> Result<Self, FilterError> {
        let pattern =
            Regex::new(pattern).map_err(|err| FilterError::invalid_rule(name, &err.to_string()))?;
        Ok(Self {
            name: name.to_string(),
            pattern,
            category,
            severity,
        })
    }

    pub fn redacts(&self) -> bool {
        !matches!(self.category, FilterCategory::PromptInjection)
    }
}

/// On-disk form of a rule.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleSpec {
    pub name: String,
    pub pattern: String,
    pub category: FilterCategory,
    pub severity: Severity,
}

impl RuleSpec {
    pub fn compile(&self) -> Result<FilterRule, FilterError> {
        if self.name.trim().is_empty() {
            return Err(FilterError::invalid_rule("<unnamed>", "rule name is empty"));
        }
        FilterRule::compile(&self.name, &self.pattern, self.category, self.severity)
    }
}

#[derive(Debug, Default, Deserialize)]
struct RulesFile {
    #[serde(default)]
    rules: Vec<RuleSpec>,
}

pub fn parse_rules(yaml: &str, origin: &str) -> Result<Vec<FilterRule>, FilterError> {
    let file: RulesFile = serde_yaml::from_str(yaml)
        .map_err(|err| FilterError::rules_file(origin, &err.to_string()))?;
    file.rules.iter().map(RuleSpec::compile).collect()
}

pub fn load_rules_file(path: &Path) -> Result<Vec<FilterRule>, FilterError> {
    let origin = path.display().to_string();
    let raw = std::fs::read_to_string(path)
        .map_err(|err| FilterError::rules_file(&origin, &err.to_string()))?;
    parse_rules(&raw, &origin)
}
