pub mod builtin;
pub mod errors;
pub mod policy;
pub mod redact;
pub mod risk;
pub mod rule;
pub mod scanner;
pub mod sensitivity;

pub use errors::FilterError;
pub use policy::{FilterAction, SeverityPolicy};
pub use redact::Redactor;
pub use risk::{RiskAssessment, RiskScorer};
pub use rule::{load_rules_file, FilterRule, RuleSpec};
pub use scanner::ContentFilter;
pub use sensitivity::classify;
