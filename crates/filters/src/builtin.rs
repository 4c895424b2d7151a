use gateguard_types::{FilterCategory, Severity};

use crate::errors::FilterError;
use crate::rule::FilterRule;

type RuleDef = (&'static str, &'static str, Severity);

const SECRET_RULES: &[RuleDef] = &[
    ("openai_key", r"\bsk-[A-Za-z0-9]{48}\b", Severity::Critical),
    ("github_token", r"\bghp_[A-Za-z0-9]{36}\b", Severity::Critical),
    ("gitlab_token", r"\bglpat-[A-Za-z0-9_\-]{20}\b", Severity::Critical),
    ("aws_access_key", r"\bAKIA[0-9A-Z]{16}\b", Severity::Critical),
    (
        "private_key",
        r"-----BEGIN [A-Z ]+ KEY-----[\s\S]*?-----END [A-Z ]+ KEY-----",
        Severity::Critical,
    ),
    ("database_url", r"(?i)\b(?:mysql|postgres(?:ql)?|mongodb)://[^\s\x22']+", Severity::Warning),
    ("jdbc_url", r"\bjdbc:[^\s\x22']+", Severity::Warning),
    (
        "password",
        r#"(?i)\b(?:password|passwd|pwd)\s*[:=]\s*["']?(?P<value>[^\s"',]+)"#,
        Severity::Warning,
    ),
    (
        "secret",
        r#"(?i)\b(?:secret|api[_-]?key)\s*[:=]\s*["']?(?P<value>[^\s"',]+)"#,
        Severity::Warning,
    ),
];

const INJECTION_RULES: &[RuleDef] = &[
    (
        "instruction_override",
        r"(?i)(ignore|forget|disregard).*(previous|above|earlier).*(instruction|prompt|rule)",
        Severity::Critical,
    ),
    ("privilege_mode", r"(?i)(system|admin|root|developer).*(mode|access|privilege)", Severity::Warning),
    ("code_execution", r"(?i)(execute|run|eval|exec).*(command|code|script)", Severity::Warning),
    (
        "role_manipulation",
        r"(?i)you.*(are|act|behave|pretend).*(now|as).*(admin|root|system|developer)",
        Severity::Warning,
    ),
    ("persona_swap", r"(?i)(new|different|updated).*(role|persona|character|identity)", Severity::Warning),
    ("context_escape", r"(?i)(break|exit|escape).*(out|from).*(context|sandbox|container)", Severity::Warning),
    ("jailbreak", r"(?i)\b(jailbreak|bypass|override|circumvent)\b", Severity::Warning),
    (
        "secret_reveal",
        r"(?i)(reveal|show|display|print).*(secret|key|password|token|credential)",
        Severity::Warning,
    ),
    ("enumeration", r"(?i)(list|enumerate|dump).*(file|directory|user|process)", Severity::Warning),
    ("urgency_override", r"(?i)(emergency|urgent|critical).*(override|bypass|exception)", Severity::Warning),
    ("debug_mode", r"(?i)(test|debug|maintenance).*(mode|access|privilege)", Severity::Warning),
    (
        "encoding_smuggle",
        r"(?i)(translate|convert|encode|decode).*(to|into).*(code|script|command)",
        Severity::Warning,
    ),
    ("container_exec", r"(?i)(docker|container|kubernetes|k8s).*(exec|run|shell|bash)", Severity::Warning),
    ("host_mount", r"(?i)(mount|volume|bind).*(host|filesystem|directory)", Severity::Warning),
    (
        "filesystem_access",
        r"(?i)(read|write|delete|modify).*(file|directory|path).*(/|\\|\.\.)",
        Severity::Warning,
    ),
    (
        "network_transfer",
        r"(?i)(curl|wget|http|ftp|ssh).*(download|upload|connect|request)",
        Severity::Warning,
    ),
];

const PII_RULES: &[RuleDef] = &[
    ("email", r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b", Severity::Info),
    (
        "phone",
        r"\b(?:\+?1[-.]?)?\(?[0-9]{3}\)?[-.]?[0-9]{3}[-.]?[0-9]{4}\b",
        Severity::Info,
    ),
    ("ssn", r"\b\d{3}[- ]\d{2}[- ]\d{4}\b", Severity::Warning),
    (
        "card_number",
        r"\b(?:4[0-9]{12}(?:[0-9]{3})?|5[1-5][0-9]{14}|3[47][0-9]{13})\b",
        Severity::Warning,
    ),
];

fn compile_set(defs: &[RuleDef], category: FilterCategory) -> Result<Vec<FilterRule>, FilterError> {
    defs.iter()
        .map(|(name, pattern, severity)| FilterRule::compile(name, pattern, category, *severity))
        .collect()
}

pub fn secret_rules() -> Result<Vec<FilterRule>, FilterError> {
    compile_set(SECRET_RULES, FilterCategory::SecretLeak)
}

pub fn injection_rules() -> Result<Vec<FilterRule>, FilterError> {
    compile_set(INJECTION_RULES, FilterCategory::PromptInjection)
}

pub fn pii_rules() -> Result<Vec<FilterRule>, FilterError> {
    compile_set(PII_RULES, FilterCategory::Pii)
}

pub fn all_rules() -> Result<Vec<FilterRule>, FilterError> {
    let mut rules = secret_rules()?;
    rules.extend(injection_rules()?);
    rules.extend(pii_rules()?);
    Ok(rules)
}
