use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use gateguard_filters::policy::block_reason;
use gateguard_filters::{classify, load_rules_file, ContentFilter, RiskScorer};
use serde_json::json;

use super::context::CliContext;
use super::{read_input, write_stdout};
use crate::service::load_filter;

#[derive(Args, Clone, Debug)]
pub struct ScanArgs {
    /// Scan TEXT instead of reading stdin
    #[arg(long, value_name = "TEXT", conflicts_with = "input")]
    pub text: Option<String>,

    /// Read the payload from FILE instead of stdin
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Scan with this rules file only, skipping the built-in tables
    #[arg(long, value_name = "FILE")]
    pub rules: Option<PathBuf>,
}

pub async fn cmd_scan(args: ScanArgs, ctx: &CliContext) -> Result<ExitCode> {
    let text = match args.text {
        Some(text) => text,
        None => String::from_utf8_lossy(&read_input(args.input.as_deref()).await?).into_owned(),
    };
    let filter = match args.rules.as_deref() {
        Some(path) => ContentFilter::new(load_rules_file(path)?),
        None => load_filter(ctx.config())?,
    };
    let scorer = RiskScorer::from_filter(&filter);

    let findings = filter.scan(&text);
    let policy = ctx.config().filter_settings().severity_policy;
    let blocked_by = policy.blocking(&findings).map(|finding| {
        json!({
            "rule": finding.rule,
            "reason": block_reason(finding),
        })
    });

    let report = json!({
        "findings": findings,
        "risk_score": scorer.score(&text),
        "sensitivity": classify(&text),
        "blocked_by": blocked_by,
    });
    write_stdout(format!("{}\n", serde_json::to_string_pretty(&report)?).as_bytes()).await?;
    Ok(ExitCode::SUCCESS)
}
