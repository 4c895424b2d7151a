use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use gateguard_interceptors::request::HookRequest;
use tracing::debug;

use super::context::CliContext;
use super::{read_input, write_stdout};

/// Exit status for a block decision.
pub const BLOCK_EXIT: u8 = 1;

#[derive(Args, Clone, Debug)]
pub struct BeforeArgs {
    /// Read the request from FILE instead of stdin
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Pretty-print the decision
    #[arg(long)]
    pub pretty: bool,
}

pub async fn cmd_before(args: BeforeArgs, ctx: &CliContext) -> Result<ExitCode> {
    let raw = read_input(args.input.as_deref()).await?;
    let service = ctx.service().await?;
    let request = HookRequest::from_slice(&raw);

    let outcome = service.chain().before(request).await;
    debug!(
        request_id = %outcome.context.request_id,
        action = ?outcome.decision.action,
        reason = %outcome.decision.reason,
        "before hook decided"
    );

    let output = outcome.to_hook_output();
    let rendered = if args.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        output.to_string()
    };
    write_stdout(format!("{rendered}\n").as_bytes()).await?;

    Ok(if outcome.is_block() {
        ExitCode::from(BLOCK_EXIT)
    } else {
        ExitCode::SUCCESS
    })
}
