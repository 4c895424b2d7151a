use std::process::ExitCode;

use anyhow::Result;

use super::after::cmd_after;
use super::before::cmd_before;
use super::env::CliArgs;
use super::scan::cmd_scan;
use super::serve::cmd_serve;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<ExitCode> {
    match cli.command.clone() {
        Commands::Before(args) => cmd_before(args, ctx).await,
        Commands::After(args) => cmd_after(args, ctx).await,
        Commands::Scan(args) => cmd_scan(args, ctx).await,
        Commands::Serve(args) => cmd_serve(args, ctx).await,
    }
}
