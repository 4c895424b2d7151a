use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use super::context::CliContext;
use super::{read_input, write_stdout};
use crate::hook::{render_response, AfterInput};

#[derive(Args, Clone, Debug)]
pub struct AfterArgs {
    /// Read the response (or `{request, response}` envelope) from FILE instead of stdin
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,
}

pub async fn cmd_after(args: AfterArgs, ctx: &CliContext) -> Result<ExitCode> {
    let raw = read_input(args.input.as_deref()).await?;
    let service = ctx.service().await?;
    let input = AfterInput::parse(&raw);
    let pass_through = input.passes_through(ctx.config().filters.redact_responses);

    let chain = service.chain();
    let mut cx = chain.context(input.request);
    let response = chain.after(&mut cx, input.response).await;

    if pass_through {
        write_stdout(&raw).await?;
    } else {
        write_stdout(render_response(&response).as_bytes()).await?;
    }
    Ok(ExitCode::SUCCESS)
}
