use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use super::context::CliContext;
use crate::server::{serve, AppState};

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Address to listen on (overrides `server.bind`)
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,
}

pub async fn cmd_serve(args: ServeArgs, ctx: &CliContext) -> Result<ExitCode> {
    let bind = args
        .bind
        .unwrap_or_else(|| ctx.config().server.bind.clone());
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("Invalid bind address `{bind}`"))?;

    let service = ctx.service().await?;
    info!(config = %ctx.config_path().display(), "hook service ready");
    let state = Arc::new(AppState::new(service)?);
    serve(state, addr).await?;
    Ok(ExitCode::SUCCESS)
}
