pub mod after;
pub mod app;
pub mod before;
pub mod commands;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod runtime;
pub mod scan;
pub mod serve;

pub use after::{cmd_after, AfterArgs};
pub use before::{cmd_before, BeforeArgs};
pub use scan::{cmd_scan, ScanArgs};
pub use serve::{cmd_serve, ServeArgs};

use std::path::Path;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Reads the whole payload from `path`, or stdin when none is given.
pub(crate) async fn read_input(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buf)
                .await
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

pub(crate) async fn write_stdout(bytes: &[u8]) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(bytes).await?;
    stdout.flush().await?;
    Ok(())
}
