use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::config::GuardConfig;
use crate::service::GuardService;

pub struct CliContext {
    config: GuardConfig,
    config_path: PathBuf,
}

impl CliContext {
    pub fn new(config: GuardConfig, config_path: PathBuf) -> Self {
        Self {
            config,
            config_path,
        }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Connects the store and assembles the chain for one command.
    pub async fn service(&self) -> Result<GuardService> {
        GuardService::connect(self.config.clone()).await
    }
}
