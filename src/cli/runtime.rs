use std::env;
use std::fs as stdfs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use super::env::LogFormat;
use crate::config::GuardConfig;

pub const LOCAL_ENV_PATH: &str = "config/local.env";
pub const DEFAULT_CONFIG_PATH: &str = "config/gateguard.yaml";

/// Outcome of reading `config/local.env`. Collected before tracing is
/// installed and logged afterwards.
#[derive(Debug, Default)]
pub struct LocalEnvReport {
    pub path: Option<PathBuf>,
    pub applied: usize,
    pub skipped_lines: Vec<usize>,
    pub read_error: Option<String>,
}

impl LocalEnvReport {
    pub fn log(&self) {
        let Some(path) = &self.path else {
            return;
        };
        for line in &self.skipped_lines {
            warn!(line, "invalid local.env entry; skipping");
        }
        match &self.read_error {
            Some(err) => warn!(path = %path.display(), %err, "failed to read local.env overrides"),
            None => info!(
                path = %path.display(),
                applied = self.applied,
                "Loaded environment overrides from local.env"
            ),
        }
    }
}

/// Copies `config/local.env` entries into the environment. Variables that are
/// already set win.
pub fn load_local_env_overrides() -> LocalEnvReport {
    load_env_file(Path::new(LOCAL_ENV_PATH))
}

fn load_env_file(path: &Path) -> LocalEnvReport {
    if !path.exists() {
        return LocalEnvReport::default();
    }
    let mut report = LocalEnvReport {
        path: Some(path.to_path_buf()),
        ..LocalEnvReport::default()
    };

    let contents = match stdfs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            report.read_error = Some(err.to_string());
            return report;
        }
    };
    for (idx, raw_line) in contents.lines().enumerate() {
        let Some((key, value)) = parse_env_line(raw_line) else {
            if !is_blank_or_comment(raw_line) {
                report.skipped_lines.push(idx + 1);
            }
            continue;
        };
        if env::var(&key).is_ok() {
            continue;
        }
        env::set_var(key, value);
        report.applied += 1;
    }
    report
}

fn is_blank_or_comment(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.starts_with('#')
}

fn parse_env_line(raw_line: &str) -> Option<(String, String)> {
    if is_blank_or_comment(raw_line) {
        return None;
    }
    let line = raw_line.trim();
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), unescape_value(value.trim())))
}

/// Logs go to stderr; stdout carries hook output.
pub fn init_logging(level: &str, debug: bool, format: LogFormat) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    }
    .context("Failed to install tracing subscriber")?;

    Ok(())
}

pub struct LoadedConfig {
    pub config: GuardConfig,
    pub path: PathBuf,
}

pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let explicit = config_path.is_some();
    let config_path = match config_path {
        Some(path) => path.clone(),
        None => {
            // Priority: ./config/gateguard.yaml > ~/.config/gateguard/gateguard.yaml
            let local_config = PathBuf::from(DEFAULT_CONFIG_PATH);
            match dirs::config_dir() {
                Some(mut path) if !local_config.exists() => {
                    path.push("gateguard");
                    path.push("gateguard.yaml");
                    path
                }
                _ => local_config,
            }
        }
    };

    let mut config = if config_path.exists() {
        let content = fs::read_to_string(&config_path)
            .await
            .context("Failed to read config file")?;
        let config = GuardConfig::from_yaml(&content).context("Failed to parse config file")?;
        info!("Loaded configuration from: {}", config_path.display());
        config
    } else if explicit {
        bail!("Config file not found: {}", config_path.display());
    } else {
        info!(
            "Config file not found, using defaults: {}",
            config_path.display()
        );
        GuardConfig::default()
    };

    config
        .apply_env()
        .context("Invalid configuration in environment")?;
    config.validate().context("Invalid configuration")?;

    Ok(LoadedConfig {
        config,
        path: config_path,
    })
}

fn unescape_value(value: &str) -> String {
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        let inner = &value[1..value.len() - 1];
        inner
            .replace("\\\"", "\"")
            .replace("\\n", "\n")
            .replace("\\r", "\r")
            .replace("\\t", "\t")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn env_lines_skip_comments_and_unquote() {
        assert_eq!(parse_env_line("# comment"), None);
        assert_eq!(parse_env_line("   "), None);
        assert_eq!(parse_env_line("=value"), None);
        assert_eq!(
            parse_env_line("export GLOBAL_LIMIT = 20"),
            Some(("GLOBAL_LIMIT".into(), "20".into()))
        );
        assert_eq!(
            parse_env_line(r#"REDIS_PASSWORD="p\"w""#),
            Some(("REDIS_PASSWORD".into(), "p\"w".into()))
        );
    }

    #[test]
    fn env_file_report_lists_bad_lines() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "# local overrides\nGATEGUARD_TEST_LOCAL_ENV=1\nnot a pair").expect("write");
        let report = load_env_file(file.path());
        assert_eq!(report.path.as_deref(), Some(file.path()));
        assert_eq!(report.applied, 1);
        assert_eq!(report.skipped_lines, vec![3]);
        assert!(report.read_error.is_none());
        assert_eq!(env::var("GATEGUARD_TEST_LOCAL_ENV").as_deref(), Ok("1"));
    }

    #[test]
    fn missing_env_file_reports_nothing() {
        let report = load_env_file(Path::new("/nonexistent/local.env"));
        assert!(report.path.is_none());
        assert_eq!(report.applied, 0);
    }

    #[tokio::test]
    async fn explicit_missing_config_is_an_error() {
        let missing = PathBuf::from("/nonexistent/gateguard.yaml");
        assert!(load_config(Some(&missing)).await.is_err());
    }

    #[tokio::test]
    async fn explicit_config_is_parsed() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "limits:\n  per_ip: 7\nserver:\n  bind: 0.0.0.0:9000").expect("write");
        let path = file.path().to_path_buf();
        let loaded = load_config(Some(&path)).await.expect("config");
        assert_eq!(loaded.path, path);
        assert_eq!(loaded.config.limits.per_ip, 7);
        assert_eq!(loaded.config.server.bind, "0.0.0.0:9000");
    }
}
