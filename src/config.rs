//! TOML configuration parsing and validation.
//!
//! ```toml
//! [backend]
//! kind = "sqlite"            # or "rest"
//!
//! [db]
//! path = "./data/proom.sqlite"
//!
//! [rest]
//! url = "https://project.example.co"
//! api_key_env = "PRACTICEROOM_API_KEY"
//! timeout_secs = 30
//!
//! [feed]
//! page_size = 10
//! max_window_size = 20
//!
//! [logging]
//! filter = "info"
//! ```

use anyhow::{Context, Result};
use practice_room_core::feed::FeedSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub rest: Option<RestConfig>,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Sqlite,
    Rest,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/proom.sqlite")
}

/// Hosted backend (PostgREST dialect).
#[derive(Debug, Deserialize, Clone)]
pub struct RestConfig {
    pub url: String,
    /// Name of the environment variable holding the anon/service key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_key_env() -> String {
    "PRACTICEROOM_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_max_window_size")]
    pub max_window_size: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_window_size: default_max_window_size(),
        }
    }
}

fn default_page_size() -> usize {
    10
}
fn default_max_window_size() -> usize {
    20
}

impl FeedConfig {
    pub fn settings(&self) -> FeedSettings {
        FeedSettings {
            page_size: self.page_size,
            max_window_size: self.max_window_size,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// `tracing-subscriber` env-filter directive; `RUST_LOG` wins when set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "warn".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    config
        .feed
        .settings()
        .validate()
        .map_err(|e| anyhow::anyhow!("[feed] {}", e))?;

    if config.backend.kind == BackendKind::Rest {
        let rest = match &config.rest {
            Some(rest) => rest,
            None => anyhow::bail!("[rest] section is required when backend.kind = \"rest\""),
        };
        if !(rest.url.starts_with("http://") || rest.url.starts_with("https://")) {
            anyhow::bail!("rest.url must start with http:// or https://");
        }
        if rest.timeout_secs == 0 {
            anyhow::bail!("rest.timeout_secs must be > 0");
        }
    }

    Ok(())
}
