//! Client configuration.

use anyhow::Result;
use datachat_core::{
    HttpServiceConfig, TranscriptCodec, WorkspaceConfig, DEFAULT_COMPRESSION_LEVEL,
    DEFAULT_HISTORY_WINDOW,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides `api_token`.
pub const API_TOKEN_ENV: &str = "DATACHAT_API_TOKEN";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    #[serde(default)]
    pub cache_capacity: Option<usize>,
    #[serde(default = "default_compression_level")]
    pub compression_level: i32,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("datachat")
        .join("transcripts.db")
}

fn default_history_window() -> usize {
    DEFAULT_HISTORY_WINDOW
}

fn default_compression_level() -> i32 {
    DEFAULT_COMPRESSION_LEVEL
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_token: None,
            db_path: default_db_path(),
            history_window: default_history_window(),
            cache_capacity: None,
            compression_level: default_compression_level(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Config {
    /// Load config from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load config from default location (config/default.toml) or fall back to defaults.
    pub fn load() -> Result<Self> {
        let config_path = PathBuf::from("config/default.toml");
        if config_path.exists() {
            return Self::load_from(&config_path);
        }
        Ok(Config::default())
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Let the environment supply the API token.
    pub fn apply_env(&mut self) {
        self.apply_token_override(std::env::var(API_TOKEN_ENV).ok());
    }

    fn apply_token_override(&mut self, token: Option<String>) {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.api_token = Some(token);
        }
    }

    pub fn service_config(&self) -> HttpServiceConfig {
        HttpServiceConfig {
            base_url: self.api_url.clone(),
            api_token: self.api_token.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn workspace_config(&self) -> WorkspaceConfig {
        WorkspaceConfig {
            history_window: self.history_window,
            cache_capacity: self.cache_capacity,
        }
    }

    pub fn codec(&self) -> TranscriptCodec {
        TranscriptCodec::new(self.compression_level)
    }
}
