//! Configuration file for the `gh-client` binary and integrations
//!
//! Layers are merged as defaults < file < environment, and the result is handed
//! to [`GithubClient`](crate::client::GithubClient) as a finished
//! [`ClientConfig`].

use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use compact_str::CompactString;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    client::{
        ClientConfig, ClientError,
        config::{
            ENV_API_URL, ENV_MAX_RETRIES, ENV_RETRY_DELAY, ENV_USER_AGENT, non_empty, parse_env_u32,
            parse_env_u64, resolve_token,
        },
    },
    result::{AppError, Result},
};

const CONFIG_FILE_NAME: &str = "gh-client.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Log filter directive, e.g. `info` or `gh_client=debug`
    pub log_level: Option<CompactString>,
    pub github: GithubSettings,
}

/// `[github]` table; every field is optional and falls back to client defaults
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubSettings {
    pub token: Option<CompactString>,
    pub user_agent: Option<CompactString>,
    pub api_url: Option<CompactString>,
    pub max_retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
}

impl fmt::Debug for GithubSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubSettings")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("user_agent", &self.user_agent)
            .field("api_url", &self.api_url)
            .field("max_retries", &self.max_retries)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .finish()
    }
}

pub fn default_config_path() -> PathBuf {
    if let Some(dirs) = BaseDirs::new() {
        dirs.config_dir().join(CONFIG_FILE_NAME)
    } else {
        PathBuf::from(CONFIG_FILE_NAME)
    }
}

/// Read the configuration file; a missing file yields the defaults
pub fn load_config(config_file: &Path) -> Result<AppConfig> {
    if !config_file.exists() {
        debug!(path = %config_file.display(), "No configuration file, using defaults");
        return Ok(AppConfig::default());
    }

    let config: AppConfig = confy::load_path(config_file)
        .map_err(|e| AppError::config_load_error(config_file.to_path_buf(), e))?;
    debug!(path = %config_file.display(), "Loaded configuration file");
    Ok(config)
}

impl AppConfig {
    /// Overlay the process environment
    pub fn with_env_overrides(self) -> Result<Self> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Overlay variables from `lookup`; set variables beat file values
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Ok(token) = resolve_token(None, &lookup) {
            self.github.token = Some(token);
        }
        if let Some(user_agent) = non_empty(&lookup, ENV_USER_AGENT) {
            self.github.user_agent = Some(user_agent.into());
        }
        if let Some(api_url) = non_empty(&lookup, ENV_API_URL) {
            self.github.api_url = Some(api_url.into());
        }
        if let Some(max_retries) = parse_env_u32(&lookup, ENV_MAX_RETRIES)? {
            self.github.max_retries = Some(max_retries);
        }
        if let Some(delay_ms) = parse_env_u64(&lookup, ENV_RETRY_DELAY)? {
            self.github.retry_delay_ms = Some(delay_ms);
        }
        Ok(self)
    }

    /// Resolve into a validated client configuration
    pub fn client_config(&self) -> std::result::Result<ClientConfig, ClientError> {
        let token = resolve_token(self.github.token.as_deref(), |_| None)?;
        let mut config = ClientConfig::new(token);

        if let Some(user_agent) = &self.github.user_agent {
            config = config.with_user_agent(user_agent.clone());
        }
        if let Some(api_url) = &self.github.api_url {
            config = config.with_base_url(api_url.clone());
        }
        if let Some(max_retries) = self.github.max_retries {
            config = config.with_max_retries(max_retries);
        }
        if let Some(delay_ms) = self.github.retry_delay_ms {
            config = config.with_retry_delay(Duration::from_millis(delay_ms));
        }

        config.validate()?;
        Ok(config)
    }
}
