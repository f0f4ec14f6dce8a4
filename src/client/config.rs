//! Configuration management for GitHub client

use std::{fmt, time::Duration};

use compact_str::CompactString;
use reqwest::header::HeaderValue;

use super::error::{ClientError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.github.com";
pub const DEFAULT_USER_AGENT: &str = "mcp-github-client";

pub const ENV_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_PAT: &str = "GITHUB_PAT";
pub const ENV_USER_AGENT: &str = "GITHUB_USER_AGENT";
pub const ENV_API_URL: &str = "GITHUB_API_URL";
pub const ENV_MAX_RETRIES: &str = "GITHUB_MAX_RETRIES";
pub const ENV_RETRY_DELAY: &str = "GITHUB_RETRY_DELAY";

/// Main configuration for GitHub client
///
/// Immutable once handed to [`GithubClient::new`](super::GithubClient::new).
#[derive(Clone)]
pub struct ClientConfig {
    /// GitHub API base URL
    pub base_url: CompactString,
    /// Bearer token
    pub token: CompactString,
    /// Value of the User-Agent header
    pub user_agent: CompactString,
    /// Retry and backoff configuration
    pub retry: RetryConfig,
    /// Per-request configuration
    pub request: RequestConfig,
}

/// Retry ceiling and backoff timing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the initial attempt
    pub max_retries: u32,
    /// Unit of the linear backoff; attempt `n` waits `n` units
    pub retry_delay: Duration,
    /// Upper bound on a single rate-limit wait
    pub max_rate_limit_wait: Duration,
}

/// HTTP request configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestConfig {
    /// Number of items per page for paginated requests
    pub per_page: u32,
    /// Timeout of a single attempt
    pub timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            max_rate_limit_wait: Duration::from_secs(60 * 60),
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self { per_page: 100, timeout: Duration::from_secs(30) }
    }
}

impl RetryConfig {
    /// Linear backoff: `retry_delay * attempt`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.retry_delay.saturating_mul(attempt)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("retry", &self.retry)
            .field("request", &self.request)
            .finish()
    }
}

impl ClientConfig {
    /// Create a new client configuration with default URL, user agent and retry policy
    pub fn new(token: impl Into<CompactString>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            token: token.into(),
            user_agent: DEFAULT_USER_AGENT.into(),
            retry: RetryConfig::default(),
            request: RequestConfig::default(),
        }
    }

    /// Build a configuration purely from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup
    pub fn from_env_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = resolve_token(None, &lookup)?;
        let mut config = Self::new(token);

        if let Some(user_agent) = non_empty(&lookup, ENV_USER_AGENT) {
            config.user_agent = user_agent.into();
        }
        if let Some(base_url) = non_empty(&lookup, ENV_API_URL) {
            config.base_url = base_url.into();
        }
        if let Some(max_retries) = parse_env_u32(&lookup, ENV_MAX_RETRIES)? {
            config.retry.max_retries = max_retries;
        }
        if let Some(delay_ms) = parse_env_u64(&lookup, ENV_RETRY_DELAY)? {
            config.retry.retry_delay = Duration::from_millis(delay_ms);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(ClientError::config("token", "GitHub token cannot be empty"));
        }

        if HeaderValue::from_str(&format!("Bearer {}", self.token)).is_err() {
            return Err(ClientError::config(
                "token",
                "GitHub token contains characters not allowed in an HTTP header",
            ));
        }

        if HeaderValue::from_str(&self.user_agent).is_err() {
            return Err(ClientError::config(
                "user_agent",
                "User agent contains characters not allowed in an HTTP header",
            ));
        }

        if self.base_url.is_empty() {
            return Err(ClientError::config("base_url", "Base URL cannot be empty"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ClientError::config(
                "base_url",
                "Base URL must start with http:// or https://",
            ));
        }

        if url::Url::parse(&self.base_url).is_err() {
            return Err(ClientError::config("base_url", "Base URL is not a valid URL format"));
        }

        if self.request.per_page == 0 || self.request.per_page > 100 {
            return Err(ClientError::config("per_page", "per_page must be between 1 and 100"));
        }

        if self.request.timeout.is_zero() {
            return Err(ClientError::config("timeout", "Timeout must be greater than zero"));
        }

        Ok(())
    }
}

impl ClientConfig {
    /// Set the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<CompactString>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the User-Agent header value
    pub fn with_user_agent(mut self, user_agent: impl Into<CompactString>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the retry ceiling
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.retry.max_retries = max_retries;
        self
    }

    /// Set the backoff unit
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry.retry_delay = retry_delay;
        self
    }

    /// Set retry configuration
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set request configuration
    pub fn with_request(mut self, request: RequestConfig) -> Self {
        self.request = request;
        self
    }
}

/// Pick the bearer token: explicit value, then `GITHUB_TOKEN`, then `GITHUB_PAT`
pub fn resolve_token<F>(explicit: Option<&str>, lookup: F) -> Result<CompactString>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(token) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
        return Ok(token.into());
    }

    non_empty(&lookup, ENV_TOKEN)
        .or_else(|| non_empty(&lookup, ENV_PAT))
        .map(CompactString::from)
        .ok_or_else(|| {
            ClientError::config(
                "token",
                "no GitHub token supplied; set GITHUB_TOKEN or GITHUB_PAT",
            )
        })
}

pub(crate) fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

pub(crate) fn parse_env_u32<F>(lookup: &F, key: &str) -> Result<Option<u32>>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, key)
        .map(|raw| {
            raw.parse::<u32>().map_err(|_| {
                ClientError::config(key, format!("expected a non-negative integer, got {raw:?}"))
            })
        })
        .transpose()
}

pub(crate) fn parse_env_u64<F>(lookup: &F, key: &str) -> Result<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, key)
        .map(|raw| {
            raw.parse::<u64>().map_err(|_| {
                ClientError::config(key, format!("expected milliseconds as an integer, got {raw:?}"))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn github_token_beats_pat() {
        let lookup = env(&[(ENV_TOKEN, "from-token"), (ENV_PAT, "from-pat")]);
        assert_eq!(resolve_token(None, lookup).unwrap(), "from-token");
    }

    #[test]
    fn pat_is_used_when_token_missing() {
        let lookup = env(&[(ENV_PAT, "from-pat")]);
        assert_eq!(resolve_token(None, lookup).unwrap(), "from-pat");
    }

    #[test]
    fn empty_token_falls_through_to_pat() {
        let lookup = env(&[(ENV_TOKEN, "  "), (ENV_PAT, "from-pat")]);
        assert_eq!(resolve_token(None, lookup).unwrap(), "from-pat");
    }

    #[test]
    fn explicit_token_wins_over_environment() {
        let lookup = env(&[(ENV_TOKEN, "from-token")]);
        assert_eq!(resolve_token(Some("explicit"), lookup).unwrap(), "explicit");
    }

    #[test]
    fn missing_token_is_a_configuration_error() {
        let err = resolve_token(None, env(&[])).unwrap_err();
        assert!(matches!(err, ClientError::Configuration { ref field, .. } if field.as_str() == "token"));

        let err = ClientConfig::from_env_with(env(&[(ENV_MAX_RETRIES, "5")])).unwrap_err();
        assert!(matches!(err, ClientError::Configuration { .. }));
    }

    #[test]
    fn from_env_applies_defaults() {
        let config = ClientConfig::from_env_with(env(&[(ENV_TOKEN, "t")])).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.retry, RetryConfig::default());
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.retry_delay, Duration::from_millis(1000));
    }

    #[test]
    fn from_env_reads_overrides() {
        let config = ClientConfig::from_env_with(env(&[
            (ENV_PAT, "pat"),
            (ENV_USER_AGENT, "agent/1.0"),
            (ENV_API_URL, "https://ghe.example.com/api/v3"),
            (ENV_MAX_RETRIES, "7"),
            (ENV_RETRY_DELAY, "250"),
        ]))
        .unwrap();
        assert_eq!(config.token, "pat");
        assert_eq!(config.user_agent, "agent/1.0");
        assert_eq!(config.base_url, "https://ghe.example.com/api/v3");
        assert_eq!(config.retry.max_retries, 7);
        assert_eq!(config.retry.retry_delay, Duration::from_millis(250));
    }

    #[test]
    fn negative_or_garbage_numbers_are_rejected() {
        let err =
            ClientConfig::from_env_with(env(&[(ENV_TOKEN, "t"), (ENV_MAX_RETRIES, "-1")])).unwrap_err();
        assert!(matches!(err, ClientError::Configuration { ref field, .. } if field.as_str() == ENV_MAX_RETRIES));

        let err =
            ClientConfig::from_env_with(env(&[(ENV_TOKEN, "t"), (ENV_RETRY_DELAY, "soon")])).unwrap_err();
        assert!(matches!(err, ClientError::Configuration { ref field, .. } if field.as_str() == ENV_RETRY_DELAY));
    }

    #[test]
    fn validate_rejects_bad_settings() {
        assert!(ClientConfig::new("t").validate().is_ok());
        assert!(ClientConfig::new("").validate().is_err());
        assert!(ClientConfig::new("t").with_base_url("ftp://example.com").validate().is_err());
        assert!(ClientConfig::new("t").with_base_url("").validate().is_err());

        let request = RequestConfig { per_page: 0, ..RequestConfig::default() };
        assert!(ClientConfig::new("t").with_request(request).validate().is_err());

        let request = RequestConfig { timeout: Duration::ZERO, ..RequestConfig::default() };
        assert!(ClientConfig::new("t").with_request(request).validate().is_err());
    }

    #[test]
    fn backoff_is_linear() {
        let retry = RetryConfig { retry_delay: Duration::from_millis(100), ..RetryConfig::default() };
        assert_eq!(retry.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(retry.backoff_delay(2), Duration::from_millis(200));
        assert_eq!(retry.backoff_delay(3), Duration::from_millis(300));
        assert_eq!(retry.backoff_delay(u32::MAX), Duration::from_millis(100) * u32::MAX);
    }

    #[test]
    fn header_unsafe_values_are_blamed_on_their_field() {
        let err = ClientConfig::new("ghp_abc\ndef").validate().unwrap_err();
        assert!(matches!(err, ClientError::Configuration { ref field, .. } if field.as_str() == "token"));

        let err = ClientConfig::new("t").with_user_agent("agent\r\nX-Evil: 1").validate().unwrap_err();
        assert!(matches!(err, ClientError::Configuration { ref field, .. } if field.as_str() == "user_agent"));
    }

    #[test]
    fn debug_output_hides_token() {
        let rendered = format!("{:?}", ClientConfig::new("ghp_secret_value"));
        assert!(!rendered.contains("ghp_secret_value"));
        assert!(rendered.contains("<redacted>"));
    }
}
