use std::time::Duration;

use editkit_client::PollConfig;

/// Default service root for local development.
pub const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Default per-request HTTP timeout. Video uploads of several hundred
/// megabytes need far more than a typical API call.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Service root (default: `http://localhost:5000`).
    pub api_url: String,
    /// Status polling interval and optional attempt cap.
    pub poll: PollConfig,
    /// HTTP request timeout (default: 300 s).
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            poll: PollConfig::default(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                 |
    /// |--------------------------------|-------------------------|
    /// | `EDITKIT_API_URL`              | `http://localhost:5000` |
    /// | `EDITKIT_POLL_INTERVAL_MS`     | `2000`                  |
    /// | `EDITKIT_POLL_MAX_ATTEMPTS`    | unset (unbounded)       |
    /// | `EDITKIT_REQUEST_TIMEOUT_SECS` | `300`                   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = match lookup("EDITKIT_API_URL") {
            Some(url) => validate_api_url("EDITKIT_API_URL", &url)?,
            None => DEFAULT_API_URL.to_string(),
        };

        let interval_ms = parse_positive(
            "EDITKIT_POLL_INTERVAL_MS",
            lookup("EDITKIT_POLL_INTERVAL_MS"),
        )?
        .unwrap_or(DEFAULT_POLL_INTERVAL_MS);

        let max_attempts = parse_positive(
            "EDITKIT_POLL_MAX_ATTEMPTS",
            lookup("EDITKIT_POLL_MAX_ATTEMPTS"),
        )?
        .map(|n| u32::try_from(n).unwrap_or(u32::MAX));

        let timeout_secs = parse_positive(
            "EDITKIT_REQUEST_TIMEOUT_SECS",
            lookup("EDITKIT_REQUEST_TIMEOUT_SECS"),
        )?
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        Ok(Self {
            api_url,
            poll: PollConfig {
                interval: Duration::from_millis(interval_ms),
                max_attempts,
            },
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Check that `value` is an http(s) URL and strip any trailing slash.
pub fn validate_api_url(key: &'static str, value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim().trim_end_matches('/');
    let rest = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"));
    match rest {
        Some(host) if !host.is_empty() => Ok(trimmed.to_string()),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            expected: "an http:// or https:// URL",
        }),
    }
}

/// Parse an optional strictly positive integer. Blank counts as unset.
fn parse_positive(key: &'static str, raw: Option<String>) -> Result<Option<u64>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<u64>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw,
            expected: "a positive integer",
        }),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be {expected} (got '{value}')")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}
