use std::time::Duration;

/// Default bound on a calculation, session lookup or email request.
pub const DEFAULT_CALCULATION_TIMEOUT_SECS: u64 = 10;

/// Default bound on a chat agent reply.
pub const DEFAULT_CHAT_TIMEOUT_SECS: u64 = 15;

/// Remote service configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the calculation service, without a trailing slash.
    pub api_base_url: String,
    /// Chat agent webhook. `None` disables the agent; every chat turn then
    /// gets the fallback reply.
    pub chat_webhook_url: Option<String>,
    pub calculation_timeout: Duration,
    pub chat_timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{name} must be a valid {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                    | Required | Default |
    /// |----------------------------|----------|---------|
    /// | `API_BASE_URL`             | yes      | --      |
    /// | `CHAT_WEBHOOK_URL`         | no       | unset   |
    /// | `CALCULATION_TIMEOUT_SECS` | no       | `10`    |
    /// | `CHAT_TIMEOUT_SECS`        | no       | `15`    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable
    /// source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base_url = lookup("API_BASE_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("API_BASE_URL"))?;

        let chat_webhook_url = lookup("CHAT_WEBHOOK_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let calculation_timeout = parse_secs(
            &lookup,
            "CALCULATION_TIMEOUT_SECS",
            DEFAULT_CALCULATION_TIMEOUT_SECS,
        )?;
        let chat_timeout = parse_secs(&lookup, "CHAT_TIMEOUT_SECS", DEFAULT_CHAT_TIMEOUT_SECS)?;

        Ok(Self {
            api_base_url,
            chat_webhook_url,
            calculation_timeout,
            chat_timeout,
        })
    }
}

fn parse_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: u64,
) -> Result<Duration, ConfigError> {
    match lookup(name) {
        None => Ok(Duration::from_secs(default)),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .ok_or(ConfigError::Invalid {
                name,
                expected: "positive number of seconds",
                value: raw,
            }),
    }
}
