use crate::error::ConfigError;
use std::env;

/// Runtime configuration for the GitHub REST client and server behavior.
/// Values are sourced from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub api_url: String,
    pub api_version: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub read_only: bool,
    pub include_rate: bool,
}

impl Config {
    /// Load configuration from environment.
    ///
    /// Env vars:
    /// - GITHUB_TOKEN (or GH_TOKEN) [required]
    /// - GITHUB_API_URL (default: https://api.github.com)
    /// - GITHUB_API_VERSION (default: 2022-11-28)
    /// - GITHUB_HTTP_TIMEOUT_SECS (default: 30)
    /// - GITHUB_USER_AGENT (default: github-deps-mcp/<version>)
    /// - GITHUB_READ_ONLY (default: false)
    /// - GITHUB_MCP_INCLUDE_RATE (default: false)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but reads through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("GITHUB_TOKEN")
            .or_else(|| lookup("GH_TOKEN"))
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let api_url = lookup("GITHUB_API_URL")
            .unwrap_or_else(|| "https://api.github.com".to_string())
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&api_url).map_err(|e| ConfigError::InvalidApiUrl {
            url: api_url.clone(),
            reason: e.to_string(),
        })?;

        let api_version = lookup("GITHUB_API_VERSION").unwrap_or_else(|| "2022-11-28".to_string());
        let timeout_secs = lookup("GITHUB_HTTP_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(30);
        let user_agent = lookup("GITHUB_USER_AGENT")
            .unwrap_or_else(|| format!("github-deps-mcp/{}", env!("CARGO_PKG_VERSION")));

        Ok(Self {
            token,
            api_url,
            api_version,
            user_agent,
            timeout_secs,
            read_only: lookup("GITHUB_READ_ONLY").is_some_and(|v| env_flag(&v)),
            include_rate: lookup("GITHUB_MCP_INCLUDE_RATE").is_some_and(|v| env_flag(&v)),
        })
    }
}

pub fn env_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
