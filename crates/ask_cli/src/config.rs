//! Environment configuration.

use std::env;
use std::time::Duration;

pub const SERVER_URL_ENV: &str = "ASK_SERVER_URL";
pub const SERVER_BIN_ENV: &str = "ASK_SERVER_BIN";
pub const SERVER_START_TIMEOUT_ENV: &str = "ASK_SERVER_START_TIMEOUT_MS";
pub const HTTP_TIMEOUT_ENV: &str = "ASK_HTTP_TIMEOUT_SEC";

pub const DEFAULT_SERVER_BIN: &str = "agi";
pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_millis(15_000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    /// Existing backend to reuse. When absent a disposable one is started.
    pub server_url: Option<String>,
    pub server_bin: String,
    pub start_timeout: Duration,
    pub http_timeout: Option<Duration>,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            server_url: env_string_opt(SERVER_URL_ENV),
            server_bin: env_string_opt(SERVER_BIN_ENV)
                .unwrap_or_else(|| DEFAULT_SERVER_BIN.to_string()),
            start_timeout: env_u64_opt(SERVER_START_TIMEOUT_ENV)
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_START_TIMEOUT),
            http_timeout: env_u64_opt(HTTP_TIMEOUT_ENV)
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_u64_opt(key: &str) -> Option<u64> {
    env_string_opt(key).and_then(|value| value.parse().ok())
}
