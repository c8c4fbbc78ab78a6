//! Application-level configuration loading: remote endpoints, timeouts and pacing defaults.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::client::{HttpGameApiConfig, RetryPolicy};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "GUESS_GAME_BACK_CONFIG_PATH";

const DEFAULT_START_SESSION_URL: &str = "https://kp-guess-game-api.kinopoisk.ru/v1/games";
const DEFAULT_SUBMIT_ANSWER_URL: &str =
    "https://kp-guess-game-api.kinopoisk.ru/v1/questions/answers";
/// Five hours: the remote service can hold a request open for a long time.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5 * 60 * 60;

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Endpoint opening a new remote session.
    pub start_session_url: String,
    /// Endpoint receiving submitted answers.
    pub submit_answer_url: String,
    /// Timeout of a single remote call.
    pub request_timeout: Duration,
    /// Pause between two attempts of a failed remote call.
    pub retry_delay: Duration,
    /// Pacing bounds used when a play request leaves them out.
    pub default_min_seconds: i64,
    /// Upper pacing bound used when a request leaves it out.
    pub default_max_seconds: i64,
    /// Pacing step used when a request leaves it out.
    pub default_step_seconds: i64,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        start_session_url = %app_config.start_session_url,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a JSON document; absent keys keep their default value.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// Settings for [`HttpGameApi`](crate::client::HttpGameApi).
    pub fn game_api(&self) -> HttpGameApiConfig {
        HttpGameApiConfig {
            start_session_url: self.start_session_url.clone(),
            submit_answer_url: self.submit_answer_url.clone(),
            request_timeout: self.request_timeout,
        }
    }

    /// Retry policy wrapping every remote call.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_delay(self.retry_delay)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    start_session_url: Option<String>,
    submit_answer_url: Option<String>,
    request_timeout_secs: Option<u64>,
    retry_delay_ms: Option<u64>,
    default_min_seconds: Option<i64>,
    default_max_seconds: Option<i64>,
    default_step_seconds: Option<i64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            start_session_url: value
                .start_session_url
                .unwrap_or_else(|| DEFAULT_START_SESSION_URL.into()),
            submit_answer_url: value
                .submit_answer_url
                .unwrap_or_else(|| DEFAULT_SUBMIT_ANSWER_URL.into()),
            request_timeout: Duration::from_secs(
                value
                    .request_timeout_secs
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            retry_delay: Duration::from_millis(value.retry_delay_ms.unwrap_or(0)),
            default_min_seconds: value.default_min_seconds.unwrap_or(1),
            default_max_seconds: value.default_max_seconds.unwrap_or(1),
            default_step_seconds: value.default_step_seconds.unwrap_or(1),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.request_timeout, Duration::from_secs(18_000));
        assert!(config.retry_delay.is_zero());
    }

    #[test]
    fn present_keys_override_defaults() {
        let config = AppConfig::from_json(
            r#"{ "submit_answer_url": "http://localhost:9000/answers", "retry_delay_ms": 250, "default_max_seconds": 12 }"#,
        )
        .unwrap();

        assert_eq!(config.submit_answer_url, "http://localhost:9000/answers");
        assert_eq!(config.start_session_url, DEFAULT_START_SESSION_URL);
        assert_eq!(config.retry_policy().delay, Duration::from_millis(250));
        assert_eq!(config.default_max_seconds, 12);
        assert_eq!(config.default_min_seconds, 1);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(AppConfig::from_json(r#"{ "retry_delay_ms": "soon" }"#).is_err());
    }
}
