use std::time::Duration;

use super::error::{CouchDaoError, CouchResult};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Runtime configuration describing how to reach the CouchDB answer database.
#[derive(Debug, Clone)]
pub struct CouchConfig {
    /// Server root, e.g. `http://localhost:5984`.
    pub base_url: String,
    /// Database holding question and answer documents.
    pub database: String,
    /// Basic auth user, if any.
    pub username: Option<String>,
    /// Basic auth password, if any.
    pub password: Option<String>,
    /// Upper bound for a single CouchDB request.
    pub request_timeout: Duration,
}

impl CouchConfig {
    /// Configuration without credentials and the default timeout.
    pub fn new(base_url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            database: database.into(),
            username: None,
            password: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Attach basic-auth credentials to the configuration.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Read `COUCH_BASE_URL`, `COUCH_DB` and the optional credential pair.
    pub fn from_env() -> CouchResult<Self> {
        let base_url = std::env::var("COUCH_BASE_URL")
            .map_err(|_| CouchDaoError::MissingEnvVar { var: "COUCH_BASE_URL" })?;
        let database = std::env::var("COUCH_DB").unwrap_or_else(|_| "guess_game".into());

        let mut config = Self::new(base_url, database);

        if let (Some(username), Some(password)) = (
            std::env::var("COUCH_USERNAME").ok(),
            std::env::var("COUCH_PASSWORD").ok(),
        ) {
            config = config.with_credentials(username, password);
        }

        Ok(config)
    }
}
