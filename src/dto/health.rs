use serde::Serialize;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
}

impl HealthResponse {
    /// Storage is installed and answering.
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }

    /// No usable storage; play requests are refused.
    pub fn degraded() -> Self {
        Self {
            status: "degraded".to_string(),
        }
    }
}
