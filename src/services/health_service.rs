use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report the degraded flag while logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.answer_store().await {
        Some(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        None => warn!("storage unavailable (degraded mode)"),
    }

    if state.is_degraded() {
        HealthResponse::degraded()
    } else {
        HealthResponse::ok()
    }
}
