use axum::Router;

use crate::state::SharedState;

/// `GET /healthcheck`.
pub mod health;
/// Play requests and run status.
pub mod play;

/// Compose all route trees and wire in the shared state.
pub fn router(state: SharedState) -> Router<()> {
    health::router().merge(play::router()).with_state(state)
}
