use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::play::{PlayAccepted, PlayRequest, RunStatusResponse},
    error::AppError,
    services::play_service::{self, PlayResponse},
    state::SharedState,
};

/// Routes starting automaton runs and reporting on them.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games/{game_id}/play", post(play))
        .route("/runs", get(list_runs))
        .route("/runs/{id}", get(run_status))
}

/// Start a run; `202` with its id, or `200` with the final counters when `wait` is set.
pub async fn play(
    State(state): State<SharedState>,
    Path(game_id): Path<i64>,
    Valid(Json(payload)): Valid<Json<PlayRequest>>,
) -> Result<Response, AppError> {
    let response = match play_service::start_run(&state, game_id, payload).await? {
        PlayResponse::Accepted(run_id) => {
            (StatusCode::ACCEPTED, Json(PlayAccepted { run_id })).into_response()
        }
        PlayResponse::Finished(status) => Json(status).into_response(),
    };
    Ok(response)
}

/// List every run started since boot.
pub async fn list_runs(State(state): State<SharedState>) -> Json<Vec<RunStatusResponse>> {
    Json(play_service::list_runs(&state))
}

/// Current counters of one run.
pub async fn run_status(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RunStatusResponse>, AppError> {
    Ok(Json(play_service::run_status(&state, id)?))
}
