use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    dto::play::{PlayRequest, RunStatusResponse},
    error::ServiceError,
    services::{
        automaton::{GameAutomaton, PlayPlan, RunProgress},
        pacing::PacingBounds,
    },
    state::{RunEntry, SharedState},
};

/// What the caller gets back from [`start_run`].
#[derive(Debug)]
pub enum PlayResponse {
    /// The run was spawned and keeps going in the background.
    Accepted(Uuid),
    /// The caller asked to wait; the run is over.
    Finished(RunStatusResponse),
}

/// Spawn a run for `game_id` on its own task and register it.
///
/// Refused in degraded mode: without a store nothing could be learned or replayed.
/// Refused with [`ServiceError::Conflict`] while another run on the same game is live.
pub async fn start_run(
    state: &SharedState,
    game_id: i64,
    request: PlayRequest,
) -> Result<PlayResponse, ServiceError> {
    let store = state.require_answer_store().await?;
    let wait = request.wait;
    let plan = build_plan(state, game_id, request);

    let (updates, progress) = watch::channel(RunProgress::default());
    let entry = RunEntry::new(game_id, plan.mode, progress);
    let run_id = entry.id;
    state.register_run(entry);

    if let Err(holder) = state.claim_game(game_id, run_id) {
        state.runs().remove(&run_id);
        warn!(game_id, %holder, "refusing a second live run on the same game");
        return Err(ServiceError::Conflict(format!(
            "game {game_id} is already being played by run `{holder}`"
        )));
    }

    let automaton = GameAutomaton::new(state.game_client().clone(), store);
    info!(%run_id, game_id, rounds = plan.rounds, mode = ?plan.mode, "spawning run");
    let task_state = state.clone();
    let handle = tokio::spawn(async move {
        let progress = automaton.run(&plan, &updates).await;
        task_state.release_game(game_id, run_id);
        progress
    });

    if !wait {
        return Ok(PlayResponse::Accepted(run_id));
    }

    if let Err(err) = handle.await {
        error!(%run_id, error = %err, "run task failed");
        return Err(ServiceError::RunAborted(format!(
            "run `{run_id}` did not complete"
        )));
    }

    run_status(state, run_id).map(PlayResponse::Finished)
}

/// Snapshot every registered run, most recent first.
pub fn list_runs(state: &SharedState) -> Vec<RunStatusResponse> {
    let mut runs: Vec<_> = state
        .runs()
        .iter()
        .map(|entry| (entry.started_at, RunStatusResponse::from(entry.value())))
        .collect();
    runs.sort_by(|a, b| b.0.cmp(&a.0));
    runs.into_iter().map(|(_, status)| status).collect()
}

/// Snapshot a single run.
pub fn run_status(state: &SharedState, id: Uuid) -> Result<RunStatusResponse, ServiceError> {
    state
        .runs()
        .get(&id)
        .map(|entry| RunStatusResponse::from(entry.value()))
        .ok_or_else(|| ServiceError::NotFound(format!("run `{id}` not found")))
}

fn build_plan(state: &SharedState, game_id: i64, request: PlayRequest) -> PlayPlan {
    let config = state.config();
    let pacing = PacingBounds::new(
        request.min_seconds.unwrap_or(config.default_min_seconds),
        request.max_seconds.unwrap_or(config.default_max_seconds),
        request.step_seconds.unwrap_or(config.default_step_seconds),
    );

    PlayPlan {
        game_id,
        credential: request.credential,
        rounds: request.rounds,
        mode: request.mode,
        pacing,
    }
}
