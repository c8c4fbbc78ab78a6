use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{format_system_time, validation::validate_credential},
    services::automaton::{PlayMode, RunProgress},
    state::RunEntry,
};

/// Body of `POST /games/{game_id}/play`.
#[derive(Debug, Deserialize, Validate)]
pub struct PlayRequest {
    /// Cookie forwarded verbatim to the remote game.
    #[validate(custom(function = "validate_credential"))]
    pub credential: String,
    /// Rounds to play; zero or negative starts a run that does nothing.
    pub rounds: i64,
    /// How rounds are counted and paced.
    #[serde(default)]
    pub mode: PlayMode,
    /// Pacing bounds in seconds; configuration defaults apply when omitted.
    #[serde(default)]
    pub max_seconds: Option<i64>,
    /// Lower pacing bound.
    #[serde(default)]
    pub min_seconds: Option<i64>,
    /// Pacing step.
    #[serde(default)]
    pub step_seconds: Option<i64>,
    /// Block until the run finishes and return its final counters.
    #[serde(default)]
    pub wait: bool,
}

/// Returned with `202 Accepted` once a run has been spawned.
#[derive(Debug, Serialize, Deserialize)]
pub struct PlayAccepted {
    /// Identifier to poll with `GET /runs/{id}`.
    pub run_id: Uuid,
}

/// Snapshot of a registered run.
#[derive(Debug, Serialize)]
pub struct RunStatusResponse {
    /// Run identifier.
    pub id: Uuid,
    /// Game being played.
    pub game_id: i64,
    /// Mode the run was started with.
    pub mode: PlayMode,
    /// RFC 3339 start time.
    pub started_at: String,
    /// Latest counters, flattened into the response.
    #[serde(flatten)]
    pub progress: RunProgress,
}

impl From<&RunEntry> for RunStatusResponse {
    fn from(entry: &RunEntry) -> Self {
        Self {
            id: entry.id,
            game_id: entry.game_id,
            mode: entry.mode,
            started_at: format_system_time(entry.started_at),
            progress: entry.progress(),
        }
    }
}
