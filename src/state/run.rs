use std::time::SystemTime;

use tokio::sync::watch;
use uuid::Uuid;

use crate::services::automaton::{PlayMode, RunProgress};

/// Registry entry for a run spawned through the invocation surface.
pub struct RunEntry {
    /// Run identifier handed back to the caller.
    pub id: Uuid,
    /// Game being played.
    pub game_id: i64,
    /// Mode the run was started with.
    pub mode: PlayMode,
    /// Registration time.
    pub started_at: SystemTime,
    progress: watch::Receiver<RunProgress>,
}

impl RunEntry {
    /// Fresh entry reading its counters from `progress`.
    pub fn new(game_id: i64, mode: PlayMode, progress: watch::Receiver<RunProgress>) -> Self {
        Self {
            id: Uuid::new_v4(),
            game_id,
            mode,
            started_at: SystemTime::now(),
            progress,
        }
    }

    /// Latest counters published by the run.
    pub fn progress(&self) -> RunProgress {
        self.progress.borrow().clone()
    }
}
