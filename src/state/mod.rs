mod run;

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::{RwLock, watch};
use uuid::Uuid;

use crate::{
    client::GameClient, config::AppConfig, dao::answer_store::AnswerStore, error::ServiceError,
};

pub use self::run::RunEntry;

/// Handle shared by every request handler and background task.
pub type SharedState = Arc<AppState>;

/// Finished runs kept in the registry; older ones are pruned on registration.
pub const FINISHED_RUN_RETENTION: usize = 64;

/// Central application state: the answer store handle, the remote game client
/// and the registry of runs started through the HTTP surface.
pub struct AppState {
    answer_store: RwLock<Option<Arc<dyn AnswerStore>>>,
    degraded: watch::Sender<bool>,
    runs: DashMap<Uuid, RunEntry>,
    live_games: DashMap<i64, Uuid>,
    client: GameClient,
    config: AppConfig,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig, client: GameClient) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            answer_store: RwLock::new(None),
            degraded: degraded_tx,
            runs: DashMap::new(),
            live_games: DashMap::new(),
            client,
            config,
        })
    }

    /// Obtain a handle to the current answer store, if one is installed.
    pub async fn answer_store(&self) -> Option<Arc<dyn AnswerStore>> {
        let guard = self.answer_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current store, or [`ServiceError::Degraded`] while storage is down.
    pub async fn require_answer_store(&self) -> Result<Arc<dyn AnswerStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.answer_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new answer store implementation and leave degraded mode.
    pub async fn set_answer_store(&self, store: Arc<dyn AnswerStore>) {
        {
            let mut guard = self.answer_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Runs started since the process came up, finished ones included.
    pub fn runs(&self) -> &DashMap<Uuid, RunEntry> {
        &self.runs
    }

    /// Add a run to the registry, dropping the oldest finished runs beyond
    /// [`FINISHED_RUN_RETENTION`]. Live runs are never pruned.
    pub fn register_run(&self, entry: RunEntry) {
        self.runs.insert(entry.id, entry);

        let mut finished: Vec<_> = self
            .runs
            .iter()
            .filter(|entry| entry.progress().finished)
            .map(|entry| (entry.started_at, entry.id))
            .collect();
        if finished.len() <= FINISHED_RUN_RETENTION {
            return;
        }

        finished.sort_unstable();
        let excess = finished.len() - FINISHED_RUN_RETENTION;
        for (_, id) in finished.into_iter().take(excess) {
            self.runs.remove(&id);
        }
    }

    /// Reserve `game_id` for `run_id`.
    ///
    /// Two live runs on one game could both learn the same question and record
    /// two correct answers for it, so a second claim fails with the holder's id
    /// until the holder finishes or is released.
    pub fn claim_game(&self, game_id: i64, run_id: Uuid) -> Result<(), Uuid> {
        match self.live_games.entry(game_id) {
            Entry::Vacant(slot) => {
                slot.insert(run_id);
                Ok(())
            }
            Entry::Occupied(mut slot) => {
                let holder = *slot.get();
                let holder_live = self
                    .runs
                    .get(&holder)
                    .is_some_and(|entry| !entry.progress().finished);
                if holder_live {
                    return Err(holder);
                }
                slot.insert(run_id);
                Ok(())
            }
        }
    }

    /// Free `game_id` if `run_id` still holds it.
    pub fn release_game(&self, game_id: i64, run_id: Uuid) {
        self.live_games.remove_if(&game_id, |_, holder| *holder == run_id);
    }

    /// Retrying client for the remote game service.
    pub fn game_client(&self) -> &GameClient {
        &self.client
    }

    /// Configuration loaded at startup.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        client::{GameClient, HttpGameApi, RetryPolicy},
        services::automaton::{PlayMode, RunProgress},
    };

    use super::*;

    fn app_state() -> SharedState {
        let config = AppConfig::default();
        let api = HttpGameApi::new(config.game_api()).unwrap();
        AppState::new(config, GameClient::new(Arc::new(api), RetryPolicy::immediate()))
    }

    fn entry(game_id: i64, finished: bool) -> (RunEntry, watch::Sender<RunProgress>) {
        let (updates, progress) = watch::channel(RunProgress {
            finished,
            ..RunProgress::default()
        });
        (RunEntry::new(game_id, PlayMode::Steady, progress), updates)
    }

    #[test]
    fn registry_keeps_a_bounded_tail_of_finished_runs() {
        let state = app_state();

        let (live, _live_updates) = entry(1, false);
        let live_id = live.id;
        state.register_run(live);

        let mut senders = Vec::new();
        for game_id in 0..(FINISHED_RUN_RETENTION as i64 + 10) {
            let (done, updates) = entry(game_id, true);
            senders.push(updates);
            state.register_run(done);
        }

        assert_eq!(state.runs().len(), FINISHED_RUN_RETENTION + 1);
        assert!(state.runs().contains_key(&live_id));
    }

    #[test]
    fn a_game_is_held_by_one_live_run_at_a_time() {
        let state = app_state();

        let (first, first_updates) = entry(5, false);
        let first_id = first.id;
        state.register_run(first);
        let (second, _second_updates) = entry(5, false);
        let second_id = second.id;
        state.register_run(second);

        assert_eq!(state.claim_game(5, first_id), Ok(()));
        assert_eq!(state.claim_game(5, second_id), Err(first_id));
        assert_eq!(state.claim_game(6, second_id), Ok(()));

        first_updates.send_modify(|progress| progress.finished = true);
        assert_eq!(state.claim_game(5, second_id), Ok(()));

        // A stale release from the first run leaves the new holder in place.
        state.release_game(5, first_id);
        let (third, _third_updates) = entry(5, false);
        let third_id = third.id;
        state.register_run(third);
        assert_eq!(state.claim_game(5, third_id), Err(second_id));

        state.release_game(5, second_id);
        assert_eq!(state.claim_game(5, third_id), Ok(()));
    }
}
