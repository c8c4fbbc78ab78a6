//! The game-playing automaton: learns answers by probing, replays them from the store.

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::{sync::watch, time::sleep};
use tracing::{error, info, warn};

use crate::{
    client::{GameClient, Question, SessionState, SubmitOutcome},
    dao::{
        answer_store::AnswerStore,
        models::{AnswerEntity, QuestionEntity},
    },
    services::pacing::{self, PacingBounds},
};

/// Upper bound on answers submitted while draining an exhausted session.
pub const DRAIN_LIMIT: u32 = 32;

/// Delay before retrying a failed store lookup.
const LOOKUP_RETRY_DELAY: Duration = Duration::from_secs(1);

/// How the automaton counts rounds and paces itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayMode {
    /// Every round counts; no pacing; restart as soon as a session ends.
    #[default]
    Steady,
    /// Only newly learned questions count; an ended session is drained
    /// with throwaway answers before restarting; no pacing.
    FastFill,
    /// Every round counts and is followed by a randomized pause.
    PacedFill,
}

impl PlayMode {
    fn counts_cache_hits(self) -> bool {
        !matches!(self, PlayMode::FastFill)
    }

    fn paces_rounds(self) -> bool {
        matches!(self, PlayMode::PacedFill)
    }
}

/// Everything one run needs to know up front.
#[derive(Debug, Clone)]
pub struct PlayPlan {
    /// Remote game to play.
    pub game_id: i64,
    /// Session cookie forwarded to the remote game. Never logged.
    pub credential: String,
    /// Rounds to play; zero or negative means nothing is done.
    pub rounds: i64,
    /// Counting and pacing policy.
    pub mode: PlayMode,
    /// Delay bounds for paced modes.
    pub pacing: PacingBounds,
}

/// Counters published after every round of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunProgress {
    /// Rounds that counted towards the target.
    pub rounds_played: u64,
    /// Rounds still to play.
    pub rounds_remaining: u64,
    /// Questions answered from the store.
    pub cache_hits: u64,
    /// Questions answered blind and then recorded.
    pub probes: u64,
    /// Remote sessions opened.
    pub sessions_started: u64,
    /// Answer rows written.
    pub answers_recorded: u64,
    /// Store writes that failed.
    pub store_failures: u64,
    /// Correct submissions in the current remote session.
    pub score: u64,
    /// Lives left as last reported by the remote game.
    pub lives: i32,
    /// Set once the run has stopped.
    pub finished: bool,
}

/// Where the automaton stands between two remote calls.
enum Step {
    /// No live remote session; the next step starts one.
    SessionEnded,
    /// A question is on screen and the store has not been asked yet.
    Deciding(Question),
    /// The store knows the answer.
    Answering { question: Question, answer: String },
    /// The store does not know the answer; probe and learn.
    Recording(Question),
    /// A round was played; decide whether to go on.
    Advancing { state: SessionState, counted: bool },
}

/// Plays rounds against the remote game, consulting and filling the answer store.
#[derive(Clone)]
pub struct GameAutomaton {
    client: GameClient,
    store: Arc<dyn AnswerStore>,
}

impl GameAutomaton {
    /// Automaton playing through `client` and learning into `store`.
    pub fn new(client: GameClient, store: Arc<dyn AnswerStore>) -> Self {
        Self { client, store }
    }

    /// Drive one run to completion and return the final counters.
    ///
    /// The run ends only once the round counter reaches zero; remote failures
    /// are retried by [`GameClient`] and store write failures are skipped.
    pub async fn run(&self, plan: &PlayPlan, updates: &watch::Sender<RunProgress>) -> RunProgress {
        let mut progress = RunProgress {
            rounds_remaining: u64::try_from(plan.rounds).unwrap_or(0),
            ..RunProgress::default()
        };

        if progress.rounds_remaining == 0 {
            info!(game_id = plan.game_id, rounds = plan.rounds, "nothing to play");
            progress.finished = true;
            updates.send_replace(progress.clone());
            return progress;
        }

        info!(
            game_id = plan.game_id,
            rounds = progress.rounds_remaining,
            mode = ?plan.mode,
            "run started"
        );

        let mut step = Step::SessionEnded;
        loop {
            step = match step {
                Step::SessionEnded => self.start_session(plan, &mut progress).await,
                Step::Deciding(question) => self.decide(plan, question).await,
                Step::Answering { question, answer } => {
                    let outcome = self
                        .client
                        .submit_answer(plan.game_id, &plan.credential, &answer)
                        .await;
                    progress.cache_hits += 1;
                    note_outcome(&mut progress, &outcome);
                    info!(
                        game_id = plan.game_id,
                        question_id = question.id,
                        answer = %answer,
                        is_correct = outcome.is_correct,
                        score = progress.score,
                        lives = progress.lives,
                        "cached answer submitted"
                    );
                    Step::Advancing {
                        state: outcome.state,
                        counted: plan.mode.counts_cache_hits(),
                    }
                }
                Step::Recording(question) => {
                    let probe = question.first_candidate().to_owned();
                    let outcome = self
                        .client
                        .submit_answer(plan.game_id, &plan.credential, &probe)
                        .await;
                    progress.probes += 1;
                    note_outcome(&mut progress, &outcome);
                    self.record(plan, &question, &probe, &outcome, &mut progress)
                        .await;
                    Step::Advancing {
                        state: outcome.state,
                        counted: true,
                    }
                }
                Step::Advancing { state, counted } => {
                    if counted {
                        progress.rounds_played += 1;
                        progress.rounds_remaining -= 1;
                    }
                    updates.send_replace(progress.clone());

                    if progress.rounds_remaining == 0 {
                        break;
                    }
                    if plan.mode.paces_rounds() {
                        pacing::pause(&plan.pacing).await;
                    }
                    self.advance(plan, state).await
                }
            };
        }

        progress.finished = true;
        updates.send_replace(progress.clone());
        info!(
            game_id = plan.game_id,
            rounds_played = progress.rounds_played,
            cache_hits = progress.cache_hits,
            probes = progress.probes,
            sessions = progress.sessions_started,
            "run finished"
        );
        progress
    }

    async fn start_session(&self, plan: &PlayPlan, progress: &mut RunProgress) -> Step {
        let state = self
            .client
            .start_session(plan.game_id, &plan.credential)
            .await;
        progress.sessions_started += 1;
        progress.score = 0;
        progress.lives = state.lives_left;

        match state.question {
            Some(question) if state.lives_left > 0 => {
                info!(
                    game_id = plan.game_id,
                    question_id = question.id,
                    lives = state.lives_left,
                    "session started"
                );
                Step::Deciding(question)
            }
            _ => {
                warn!(
                    game_id = plan.game_id,
                    lives = state.lives_left,
                    phase = state.phase.as_deref().unwrap_or_default(),
                    "fresh session offered no playable question; restarting"
                );
                pacing::pause(&plan.pacing).await;
                Step::SessionEnded
            }
        }
    }

    async fn decide(&self, plan: &PlayPlan, question: Question) -> Step {
        match self.lookup(plan.game_id, question.id).await {
            Some(known) => Step::Answering {
                question,
                answer: known.name,
            },
            None => {
                info!(
                    game_id = plan.game_id,
                    question_id = question.id,
                    "answer not found; probing"
                );
                Step::Recording(question)
            }
        }
    }

    /// Ask the store until it answers; a read outage must not turn into a
    /// duplicate probe of an already known question.
    async fn lookup(&self, game_id: i64, question_id: i64) -> Option<AnswerEntity> {
        loop {
            match self.store.find_correct_answer(game_id, question_id).await {
                Ok(found) => return found,
                Err(err) => {
                    warn!(game_id, question_id, error = %err, "answer lookup failed; retrying");
                    sleep(LOOKUP_RETRY_DELAY).await;
                }
            }
        }
    }

    async fn record(
        &self,
        plan: &PlayPlan,
        question: &Question,
        probe: &str,
        outcome: &SubmitOutcome,
        progress: &mut RunProgress,
    ) {
        let marked = correct_index(&question.answers, probe, &outcome.correct_answer);
        if outcome.correct_answer.is_empty() && marked.is_some() {
            warn!(
                game_id = plan.game_id,
                question_id = question.id,
                probe,
                "correct answer withheld; assuming the probe was right"
            );
        }

        let entity = QuestionEntity::new(plan.game_id, question.id, question.image_url.clone());
        let stored = match self.store.insert_question(entity).await {
            Ok(stored) => stored,
            Err(err) => {
                progress.store_failures += 1;
                error!(
                    game_id = plan.game_id,
                    question_id = question.id,
                    error = %err,
                    "failed to record question; skipping its answers"
                );
                return;
            }
        };

        for (index, name) in question.answers.iter().enumerate() {
            let answer = AnswerEntity::new(stored.id, name.clone(), marked == Some(index));
            match self.store.insert_answer(answer).await {
                Ok(_) => progress.answers_recorded += 1,
                Err(err) => {
                    progress.store_failures += 1;
                    error!(
                        game_id = plan.game_id,
                        question_id = question.id,
                        answer = %name,
                        error = %err,
                        "failed to record answer"
                    );
                }
            }
        }
    }

    async fn advance(&self, plan: &PlayPlan, state: SessionState) -> Step {
        if state.is_exhausted() {
            info!(
                game_id = plan.game_id,
                lives = state.lives_left,
                "session exhausted; starting over"
            );
            if matches!(plan.mode, PlayMode::FastFill) {
                self.drain(plan, state).await;
            }
            return Step::SessionEnded;
        }

        match state.question {
            Some(question) => Step::Deciding(question),
            None => Step::SessionEnded,
        }
    }

    /// Burn through whatever questions the ended session still offers.
    async fn drain(&self, plan: &PlayPlan, mut state: SessionState) {
        let mut submitted = 0;
        while let Some(question) = state.question.take() {
            if submitted >= DRAIN_LIMIT {
                warn!(game_id = plan.game_id, submitted, "drain limit reached");
                return;
            }
            state = self
                .client
                .submit_answer(plan.game_id, &plan.credential, question.first_candidate())
                .await
                .state;
            submitted += 1;
        }
        if submitted > 0 {
            info!(game_id = plan.game_id, submitted, "session drained");
        }
    }
}

fn note_outcome(progress: &mut RunProgress, outcome: &SubmitOutcome) {
    if outcome.is_correct {
        progress.score += 1;
    }
    if outcome.is_timed_out {
        warn!("answer arrived after the question timed out");
    }
    progress.lives = outcome.state.lives_left;
}

/// Index of the candidate to mark correct.
///
/// The authoritative text wins when present. When it is empty the probed
/// candidate is assumed correct. At most one index is ever returned.
pub fn correct_index(candidates: &[String], probe: &str, correct_answer: &str) -> Option<usize> {
    let target = if correct_answer.is_empty() {
        probe
    } else {
        correct_answer
    };
    candidates.iter().position(|candidate| candidate == target)
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use futures::future::BoxFuture;
    use reqwest::StatusCode;
    use tokio::time::Instant;

    use super::*;
    use crate::{
        client::{GameApi, GameApiError, GameApiResult, RetryPolicy},
        dao::{
            answer_store::InMemoryAnswerStore,
            storage::{StorageError, StorageResult},
        },
    };

    /// Remote game replaying queued responses; the first `failures` calls of
    /// each kind fail with a transport error.
    #[derive(Default)]
    struct ScriptedApi {
        sessions: Mutex<VecDeque<SessionState>>,
        outcomes: Mutex<VecDeque<SubmitOutcome>>,
        submitted: Mutex<Vec<String>>,
        start_calls: AtomicUsize,
        submit_calls: AtomicUsize,
        failures: usize,
    }

    impl ScriptedApi {
        fn new(sessions: Vec<SessionState>, outcomes: Vec<SubmitOutcome>) -> Arc<Self> {
            Arc::new(Self {
                sessions: Mutex::new(sessions.into()),
                outcomes: Mutex::new(outcomes.into()),
                ..Self::default()
            })
        }

        fn submitted(&self) -> Vec<String> {
            self.submitted.lock().unwrap().clone()
        }

        fn starts(&self) -> usize {
            self.start_calls.load(Ordering::SeqCst)
        }
    }

    fn outage() -> GameApiError {
        GameApiError::Status {
            endpoint: "scripted".into(),
            status: StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    impl GameApi for ScriptedApi {
        fn start_session(
            &self,
            _game_id: i64,
            _credential: &str,
        ) -> BoxFuture<'static, GameApiResult<SessionState>> {
            let call = self.start_calls.fetch_add(1, Ordering::SeqCst);
            let next = if call < self.failures {
                Err(outage())
            } else {
                Ok(self
                    .sessions
                    .lock()
                    .unwrap()
                    .pop_front()
                    .expect("script ran out of sessions"))
            };
            Box::pin(async move { next })
        }

        fn submit_answer(
            &self,
            _game_id: i64,
            _credential: &str,
            answer: &str,
        ) -> BoxFuture<'static, GameApiResult<SubmitOutcome>> {
            let call = self.submit_calls.fetch_add(1, Ordering::SeqCst);
            self.submitted.lock().unwrap().push(answer.to_owned());
            let next = if call < self.failures {
                Err(outage())
            } else {
                Ok(self
                    .outcomes
                    .lock()
                    .unwrap()
                    .pop_front()
                    .expect("script ran out of outcomes"))
            };
            Box::pin(async move { next })
        }
    }

    /// In-memory store whose first lookups fail and whose question inserts
    /// can be switched off.
    #[derive(Clone, Default)]
    struct FlakyStore {
        inner: InMemoryAnswerStore,
        lookup_failures: Arc<AtomicUsize>,
        reject_questions: bool,
    }

    impl AnswerStore for FlakyStore {
        fn find_correct_answer(
            &self,
            game_id: i64,
            external_question_id: i64,
        ) -> BoxFuture<'static, StorageResult<Option<AnswerEntity>>> {
            let remaining = self.lookup_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.lookup_failures.store(remaining - 1, Ordering::SeqCst);
                return Box::pin(async { Err(StorageError::rejected("lookup outage")) });
            }
            self.inner.find_correct_answer(game_id, external_question_id)
        }

        fn insert_question(
            &self,
            question: QuestionEntity,
        ) -> BoxFuture<'static, StorageResult<QuestionEntity>> {
            if self.reject_questions {
                return Box::pin(async { Err(StorageError::rejected("read-only")) });
            }
            self.inner.insert_question(question)
        }

        fn insert_answer(
            &self,
            answer: AnswerEntity,
        ) -> BoxFuture<'static, StorageResult<AnswerEntity>> {
            self.inner.insert_answer(answer)
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.health_check()
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.try_reconnect()
        }
    }

    fn question(id: i64, answers: &[&str]) -> Question {
        Question {
            id,
            image_url: format!("https://img/{id}.jpg"),
            answers: answers.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn state(question: Option<Question>, lives_left: i32) -> SessionState {
        SessionState {
            question,
            lives_left,
            points: 0,
            phase: None,
        }
    }

    fn outcome(is_correct: bool, correct_answer: &str, next: SessionState) -> SubmitOutcome {
        SubmitOutcome {
            is_correct,
            is_timed_out: false,
            correct_answer: correct_answer.into(),
            state: next,
        }
    }

    fn plan(rounds: i64, mode: PlayMode) -> PlayPlan {
        PlayPlan {
            game_id: 42,
            credential: "session=abc".into(),
            rounds,
            mode,
            pacing: PacingBounds::new(3, 3, 1),
        }
    }

    fn automaton(api: Arc<ScriptedApi>, store: Arc<dyn AnswerStore>) -> GameAutomaton {
        GameAutomaton::new(GameClient::new(api, RetryPolicy::immediate()), store)
    }

    async fn seed(store: &InMemoryAnswerStore, external_id: i64, correct: &str) {
        let stored = store
            .insert_question(QuestionEntity::new(42, external_id, "seeded"))
            .await
            .unwrap();
        store
            .insert_answer(AnswerEntity::new(stored.id, correct, true))
            .await
            .unwrap();
    }

    async fn play(automaton: &GameAutomaton, plan: &PlayPlan) -> RunProgress {
        let (tx, rx) = watch::channel(RunProgress::default());
        let progress = automaton.run(plan, &tx).await;
        assert_eq!(*rx.borrow(), progress);
        progress
    }

    #[tokio::test]
    async fn learns_on_miss_then_replays_from_the_store() {
        let q7 = question(7, &["A", "B", "C"]);
        let api = ScriptedApi::new(
            vec![state(Some(q7.clone()), 3)],
            vec![
                outcome(false, "B", state(Some(q7.clone()), 2)),
                outcome(true, "B", state(Some(question(8, &["D"])), 2)),
            ],
        );
        let store = InMemoryAnswerStore::new();
        let automaton = automaton(api.clone(), Arc::new(store.clone()));

        let progress = play(&automaton, &plan(2, PlayMode::Steady)).await;

        assert_eq!(api.submitted(), vec!["A", "B"]);
        assert_eq!(api.starts(), 1);

        let questions = store.questions().await;
        assert_eq!(questions.len(), 1);
        assert_eq!((questions[0].game_id, questions[0].external_id), (42, 7));

        let answers = store.answers().await;
        let names: Vec<_> = answers.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        let correct: Vec<_> = answers.iter().filter(|a| a.is_correct).collect();
        assert_eq!(correct.len(), 1);
        assert_eq!(correct[0].name, "B");
        assert!(answers.iter().all(|a| a.question_id == questions[0].id));

        assert_eq!(progress.probes, 1);
        assert_eq!(progress.cache_hits, 1);
        assert_eq!(progress.rounds_played, 2);
        assert_eq!(progress.rounds_remaining, 0);
        assert_eq!(progress.answers_recorded, 3);
        assert!(progress.finished);
    }

    #[tokio::test]
    async fn non_positive_rounds_make_no_calls() {
        for rounds in [0, -3] {
            let api = ScriptedApi::new(Vec::new(), Vec::new());
            let store = InMemoryAnswerStore::new();
            let automaton = automaton(api.clone(), Arc::new(store.clone()));

            let progress = play(&automaton, &plan(rounds, PlayMode::Steady)).await;

            assert_eq!(api.starts(), 0);
            assert!(api.submitted().is_empty());
            assert!(store.questions().await.is_empty());
            assert!(progress.finished);
            assert_eq!(progress.rounds_played, 0);
        }
    }

    #[tokio::test]
    async fn steady_counts_every_round_and_restarts_exhausted_sessions() {
        let q1 = question(1, &["X", "Y"]);
        let api = ScriptedApi::new(
            vec![state(Some(q1.clone()), 1), state(Some(q1.clone()), 1)],
            vec![
                outcome(false, "Y", state(Some(question(2, &["Z"])), 0)),
                outcome(true, "Y", state(Some(question(3, &["P", "Q"])), 1)),
                outcome(true, "P", state(Some(question(4, &["R"])), 1)),
            ],
        );
        let store = InMemoryAnswerStore::new();
        let automaton = automaton(api.clone(), Arc::new(store.clone()));

        let progress = play(&automaton, &plan(3, PlayMode::Steady)).await;

        assert_eq!(api.submitted(), vec!["X", "Y", "P"]);
        assert_eq!(api.starts(), 2);
        assert_eq!(progress.sessions_started, 2);
        assert_eq!(progress.rounds_played, 3);
        assert_eq!(progress.cache_hits, 1);
        assert_eq!(progress.probes, 2);
        assert_eq!(progress.score, 2);
        assert_eq!(store.questions().await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn fast_fill_counts_probes_only_and_drains_ended_sessions() {
        let store = InMemoryAnswerStore::new();
        seed(&store, 1, "B").await;

        let api = ScriptedApi::new(
            vec![
                state(Some(question(1, &["A", "B"])), 2),
                state(Some(question(5, &["H"])), 2),
            ],
            vec![
                outcome(true, "B", state(Some(question(2, &["C", "D"])), 2)),
                outcome(false, "D", state(Some(question(3, &["E", "F"])), 0)),
                outcome(false, "", state(Some(question(4, &["G"])), 0)),
                outcome(false, "", state(None, 0)),
                outcome(true, "H", state(Some(question(6, &["I"])), 2)),
            ],
        );
        let automaton = automaton(api.clone(), Arc::new(store.clone()));

        let started = Instant::now();
        let progress = play(&automaton, &plan(2, PlayMode::FastFill)).await;

        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(api.submitted(), vec!["B", "C", "E", "G", "H"]);
        assert_eq!(api.starts(), 2);
        assert_eq!(progress.cache_hits, 1);
        assert_eq!(progress.probes, 2);
        assert_eq!(progress.rounds_played, 2);

        let learned: Vec<_> = store
            .questions()
            .await
            .into_iter()
            .filter(|q| q.name != "seeded")
            .map(|q| q.external_id)
            .collect();
        assert_eq!(learned.len(), 2);
        assert!(learned.contains(&2) && learned.contains(&5));
    }

    #[tokio::test(start_paused = true)]
    async fn drain_stops_at_the_limit() {
        let endless = || outcome(false, "", state(Some(question(9, &["K"])), 0));
        let mut outcomes = vec![outcome(false, "K", state(Some(question(9, &["K"])), 0))];
        outcomes.extend((0..DRAIN_LIMIT).map(|_| endless()));
        outcomes.push(outcome(true, "M", state(None, 1)));

        let api = ScriptedApi::new(
            vec![
                state(Some(question(9, &["K"])), 1),
                state(Some(question(10, &["M"])), 1),
            ],
            outcomes,
        );
        let automaton = automaton(api.clone(), Arc::new(InMemoryAnswerStore::new()));

        let progress = play(&automaton, &plan(2, PlayMode::FastFill)).await;

        assert_eq!(api.submitted().len(), 1 + DRAIN_LIMIT as usize + 1);
        assert_eq!(api.starts(), 2);
        assert_eq!(progress.probes, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn paced_fill_counts_hits_and_sleeps_between_rounds() {
        let store = InMemoryAnswerStore::new();
        seed(&store, 1, "A").await;

        let api = ScriptedApi::new(
            vec![state(Some(question(1, &["A"])), 3)],
            vec![
                outcome(true, "A", state(Some(question(2, &["B"])), 3)),
                outcome(true, "B", state(Some(question(3, &["C"])), 3)),
            ],
        );
        let automaton = automaton(api.clone(), Arc::new(store.clone()));

        let started = Instant::now();
        let progress = play(&automaton, &plan(2, PlayMode::PacedFill)).await;

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(4));
        assert_eq!(progress.cache_hits, 1);
        assert_eq!(progress.probes, 1);
        assert_eq!(progress.rounds_played, 2);
    }

    #[tokio::test]
    async fn empty_candidate_list_probes_the_empty_string() {
        let api = ScriptedApi::new(
            vec![state(Some(question(3, &[])), 3)],
            vec![outcome(false, "", state(Some(question(4, &["A"])), 2))],
        );
        let store = InMemoryAnswerStore::new();
        let automaton = automaton(api.clone(), Arc::new(store.clone()));

        let progress = play(&automaton, &plan(1, PlayMode::Steady)).await;

        assert_eq!(api.submitted(), vec![""]);
        assert_eq!(store.questions().await.len(), 1);
        assert!(store.answers().await.is_empty());
        assert_eq!(progress.answers_recorded, 0);
    }

    #[tokio::test]
    async fn withheld_correct_answer_marks_the_probe() {
        let api = ScriptedApi::new(
            vec![state(Some(question(5, &["A", "B", "C"])), 3)],
            vec![outcome(true, "", state(Some(question(6, &["D"])), 3))],
        );
        let store = InMemoryAnswerStore::new();
        let automaton = automaton(api.clone(), Arc::new(store.clone()));

        play(&automaton, &plan(1, PlayMode::Steady)).await;

        let marked: Vec<_> = store
            .answers()
            .await
            .into_iter()
            .filter(|a| a.is_correct)
            .map(|a| a.name)
            .collect();
        assert_eq!(marked, vec!["A"]);
    }

    #[tokio::test]
    async fn transport_failures_are_retried_transparently() {
        let api = Arc::new(ScriptedApi {
            sessions: Mutex::new(vec![state(Some(question(1, &["A"])), 3)].into()),
            outcomes: Mutex::new(vec![outcome(true, "A", state(None, 3))].into()),
            failures: 2,
            ..ScriptedApi::default()
        });
        let store = InMemoryAnswerStore::new();
        let automaton = automaton(api.clone(), Arc::new(store.clone()));

        let progress = play(&automaton, &plan(1, PlayMode::Steady)).await;

        assert_eq!(api.starts(), 3);
        assert_eq!(api.submitted(), vec!["A", "A", "A"]);
        assert_eq!(progress.sessions_started, 1);
        assert_eq!(progress.probes, 1);
        assert_eq!(store.answers().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn lookup_outage_does_not_cause_a_probe() {
        let store = FlakyStore {
            lookup_failures: Arc::new(AtomicUsize::new(2)),
            ..FlakyStore::default()
        };
        seed(&store.inner, 1, "B").await;

        let api = ScriptedApi::new(
            vec![state(Some(question(1, &["A", "B"])), 3)],
            vec![outcome(true, "B", state(None, 3))],
        );
        let automaton = automaton(api.clone(), Arc::new(store.clone()));

        let started = Instant::now();
        let progress = play(&automaton, &plan(1, PlayMode::Steady)).await;

        assert!(started.elapsed() >= Duration::from_secs(2));
        assert_eq!(api.submitted(), vec!["B"]);
        assert_eq!(progress.cache_hits, 1);
        assert_eq!(progress.probes, 0);
    }

    #[tokio::test]
    async fn failed_question_insert_skips_its_answers() {
        let store = FlakyStore {
            reject_questions: true,
            ..FlakyStore::default()
        };
        let api = ScriptedApi::new(
            vec![state(Some(question(1, &["A", "B"])), 3)],
            vec![outcome(false, "B", state(None, 2))],
        );
        let automaton = automaton(api.clone(), Arc::new(store.clone()));

        let progress = play(&automaton, &plan(1, PlayMode::Steady)).await;

        assert_eq!(progress.store_failures, 1);
        assert_eq!(progress.answers_recorded, 0);
        assert!(store.inner.answers().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_fresh_session_is_restarted_after_a_pause() {
        let api = ScriptedApi::new(
            vec![state(None, 3), state(Some(question(1, &["A"])), 3)],
            vec![outcome(true, "A", state(None, 3))],
        );
        let automaton = automaton(api.clone(), Arc::new(InMemoryAnswerStore::new()));

        let started = Instant::now();
        let progress = play(&automaton, &plan(1, PlayMode::Steady)).await;

        assert!(started.elapsed() >= Duration::from_secs(3));
        assert_eq!(api.starts(), 2);
        assert_eq!(progress.sessions_started, 2);
        assert_eq!(progress.rounds_played, 1);
    }

    #[test]
    fn correct_index_prefers_the_authoritative_text() {
        let candidates: Vec<String> = ["A", "B", "B"].iter().map(|s| s.to_string()).collect();

        assert_eq!(correct_index(&candidates, "A", "B"), Some(1));
        assert_eq!(correct_index(&candidates, "A", ""), Some(0));
        assert_eq!(correct_index(&candidates, "A", "Z"), None);
        assert_eq!(correct_index(&[], "", ""), None);
    }

    #[test]
    fn play_mode_uses_snake_case_names() {
        let mode: PlayMode = serde_json::from_str("\"paced_fill\"").unwrap();
        assert_eq!(mode, PlayMode::PacedFill);
        assert_eq!(serde_json::to_string(&PlayMode::FastFill).unwrap(), "\"fast_fill\"");
    }
}
