//! Learn-then-replay scenario through the public automaton API.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use futures::future::BoxFuture;
use tokio::sync::watch;

use guess_game_back::{
    client::{
        GameApi, GameApiResult, GameClient, Question, RetryPolicy, SessionState, SubmitOutcome,
    },
    dao::answer_store::InMemoryAnswerStore,
    services::{
        automaton::{GameAutomaton, PlayMode, PlayPlan, RunProgress},
        pacing::PacingBounds,
    },
};

#[derive(Default)]
struct Script {
    sessions: VecDeque<SessionState>,
    outcomes: VecDeque<SubmitOutcome>,
    submitted: Vec<String>,
}

#[derive(Clone, Default)]
struct ScriptedGame(Arc<Mutex<Script>>);

impl GameApi for ScriptedGame {
    fn start_session(
        &self,
        _game_id: i64,
        _credential: &str,
    ) -> BoxFuture<'static, GameApiResult<SessionState>> {
        let next = self.0.lock().unwrap().sessions.pop_front();
        Box::pin(async move { Ok(next.expect("unexpected session start")) })
    }

    fn submit_answer(
        &self,
        _game_id: i64,
        _credential: &str,
        answer: &str,
    ) -> BoxFuture<'static, GameApiResult<SubmitOutcome>> {
        let mut script = self.0.lock().unwrap();
        script.submitted.push(answer.to_owned());
        let next = script.outcomes.pop_front();
        Box::pin(async move { Ok(next.expect("unexpected answer")) })
    }
}

fn on_screen(id: i64, answers: &[&str], lives_left: i32) -> SessionState {
    SessionState {
        question: Some(Question {
            id,
            image_url: format!("https://img/{id}.jpg"),
            answers: answers.iter().map(|a| a.to_string()).collect(),
        }),
        lives_left,
        points: 0,
        phase: None,
    }
}

#[tokio::test]
async fn probe_records_then_cache_replays() {
    let game = ScriptedGame::default();
    {
        let mut script = game.0.lock().unwrap();
        script.sessions.push_back(on_screen(7, &["A", "B", "C"], 3));
        script.outcomes.push_back(SubmitOutcome {
            is_correct: false,
            is_timed_out: false,
            correct_answer: "B".into(),
            state: on_screen(7, &["A", "B", "C"], 2),
        });
        script.outcomes.push_back(SubmitOutcome {
            is_correct: true,
            is_timed_out: false,
            correct_answer: "B".into(),
            state: on_screen(8, &["D", "E"], 2),
        });
    }

    let store = InMemoryAnswerStore::new();
    let automaton = GameAutomaton::new(
        GameClient::new(Arc::new(game.clone()), RetryPolicy::immediate()),
        Arc::new(store.clone()),
    );
    let plan = PlayPlan {
        game_id: 42,
        credential: "session=abc".into(),
        rounds: 2,
        mode: PlayMode::Steady,
        pacing: PacingBounds::default(),
    };

    let (tx, rx) = watch::channel(RunProgress::default());
    let progress = automaton.run(&plan, &tx).await;

    assert_eq!(game.0.lock().unwrap().submitted, vec!["A", "B"]);

    let questions = store.questions().await;
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].external_id, 7);
    assert_eq!(questions[0].name, "https://img/7.jpg");

    let answers = store.answers().await;
    assert_eq!(answers.len(), 3);
    let correct: Vec<_> = answers
        .iter()
        .filter(|a| a.is_correct)
        .map(|a| a.name.as_str())
        .collect();
    assert_eq!(correct, vec!["B"]);

    assert!(progress.finished);
    assert_eq!(progress.rounds_played, 2);
    assert_eq!(progress.score, 1);
    assert_eq!(progress.lives, 2);
    assert_eq!(*rx.borrow(), progress);
}
