//! Client for the remote guessing-game service.

mod error;
mod http;
mod models;
mod retry;

use futures::future::BoxFuture;

pub use error::{GameApiError, GameApiResult};
pub use http::{HttpGameApi, HttpGameApiConfig};
pub use retry::{GameClient, RetryPolicy};

/// Question currently awaiting an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Identifier of the question on the remote service.
    pub id: i64,
    /// Prompt reference (a still from the movie to guess).
    pub image_url: String,
    /// Candidate answers in the order the service offers them.
    pub answers: Vec<String>,
}

impl Question {
    /// First offered candidate, or the empty string when none are offered.
    pub fn first_candidate(&self) -> &str {
        self.answers.first().map(String::as_str).unwrap_or_default()
    }
}

/// Remote session state as reported after each call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Next question; `None` once the remote session is over.
    pub question: Option<Question>,
    /// Lives left in the session.
    pub lives_left: i32,
    /// Points earned so far in the session.
    pub points: i64,
    /// Raw phase label reported by the service, if any.
    pub phase: Option<String>,
}

impl SessionState {
    /// Whether the session cannot continue: no lives left or no question offered.
    pub fn is_exhausted(&self) -> bool {
        self.lives_left <= 0 || self.question.is_none()
    }
}

/// Result of submitting an answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// Whether the submitted answer was right.
    pub is_correct: bool,
    /// Whether the service gave up waiting for the answer.
    pub is_timed_out: bool,
    /// Authoritative correct answer; empty when the service withheld it.
    pub correct_answer: String,
    /// Session state after the submission.
    pub state: SessionState,
}

/// The two calls the automaton makes against the remote game.
pub trait GameApi: Send + Sync {
    /// Open a new session on `game_id` and return its first question.
    fn start_session(
        &self,
        game_id: i64,
        credential: &str,
    ) -> BoxFuture<'static, GameApiResult<SessionState>>;
    /// Answer the question currently on screen.
    fn submit_answer(
        &self,
        game_id: i64,
        credential: &str,
        answer: &str,
    ) -> BoxFuture<'static, GameApiResult<SubmitOutcome>>;
}
