//! Wire format of the remote guessing-game API.

use serde::{Deserialize, Serialize};

use super::{Question, SessionState, SubmitOutcome};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGameRequest {
    pub game_id: i64,
}

#[derive(Debug, Serialize)]
pub struct AnswerRequest<'a> {
    pub answer: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuestionPayload {
    pub id: i64,
    pub image_url: String,
    pub answers: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StateDataPayload {
    pub game_id: Option<i64>,
    pub lives_count: Option<i32>,
    pub question: Option<QuestionPayload>,
    pub question_time: Option<i64>,
    pub accumulate_time: Option<bool>,
    pub lives_left: i32,
    pub points: i64,
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGameResponse {
    pub state_data: StateDataPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    #[serde(default)]
    pub is_correct: bool,
    #[serde(default)]
    pub is_timed_out: bool,
    /// Absent and `null` both mean the service withheld the answer.
    #[serde(default)]
    pub correct_answer: Option<String>,
    pub state_data: StateDataPayload,
}

impl From<QuestionPayload> for Question {
    fn from(value: QuestionPayload) -> Self {
        Self {
            id: value.id,
            image_url: value.image_url,
            answers: value.answers,
        }
    }
}

impl From<StateDataPayload> for SessionState {
    fn from(value: StateDataPayload) -> Self {
        Self {
            question: value.question.map(Into::into),
            lives_left: value.lives_left,
            points: value.points,
            phase: value.state,
        }
    }
}

impl From<StartGameResponse> for SessionState {
    fn from(value: StartGameResponse) -> Self {
        value.state_data.into()
    }
}

impl From<AnswerResponse> for SubmitOutcome {
    fn from(value: AnswerResponse) -> Self {
        Self {
            is_correct: value.is_correct,
            is_timed_out: value.is_timed_out,
            correct_answer: value.correct_answer.unwrap_or_default(),
            state: value.state_data.into(),
        }
    }
}
