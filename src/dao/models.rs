use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Question observed on the remote game, keyed by (game id, external question id).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Surrogate key of the row.
    pub id: Uuid,
    /// Identifier of the question on the remote game service.
    pub external_id: i64,
    /// Identifier of the remote game the question belongs to.
    pub game_id: i64,
    /// Display name, derived from the question prompt (image reference).
    pub name: String,
    /// Soft-delete flag. Deleted rows are ignored by lookups.
    pub is_deleted: bool,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last time the row was updated.
    pub updated_at: SystemTime,
}

impl QuestionEntity {
    /// Build a fresh, non-deleted question row with a new surrogate key.
    pub fn new(game_id: i64, external_id: i64, name: impl Into<String>) -> Self {
        let now = SystemTime::now();
        Self {
            id: Uuid::new_v4(),
            external_id,
            game_id,
            name: name.into(),
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Candidate answer offered by the remote game for a recorded question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerEntity {
    /// Surrogate key of the row.
    pub id: Uuid,
    /// Owning [`QuestionEntity::id`].
    pub question_id: Uuid,
    /// Candidate text exactly as offered by the remote game.
    pub name: String,
    /// Whether this candidate is the known correct answer.
    pub is_correct: bool,
    /// Soft-delete flag. Deleted rows are ignored by lookups.
    pub is_deleted: bool,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last time the row was updated.
    pub updated_at: SystemTime,
}

impl AnswerEntity {
    /// Build a fresh, non-deleted answer row linked to `question_id`.
    pub fn new(question_id: Uuid, name: impl Into<String>, is_correct: bool) -> Self {
        let now = SystemTime::now();
        Self {
            id: Uuid::new_v4(),
            question_id,
            name: name.into(),
            is_correct,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }
}
