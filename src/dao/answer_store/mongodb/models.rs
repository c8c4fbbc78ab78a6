use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{AnswerEntity, QuestionEntity};

use super::error::MongoDaoError;

// Identifiers are stored as hyphenated strings so filters stay plain equality matches.

/// Stored form of a question row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoQuestionDocument {
    #[serde(rename = "_id")]
    pub(super) id: String,
    external_id: i64,
    game_id: i64,
    name: String,
    #[serde(default)]
    is_deleted: bool,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<QuestionEntity> for MongoQuestionDocument {
    fn from(value: QuestionEntity) -> Self {
        Self {
            id: value.id.to_string(),
            external_id: value.external_id,
            game_id: value.game_id,
            name: value.name,
            is_deleted: value.is_deleted,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

/// Stored form of an answer row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoAnswerDocument {
    #[serde(rename = "_id")]
    pub(super) id: String,
    question_id: String,
    name: String,
    is_correct: bool,
    #[serde(default)]
    is_deleted: bool,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<AnswerEntity> for MongoAnswerDocument {
    fn from(value: AnswerEntity) -> Self {
        Self {
            id: value.id.to_string(),
            question_id: value.question_id.to_string(),
            name: value.name,
            is_correct: value.is_correct,
            is_deleted: value.is_deleted,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl TryFrom<MongoAnswerDocument> for AnswerEntity {
    type Error = MongoDaoError;

    fn try_from(doc: MongoAnswerDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(&doc.id)?,
            question_id: parse_id(&doc.question_id)?,
            name: doc.name,
            is_correct: doc.is_correct,
            is_deleted: doc.is_deleted,
            created_at: doc.created_at.to_system_time(),
            updated_at: doc.updated_at.to_system_time(),
        })
    }
}

fn parse_id(value: &str) -> Result<Uuid, MongoDaoError> {
    Uuid::parse_str(value).map_err(|_| MongoDaoError::InvalidId {
        value: value.to_owned(),
    })
}
