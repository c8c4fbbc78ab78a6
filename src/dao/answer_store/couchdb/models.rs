use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::dao::{
    answer_store::couchdb::error::CouchDaoError,
    models::{AnswerEntity, QuestionEntity},
};

pub(super) const QUESTION_PREFIX: &str = "question::";
pub(super) const ANSWER_PREFIX: &str = "answer::";
pub(super) const QUESTION_KIND: &str = "question";
pub(super) const ANSWER_KIND: &str = "answer";

/// Response body of a Mango `_find` query.
#[derive(Debug, Deserialize)]
pub struct FindResponse<T> {
    pub(super) docs: Vec<T>,
}

/// Stored form of a question row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchQuestionDocument {
    #[serde(rename = "_id")]
    pub(super) id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    rev: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    external_id: i64,
    game_id: i64,
    name: String,
    #[serde(default)]
    is_deleted: bool,
    created_at: SystemTime,
    updated_at: SystemTime,
}

impl From<QuestionEntity> for CouchQuestionDocument {
    fn from(value: QuestionEntity) -> Self {
        Self {
            id: question_doc_id(value.id),
            rev: None,
            kind: QUESTION_KIND.into(),
            external_id: value.external_id,
            game_id: value.game_id,
            name: value.name,
            is_deleted: value.is_deleted,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// Stored form of an answer row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchAnswerDocument {
    #[serde(rename = "_id")]
    pub(super) id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    rev: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    /// Document id of the owning question.
    question_id: String,
    name: String,
    is_correct: bool,
    #[serde(default)]
    is_deleted: bool,
    created_at: SystemTime,
    updated_at: SystemTime,
}

impl From<AnswerEntity> for CouchAnswerDocument {
    fn from(value: AnswerEntity) -> Self {
        Self {
            id: answer_doc_id(value.id),
            rev: None,
            kind: ANSWER_KIND.into(),
            question_id: question_doc_id(value.question_id),
            name: value.name,
            is_correct: value.is_correct,
            is_deleted: value.is_deleted,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl TryFrom<CouchAnswerDocument> for AnswerEntity {
    type Error = CouchDaoError;

    fn try_from(doc: CouchAnswerDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: extract_uuid(&doc.id)?,
            question_id: extract_uuid(&doc.question_id)?,
            name: doc.name,
            is_correct: doc.is_correct,
            is_deleted: doc.is_deleted,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        })
    }
}

/// Mango selector matching live question rows for a (game, question) pair.
pub(super) fn question_pair_selector(game_id: i64, external_id: i64) -> Value {
    json!({
        "selector": {
            "type": QUESTION_KIND,
            "game_id": game_id,
            "external_id": external_id,
            "is_deleted": false,
        },
        "fields": ["_id"],
    })
}

/// Mango selector matching the live correct answer of any of `question_doc_ids`.
pub(super) fn correct_answer_selector(question_doc_ids: &[String]) -> Value {
    json!({
        "selector": {
            "type": ANSWER_KIND,
            "question_id": { "$in": question_doc_ids },
            "is_correct": true,
            "is_deleted": false,
        },
        "limit": 1,
    })
}

/// Index definitions created alongside the database.
pub(super) fn index_definitions() -> Vec<Value> {
    vec![
        json!({
            "index": { "fields": ["type", "game_id", "external_id"] },
            "name": "question-pair",
        }),
        json!({
            "index": { "fields": ["type", "question_id", "is_correct"] },
            "name": "answer-question",
        }),
    ]
}

/// Projection used when only the document id of a question matters.
#[derive(Debug, Deserialize)]
pub struct IdOnly {
    #[serde(rename = "_id")]
    pub(super) id: String,
}

pub(super) fn question_doc_id(id: Uuid) -> String {
    format!("{}{}", QUESTION_PREFIX, id)
}

pub(super) fn answer_doc_id(id: Uuid) -> String {
    format!("{}{}", ANSWER_PREFIX, id)
}

pub(super) fn extract_uuid(doc_id: &str) -> Result<Uuid, CouchDaoError> {
    let (_, id) = doc_id
        .split_once("::")
        .ok_or_else(|| CouchDaoError::InvalidDocId {
            doc_id: doc_id.to_string(),
            kind: "missing separator",
        })?;

    Uuid::parse_str(id).map_err(|_| CouchDaoError::InvalidDocId {
        doc_id: doc_id.to_string(),
        kind: "invalid UUID",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_document_keeps_question_link() {
        let question = QuestionEntity::new(42, 7, "poster.jpg");
        let answer = AnswerEntity::new(question.id, "B", true);
        let doc: CouchAnswerDocument = answer.clone().into();

        assert_eq!(doc.question_id, question_doc_id(question.id));
        assert_eq!(doc.kind, ANSWER_KIND);
        let back = AnswerEntity::try_from(doc).unwrap();
        assert_eq!(back, answer);
    }

    #[test]
    fn extract_uuid_rejects_malformed_ids() {
        assert!(extract_uuid("answer-without-separator").is_err());
        assert!(extract_uuid("answer::not-a-uuid").is_err());
    }
}
