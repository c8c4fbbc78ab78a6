//! Process-local store used when no database is configured and by tests.

use std::{collections::HashMap, sync::Arc};

use futures::future::BoxFuture;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::dao::{
    answer_store::AnswerStore,
    models::{AnswerEntity, QuestionEntity},
    storage::{StorageError, StorageResult},
};

#[derive(Default)]
struct Tables {
    questions: HashMap<Uuid, QuestionEntity>,
    answers: Vec<AnswerEntity>,
}

impl Tables {
    fn live_question_ids(&self, game_id: i64, external_id: i64) -> Vec<Uuid> {
        self.questions
            .values()
            .filter(|q| !q.is_deleted && q.game_id == game_id && q.external_id == external_id)
            .map(|q| q.id)
            .collect()
    }

    fn correct_answer_for(&self, question_ids: &[Uuid]) -> Option<&AnswerEntity> {
        self.answers
            .iter()
            .find(|a| !a.is_deleted && a.is_correct && question_ids.contains(&a.question_id))
    }
}

/// In-memory [`AnswerStore`] enforcing the foreign key and the
/// single-correct-answer invariant on writes.
#[derive(Clone, Default)]
pub struct InMemoryAnswerStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryAnswerStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every question row, deleted or not.
    pub async fn questions(&self) -> Vec<QuestionEntity> {
        self.tables.read().await.questions.values().cloned().collect()
    }

    /// Every answer row in insertion order, deleted or not.
    pub async fn answers(&self) -> Vec<AnswerEntity> {
        self.tables.read().await.answers.clone()
    }
}

impl AnswerStore for InMemoryAnswerStore {
    fn find_correct_answer(
        &self,
        game_id: i64,
        external_question_id: i64,
    ) -> BoxFuture<'static, StorageResult<Option<AnswerEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let tables = tables.read().await;
            let ids = tables.live_question_ids(game_id, external_question_id);
            Ok(tables.correct_answer_for(&ids).cloned())
        })
    }

    fn insert_question(
        &self,
        question: QuestionEntity,
    ) -> BoxFuture<'static, StorageResult<QuestionEntity>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let mut tables = tables.write().await;
            if tables.questions.contains_key(&question.id) {
                return Err(StorageError::rejected(format!(
                    "question `{}` already exists",
                    question.id
                )));
            }
            tables.questions.insert(question.id, question.clone());
            Ok(question)
        })
    }

    fn insert_answer(&self, answer: AnswerEntity) -> BoxFuture<'static, StorageResult<AnswerEntity>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let mut tables = tables.write().await;
            let Some((game_id, external_id)) = tables
                .questions
                .get(&answer.question_id)
                .map(|owner| (owner.game_id, owner.external_id))
            else {
                return Err(StorageError::rejected(format!(
                    "answer references unknown question `{}`",
                    answer.question_id
                )));
            };

            if answer.is_correct && !answer.is_deleted {
                let ids = tables.live_question_ids(game_id, external_id);
                if tables.correct_answer_for(&ids).is_some() {
                    return Err(StorageError::rejected(format!(
                        "game {game_id} question {external_id} already has a correct answer"
                    )));
                }
            }

            tables.answers.push(answer.clone());
            Ok(answer)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
