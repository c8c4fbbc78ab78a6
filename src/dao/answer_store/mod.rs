#[cfg(feature = "couch-store")]
/// CouchDB backend.
pub mod couchdb;
/// Process-local backend.
pub mod memory;
#[cfg(feature = "mongo-store")]
/// MongoDB backend.
pub mod mongodb;

use crate::dao::models::{AnswerEntity, QuestionEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

pub use memory::InMemoryAnswerStore;

/// Abstraction over the persistence layer for observed questions and answers.
///
/// The automaton only ever looks answers up and appends new rows; updates and
/// deletions belong to whoever administers the data.
pub trait AnswerStore: Send + Sync {
    /// Return the non-deleted correct answer recorded for the pair, if any.
    fn find_correct_answer(
        &self,
        game_id: i64,
        external_question_id: i64,
    ) -> BoxFuture<'static, StorageResult<Option<AnswerEntity>>>;
    /// Persist a new question row.
    fn insert_question(
        &self,
        question: QuestionEntity,
    ) -> BoxFuture<'static, StorageResult<QuestionEntity>>;
    /// Persist one candidate answer of a recorded question.
    fn insert_answer(&self, answer: AnswerEntity) -> BoxFuture<'static, StorageResult<AnswerEntity>>;
    /// Cheap liveness check used by the storage supervisor.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Attempt to revive the backend connection in place.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
