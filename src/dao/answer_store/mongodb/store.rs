use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Collection,
    bson::doc,
    error::{Error as MongoError, ErrorKind, WriteFailure},
};

use crate::dao::{
    answer_store::AnswerStore,
    models::{AnswerEntity, QuestionEntity},
    storage::{StorageError, StorageResult},
};

use super::{
    MongoDaoError,
    connection::{ANSWER_COLLECTION, MongoManager, QUESTION_COLLECTION},
    models::{MongoAnswerDocument, MongoQuestionDocument},
};

const DUPLICATE_KEY_CODE: i32 = 11000;

/// MongoDB-backed [`AnswerStore`] implementation.
#[derive(Clone)]
pub struct MongoAnswerStore {
    mongo: MongoManager,
}

impl MongoAnswerStore {
    /// Store on top of an established connection.
    pub fn new(mongo: MongoManager) -> Self {
        Self { mongo }
    }

    async fn questions(&self) -> Collection<MongoQuestionDocument> {
        self.mongo
            .database()
            .await
            .collection::<MongoQuestionDocument>(QUESTION_COLLECTION)
    }

    async fn answers(&self) -> Collection<MongoAnswerDocument> {
        self.mongo
            .database()
            .await
            .collection::<MongoAnswerDocument>(ANSWER_COLLECTION)
    }

    async fn find_correct(
        &self,
        game_id: i64,
        question_id: i64,
    ) -> Result<Option<AnswerEntity>, MongoDaoError> {
        let load_err = move |source: MongoError| MongoDaoError::LoadAnswer {
            game_id,
            question_id,
            source,
        };

        let questions: Vec<MongoQuestionDocument> = self
            .questions()
            .await
            .find(doc! {"game_id": game_id, "external_id": question_id, "is_deleted": false})
            .await
            .map_err(load_err)?
            .try_collect()
            .await
            .map_err(load_err)?;

        if questions.is_empty() {
            return Ok(None);
        }

        let ids: Vec<String> = questions.into_iter().map(|q| q.id).collect();
        let answer = self
            .answers()
            .await
            .find_one(doc! {
                "question_id": {"$in": ids},
                "is_correct": true,
                "is_deleted": false,
            })
            .await
            .map_err(load_err)?;

        answer.map(AnswerEntity::try_from).transpose()
    }

    async fn save_question(&self, question: QuestionEntity) -> Result<QuestionEntity, MongoDaoError> {
        let id = question.id;
        let document: MongoQuestionDocument = question.clone().into();
        self.questions()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::SaveQuestion { id, source })?;
        Ok(question)
    }

    async fn save_answer(&self, answer: AnswerEntity) -> Result<AnswerEntity, MongoDaoError> {
        let id = answer.id;
        let document: MongoAnswerDocument = answer.clone().into();
        match self.answers().await.insert_one(&document).await {
            Ok(_) => Ok(answer),
            Err(err) if is_duplicate_key(&err) => Err(MongoDaoError::DuplicateCorrectAnswer { id }),
            Err(source) => Err(MongoDaoError::SaveAnswer { id, source }),
        }
    }
}

impl AnswerStore for MongoAnswerStore {
    fn find_correct_answer(
        &self,
        game_id: i64,
        external_question_id: i64,
    ) -> BoxFuture<'static, StorageResult<Option<AnswerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_correct(game_id, external_question_id)
                .await
                .map_err(Into::into)
        })
    }

    fn insert_question(
        &self,
        question: QuestionEntity,
    ) -> BoxFuture<'static, StorageResult<QuestionEntity>> {
        let store = self.clone();
        Box::pin(async move { store.save_question(question).await.map_err(Into::into) })
    }

    fn insert_answer(&self, answer: AnswerEntity) -> BoxFuture<'static, StorageResult<AnswerEntity>> {
        let store = self.clone();
        Box::pin(async move { store.save_answer(answer).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let mongo = self.mongo.clone();
        Box::pin(async move { mongo.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let mongo = self.mongo.clone();
        Box::pin(async move { mongo.reconnect_once().await.map_err(Into::into) })
    }
}

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::DuplicateCorrectAnswer { .. } => StorageError::rejected(err.to_string()),
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY_CODE
    )
}
