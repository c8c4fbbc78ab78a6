use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::debug;

use crate::dao::{
    answer_store::AnswerStore,
    models::{AnswerEntity, QuestionEntity},
    storage::StorageResult,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        CouchAnswerDocument, CouchQuestionDocument, FindResponse, IdOnly, correct_answer_selector,
        index_definitions, question_pair_selector,
    },
};

const FIND: &str = "_find";
const INDEX: &str = "_index";

/// CouchDB-backed [`AnswerStore`] speaking the HTTP API through `reqwest`.
#[derive(Clone)]
pub struct CouchAnswerStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchAnswerStore {
    /// Establish a connection to CouchDB and ensure the database and its indexes exist.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = Arc::<str>::from(config.base_url.trim_end_matches('/'));
        let database = Arc::<str>::from(config.database);
        let auth = config
            .username
            .zip(config.password)
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        let store = Self {
            client,
            base_url,
            database,
            auth,
        };

        store.ensure_database().await?;
        store.ensure_indexes().await?;
        Ok(store)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth {
            Some((ref user, ref pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, self.database, path);
        self.authorized(self.client.request(method, url))
    }

    fn database_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = self.database_url();

        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .authorized(self.client.put(&url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseCreate {
                        database: database.clone(),
                        source,
                    })?;
                if create.status().is_success() {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn ensure_indexes(&self) -> CouchResult<()> {
        for definition in index_definitions() {
            // CouchDB answers 200 for an index that already exists.
            let _: Value = self.post_json(INDEX, &definition).await?;
        }
        Ok(())
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> CouchResult<T>
    where
        B: ?Sized + Serialize,
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::POST, path)
            .json(body)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: path.to_string(),
                status: response.status(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| CouchDaoError::DecodeResponse {
                path: path.to_string(),
                source,
            })
    }

    /// Create a document; an existing id is reported as a conflict, never overwritten.
    async fn create_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<()>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::CONFLICT => Err(CouchDaoError::Conflict {
                doc_id: doc_id.to_string(),
            }),
            status if status.is_success() => Ok(()),
            status => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status,
            }),
        }
    }

    async fn find_correct(&self, game_id: i64, question_id: i64) -> CouchResult<Option<AnswerEntity>> {
        let questions: FindResponse<IdOnly> = self
            .post_json(FIND, &question_pair_selector(game_id, question_id))
            .await?;

        if questions.docs.is_empty() {
            return Ok(None);
        }

        let ids: Vec<String> = questions.docs.into_iter().map(|doc| doc.id).collect();
        debug!(game_id, question_id, rows = ids.len(), "question rows matched");

        let answers: FindResponse<CouchAnswerDocument> =
            self.post_json(FIND, &correct_answer_selector(&ids)).await?;

        answers
            .docs
            .into_iter()
            .next()
            .map(AnswerEntity::try_from)
            .transpose()
    }
}

impl AnswerStore for CouchAnswerStore {
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
        Box::pin(async move {
            let doc = CouchQuestionDocument::from(question.clone());
            store.create_document(&doc.id, &doc).await?;
            Ok(question)
        })
    }

    fn insert_answer(&self, answer: AnswerEntity) -> BoxFuture<'static, StorageResult<AnswerEntity>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = CouchAnswerDocument::from(answer.clone());
            store.create_document(&doc.id, &doc).await?;
            Ok(answer)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let url = store.database_url();
            let response = store
                .authorized(store.client.get(&url))
                .send()
                .await
                .map_err(|source| CouchDaoError::RequestSend {
                    path: url.clone(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::RequestStatus {
                    path: url,
                    status: response.status(),
                }
                .into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
