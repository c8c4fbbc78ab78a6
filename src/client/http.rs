use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use reqwest::{
    Client,
    header::{CONTENT_TYPE, COOKIE},
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use super::{
    GameApi, SessionState, SubmitOutcome,
    error::{GameApiError, GameApiResult},
    models::{AnswerRequest, AnswerResponse, StartGameRequest, StartGameResponse},
};

/// Endpoints and timeout used by [`HttpGameApi`].
#[derive(Debug, Clone)]
pub struct HttpGameApiConfig {
    /// Session endpoint.
    pub start_session_url: String,
    /// Answer endpoint.
    pub submit_answer_url: String,
    /// Bound on a single call; a whole run may last much longer.
    pub request_timeout: Duration,
}

/// `reqwest`-backed implementation of [`GameApi`].
#[derive(Clone)]
pub struct HttpGameApi {
    client: Client,
    start_session_url: Arc<str>,
    submit_answer_url: Arc<str>,
}

impl HttpGameApi {
    /// Build the underlying `reqwest` client.
    pub fn new(config: HttpGameApiConfig) -> GameApiResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|source| GameApiError::ClientBuilder { source })?;

        Ok(Self {
            client,
            start_session_url: Arc::from(config.start_session_url),
            submit_answer_url: Arc::from(config.submit_answer_url),
        })
    }

    async fn post<B, T>(&self, endpoint: &str, credential: &str, body: &B) -> GameApiResult<T>
    where
        B: ?Sized + Serialize,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(COOKIE, credential)
            .json(body)
            .send()
            .await
            .map_err(|source| GameApiError::Send {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GameApiError::Status {
                endpoint: endpoint.to_string(),
                status,
            });
        }

        response.json::<T>().await.map_err(|source| GameApiError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

impl GameApi for HttpGameApi {
    fn start_session(
        &self,
        game_id: i64,
        credential: &str,
    ) -> BoxFuture<'static, GameApiResult<SessionState>> {
        let api = self.clone();
        let credential = credential.to_owned();
        Box::pin(async move {
            let endpoint = api.start_session_url.clone();
            let response: StartGameResponse = api
                .post(&endpoint, &credential, &StartGameRequest { game_id })
                .await?;
            debug!(game_id, "remote session started");
            Ok(response.into())
        })
    }

    // The service tracks the active game through the cookie, so `game_id` is not sent here.
    fn submit_answer(
        &self,
        game_id: i64,
        credential: &str,
        answer: &str,
    ) -> BoxFuture<'static, GameApiResult<SubmitOutcome>> {
        let api = self.clone();
        let credential = credential.to_owned();
        let answer = answer.to_owned();
        Box::pin(async move {
            let endpoint = api.submit_answer_url.clone();
            let response: AnswerResponse = api
                .post(&endpoint, &credential, &AnswerRequest { answer: &answer })
                .await?;
            debug!(game_id, is_correct = response.is_correct, "answer submitted");
            Ok(response.into())
        })
    }
}
