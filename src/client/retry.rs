use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use super::{GameApi, GameApiResult, SessionState, SubmitOutcome};

/// Pause between two attempts of the same remote call.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryPolicy {
    /// Zero means yield to the runtime instead of sleeping.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Retry immediately, only yielding to the runtime between attempts.
    pub const fn immediate() -> Self {
        Self {
            delay: Duration::ZERO,
        }
    }

    /// Sleep `delay` between attempts.
    pub const fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }

    async fn pause(&self) {
        if self.delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            sleep(self.delay).await;
        }
    }
}

/// [`GameApi`] wrapper that never surfaces transport failures.
///
/// A submitted answer cannot be taken back, so every call is repeated until
/// the service produces a usable response. There is no attempt cap.
#[derive(Clone)]
pub struct GameClient {
    api: Arc<dyn GameApi>,
    retry: RetryPolicy,
}

impl GameClient {
    /// Wrap `api` with `retry`.
    pub fn new(api: Arc<dyn GameApi>, retry: RetryPolicy) -> Self {
        Self { api, retry }
    }

    /// [`GameApi::start_session`], repeated until it succeeds.
    pub async fn start_session(&self, game_id: i64, credential: &str) -> SessionState {
        self.until_ok("start_session", game_id, || {
            self.api.start_session(game_id, credential)
        })
        .await
    }

    /// [`GameApi::submit_answer`], repeated until it succeeds.
    pub async fn submit_answer(&self, game_id: i64, credential: &str, answer: &str) -> SubmitOutcome {
        self.until_ok("submit_answer", game_id, || {
            self.api.submit_answer(game_id, credential, answer)
        })
        .await
    }

    async fn until_ok<T, F, Fut>(&self, operation: &'static str, game_id: i64, mut call: F) -> T
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = GameApiResult<T>>,
    {
        let mut failures: u64 = 0;
        loop {
            match call().await {
                Ok(value) => {
                    if failures > 0 {
                        info!(operation, game_id, failures, "remote call recovered");
                    }
                    return value;
                }
                Err(err) => {
                    failures += 1;
                    warn!(operation, game_id, failures, error = %err, "remote call failed; retrying");
                    self.retry.pause().await;
                }
            }
        }
    }
}
