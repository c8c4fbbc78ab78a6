use reqwest::StatusCode;
use thiserror::Error;

/// Result alias for remote game calls.
pub type GameApiResult<T> = Result<T, GameApiError>;

/// Transport-level failures talking to the remote game service.
#[derive(Debug, Error)]
pub enum GameApiError {
    /// Building the HTTP client failed.
    #[error("failed to build game API client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// The request could not be sent or timed out.
    #[error("failed to send request to `{endpoint}`")]
    Send {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// The service answered with a non-success status code.
    #[error("unexpected status {status} from `{endpoint}`")]
    Status { endpoint: String, status: StatusCode },
    /// The body could not be decoded into the expected payload.
    #[error("failed to decode response from `{endpoint}`")]
    Decode {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
}
