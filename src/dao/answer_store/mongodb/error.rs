use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

/// Result alias for MongoDB operations.
pub type Result<T> = std::result::Result<T, MongoDaoError>;

/// Failures raised by the MongoDB backend.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// The connection string could not be parsed.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    /// The driver refused the client options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    /// The server never answered during startup.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    /// A periodic ping failed.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    /// An index could not be created.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    /// A lookup query failed.
    #[error("failed to look up answer for game {game_id} question {question_id}")]
    LoadAnswer {
        game_id: i64,
        question_id: i64,
        #[source]
        source: MongoError,
    },
    /// A question insert failed.
    #[error("failed to save question `{id}`")]
    SaveQuestion {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    /// An answer insert failed.
    #[error("failed to save answer `{id}`")]
    SaveAnswer {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    /// The unique index refused a second correct answer.
    #[error("answer `{id}` duplicates the correct answer of its question")]
    DuplicateCorrectAnswer { id: Uuid },
    /// A stored identifier is not a UUID.
    #[error("stored document has an invalid identifier `{value}`")]
    InvalidId { value: String },
}
