mod connection;
mod error;
mod models;
/// [`MongoAnswerStore`] and its queries.
pub mod store;

pub use connection::{MongoManager, connect, ensure_indexes};
pub use error::MongoDaoError;
pub use store::MongoAnswerStore;
