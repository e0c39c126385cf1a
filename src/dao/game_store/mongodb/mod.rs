mod config;
mod connection;
mod error;
mod models;
/// [`MongoGameStore`] and its optimistic write loop.
pub mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoGameStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::Contention { id, attempts, .. } => {
                StorageError::Contention { id, attempts }
            }
            MongoDaoError::Rejected { id, reason, .. } => StorageError::Rejected { id, reason },
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
