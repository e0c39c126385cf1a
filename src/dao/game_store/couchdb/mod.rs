mod config;
mod error;
mod models;
mod store;

pub use config::CouchConfig;
pub use error::CouchDaoError;
pub use store::CouchGameStore;

use crate::dao::storage::StorageError;

impl From<CouchDaoError> for StorageError {
    fn from(err: CouchDaoError) -> Self {
        match err {
            CouchDaoError::Contention { doc_id, attempts } => StorageError::Contention {
                id: doc_id,
                attempts,
            },
            CouchDaoError::Rejected { doc_id, reason } => StorageError::Rejected {
                id: doc_id,
                reason,
            },
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
