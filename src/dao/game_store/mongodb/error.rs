use mongodb::error::Error as MongoError;
use thiserror::Error;

/// Convenient result alias returning [`MongoDaoError`] failures.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Failures raised by the MongoDB backend.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// Required environment variable is missing.
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// The connection URI could not be parsed.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    /// The driver rejected the client options.
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
    /// Periodic ping failed.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    /// Index creation failed.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    /// Reading a document failed.
    #[error("failed to load `{id}` from collection `{collection}`")]
    Load {
        collection: &'static str,
        id: String,
        #[source]
        source: MongoError,
    },
    /// Writing a document failed.
    #[error("failed to save `{id}` into collection `{collection}`")]
    Save {
        collection: &'static str,
        id: String,
        #[source]
        source: MongoError,
    },
    /// Removing a document failed.
    #[error("failed to delete `{id}` from collection `{collection}`")]
    Delete {
        collection: &'static str,
        id: String,
        #[source]
        source: MongoError,
    },
    /// Scanning a collection failed.
    #[error("failed to list collection `{collection}`")]
    List {
        collection: &'static str,
        #[source]
        source: MongoError,
    },
    /// Revision checks kept failing.
    #[error("document `{id}` in `{collection}` kept changing after {attempts} attempt(s)")]
    Contention {
        collection: &'static str,
        id: String,
        attempts: u32,
    },
    /// A guarded update refused the stored document.
    #[error("update of `{id}` in `{collection}` rejected: {reason}")]
    Rejected {
        collection: &'static str,
        id: String,
        reason: String,
    },
    /// A stored document does not map back to an entity.
    #[error("document `{id}` in `{collection}` is malformed")]
    CorruptDocument {
        collection: &'static str,
        id: String,
    },
}
