use mongodb::error::Error as MongoError;
use thiserror::Error;

/// Failures of the MongoDB session store.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("MONGO_URI is not set")]
    MissingUri,
    #[error("invalid MongoDB URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    /// Client construction, ping or index creation failed.
    #[error("cannot reach MongoDB database `{database}`")]
    Connect {
        database: String,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB {operation} failed")]
    Operation {
        operation: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("session document `{id}` is corrupted: {reason}")]
    Corrupted { id: String, reason: String },
}

impl MongoDaoError {
    pub(super) fn operation(operation: &'static str) -> impl FnOnce(MongoError) -> Self {
        move |source| MongoDaoError::Operation { operation, source }
    }
}
