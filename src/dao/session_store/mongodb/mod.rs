//! MongoDB backend: one document per session in the `sessions` collection.

mod error;
mod models;
mod store;

use mongodb::options::ClientOptions;

pub use error::MongoDaoError;
pub use store::MongoSessionStore;

use crate::dao::storage::StorageError;

const DEFAULT_DATABASE: &str = "blind_clock";

/// Connection settings, read from `MONGO_URI` and `MONGO_DB`.
#[derive(Clone)]
pub struct MongoConfig {
    pub options: ClientOptions,
    pub database: String,
}

impl MongoConfig {
    /// Parse `uri`; `database` falls back to `blind_clock`.
    pub async fn from_uri(uri: &str, database: Option<&str>) -> Result<Self, MongoDaoError> {
        let options = ClientOptions::parse(uri)
            .await
            .map_err(|source| MongoDaoError::InvalidUri {
                uri: uri.to_owned(),
                source,
            })?;
        Ok(Self {
            options,
            database: database.unwrap_or(DEFAULT_DATABASE).to_owned(),
        })
    }

    pub async fn from_env() -> Result<Self, MongoDaoError> {
        let uri = std::env::var("MONGO_URI").map_err(|_| MongoDaoError::MissingUri)?;
        let database = std::env::var("MONGO_DB").ok().filter(|name| !name.is_empty());
        Self::from_uri(&uri, database.as_deref()).await
    }
}

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::Corrupted { id, reason } => StorageError::corrupted(id, reason),
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
