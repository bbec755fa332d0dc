use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Document, doc},
    options::IndexOptions,
};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use super::{MongoConfig, error::MongoDaoError, models::MongoSessionDocument};
use crate::dao::{models::SessionEntity, session_store::SessionStore, storage::StorageResult};

const SESSIONS: &str = "sessions";

/// [`SessionStore`] over a MongoDB database.
///
/// Connection retries are left to the storage supervisor; `connect` makes a
/// single attempt.
#[derive(Clone)]
pub struct MongoSessionStore {
    config: Arc<MongoConfig>,
    database: Arc<RwLock<Database>>,
}

async fn open(config: &MongoConfig) -> Result<Database, MongoDaoError> {
    let connect_error = |source| MongoDaoError::Connect {
        database: config.database.clone(),
        source,
    };
    let client = Client::with_options(config.options.clone()).map_err(connect_error)?;
    let database = client.database(&config.database);
    database
        .run_command(doc! { "ping": 1 })
        .await
        .map_err(connect_error)?;

    // list_sessions sorts on creation time
    let index = IndexModel::builder()
        .keys(doc! { "created_at": 1 })
        .options(
            IndexOptions::builder()
                .name(Some("sessions_by_creation".to_owned()))
                .build(),
        )
        .build();
    database
        .collection::<Document>(SESSIONS)
        .create_index(index)
        .await
        .map_err(connect_error)?;

    Ok(database)
}

fn by_id(id: Uuid) -> Document {
    doc! { "_id": id.to_string() }
}

impl MongoSessionStore {
    pub async fn connect(config: MongoConfig) -> Result<Self, MongoDaoError> {
        let database = open(&config).await?;
        info!(database = %config.database, "connected to MongoDB");
        Ok(Self {
            config: Arc::new(config),
            database: Arc::new(RwLock::new(database)),
        })
    }

    async fn sessions(&self) -> Collection<MongoSessionDocument> {
        self.database.read().await.collection(SESSIONS)
    }

    async fn replace(&self, session: SessionEntity) -> Result<(), MongoDaoError> {
        let filter = by_id(session.id);
        self.sessions()
            .await
            .replace_one(filter, MongoSessionDocument::from(session))
            .upsert(true)
            .await
            .map_err(MongoDaoError::operation("session replace"))?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<SessionEntity>, MongoDaoError> {
        self.sessions()
            .await
            .find_one(by_id(id))
            .await
            .map_err(MongoDaoError::operation("session lookup"))?
            .map(SessionEntity::try_from)
            .transpose()
    }

    async fn all(&self) -> Result<Vec<SessionEntity>, MongoDaoError> {
        let documents: Vec<MongoSessionDocument> = self
            .sessions()
            .await
            .find(doc! {})
            .sort(doc! { "created_at": 1 })
            .await
            .map_err(MongoDaoError::operation("session listing"))?
            .try_collect()
            .await
            .map_err(MongoDaoError::operation("session listing"))?;
        documents.into_iter().map(SessionEntity::try_from).collect()
    }

    async fn ping(&self) -> Result<(), MongoDaoError> {
        let database = self.database.read().await.clone();
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(MongoDaoError::operation("ping"))?;
        Ok(())
    }

    async fn reopen(&self) -> Result<(), MongoDaoError> {
        let database = open(&self.config).await?;
        *self.database.write().await = database;
        Ok(())
    }
}

impl SessionStore for MongoSessionStore {
    fn save_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.replace(session).await?) })
    }

    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.find(id).await?) })
    }

    fn list_sessions(&self) -> BoxFuture<'static, StorageResult<Vec<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.all().await?) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.ping().await?) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.reopen().await?) })
    }
}
