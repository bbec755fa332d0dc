//! Process-local session store used by default and in tests.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{models::SessionEntity, session_store::SessionStore, storage::StorageResult};

/// Session store keeping records in a concurrent map.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<DashMap<Uuid, SessionEntity>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn save_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let sessions = self.sessions.clone();
        Box::pin(async move {
            sessions.insert(session.id, session);
            Ok(())
        })
    }

    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let found = self.sessions.get(&id).map(|entry| entry.value().clone());
        Box::pin(async move { Ok(found) })
    }

    fn list_sessions(&self) -> BoxFuture<'static, StorageResult<Vec<SessionEntity>>> {
        let mut sessions: Vec<SessionEntity> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        sessions.sort_by_key(|session| session.created_at);
        Box::pin(async move { Ok(sessions) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::session::SessionClockState;
    use time::{Duration, OffsetDateTime};

    #[tokio::test]
    async fn save_replaces_whole_record() {
        let store = MemorySessionStore::new();
        let t0 = OffsetDateTime::UNIX_EPOCH;
        let mut session = SessionClockState::new(Uuid::new_v4(), "Turbo", t0);
        store.save_session(session.clone().into()).await.unwrap();

        session.status = crate::state::session::SessionStatus::Active;
        session.current_level_index = 3;
        session.level_start_time = Some(t0 + Duration::minutes(60));
        store.save_session(session.clone().into()).await.unwrap();

        let stored = store.find_session(session.session_id).await.unwrap().unwrap();
        assert_eq!(SessionClockState::from(stored), session);
        assert_eq!(store.list_sessions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_session_is_none() {
        let store = MemorySessionStore::new();
        assert!(store.find_session(Uuid::new_v4()).await.unwrap().is_none());
    }
}
