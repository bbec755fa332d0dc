//! Operator-driven session lifecycle: creation, start, finish and
//! registration bookkeeping.

use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{
    dto::admin::{
        CreateSessionRequest, FinishSessionRequest, RegistrationUpdateRequest, SessionSummary,
    },
    error::ServiceError,
    services::{
        access::OperatorAccess,
        clock_service::{load_session, save_session},
        sse_events,
    },
    state::{SharedState, session::SessionClockState},
};

/// Create a session that has not started yet.
pub async fn create_session(
    state: &SharedState,
    access: OperatorAccess,
    request: CreateSessionRequest,
) -> Result<SessionSummary, ServiceError> {
    access.require_operator("create sessions")?;

    let session = SessionClockState::new(
        Uuid::new_v4(),
        request.name.trim(),
        OffsetDateTime::now_utc(),
    );
    save_session(state, &session).await?;
    info!(session_id = %session.session_id, name = %session.name, "session created");
    Ok(session.into())
}

/// List every stored session, oldest first.
pub async fn list_sessions(
    state: &SharedState,
    access: OperatorAccess,
) -> Result<Vec<SessionSummary>, ServiceError> {
    access.require_operator("list sessions")?;

    let store = state.require_session_store().await?;
    let sessions = store.list_sessions().await?;
    Ok(sessions
        .into_iter()
        .map(SessionClockState::from)
        .map(SessionSummary::from)
        .collect())
}

/// Start the clock on the first play level.
pub async fn start_session(
    state: &SharedState,
    access: OperatorAccess,
    session_id: Uuid,
) -> Result<SessionSummary, ServiceError> {
    access.require_operator("start sessions")?;

    let session = state
        .run_serialized(|| async {
            let mut session = load_session(state, session_id).await?;
            session.start(state.schedule(), OffsetDateTime::now_utc())?;
            save_session(state, &session).await?;
            Ok(session)
        })
        .await?;

    info!(
        %session_id,
        level_index = session.current_level_index,
        "session started"
    );
    sse_events::broadcast_session_status(state, &session);
    sse_events::broadcast_level_changed(state, &session);
    Ok(session.into())
}

/// Move a session to a terminal status, freezing its clock.
pub async fn finish_session(
    state: &SharedState,
    access: OperatorAccess,
    session_id: Uuid,
    request: FinishSessionRequest,
) -> Result<SessionSummary, ServiceError> {
    access.require_operator("finish sessions")?;

    let session = state
        .run_serialized(|| async {
            let mut session = load_session(state, session_id).await?;
            session.finish(request.status, OffsetDateTime::now_utc())?;
            save_session(state, &session).await?;
            Ok(session)
        })
        .await?;

    info!(%session_id, status = ?session.status, "session finished");
    sse_events::broadcast_session_status(state, &session);
    Ok(session.into())
}

/// Update the registration flag and, optionally, the entry count.
///
/// Allowed in every status so late corrections remain possible.
pub async fn update_registration(
    state: &SharedState,
    access: OperatorAccess,
    session_id: Uuid,
    request: RegistrationUpdateRequest,
) -> Result<SessionSummary, ServiceError> {
    access.require_operator("update registration")?;

    let session = state
        .run_serialized(|| async {
            let mut session = load_session(state, session_id).await?;
            session.registration_closed = request.registration_closed;
            if let Some(entries) = request.entries {
                session.entries = entries;
            }
            session.updated_at = OffsetDateTime::now_utc();
            save_session(state, &session).await?;
            Ok(session)
        })
        .await?;

    info!(
        %session_id,
        registration_closed = session.registration_closed,
        entries = session.entries,
        "registration updated"
    );
    Ok(session.into())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::session_store::memory::MemorySessionStore,
        state::{AppState, session::SessionStatus},
    };

    async fn state() -> SharedState {
        let state = AppState::new(AppConfig::builtin().unwrap());
        state
            .set_session_store(Arc::new(MemorySessionStore::new()))
            .await;
        state
    }

    async fn create(state: &SharedState) -> SessionSummary {
        create_session(
            state,
            OperatorAccess::OPERATOR,
            CreateSessionRequest {
                name: "  Thursday turbo ".into(),
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn created_session_waits_for_start() {
        let state = state().await;
        let summary = create(&state).await;
        assert_eq!(summary.name, "Thursday turbo");
        assert_eq!(summary.status, SessionStatus::NotStarted);
        assert!(summary.level_start_time.is_none());
        assert!(!summary.registration_closed);

        let listed = list_sessions(&state, OperatorAccess::OPERATOR).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn lifecycle_start_then_finish() {
        let state = state().await;
        let summary = create(&state).await;

        let started = start_session(&state, OperatorAccess::OPERATOR, summary.session_id)
            .await
            .unwrap();
        assert_eq!(started.status, SessionStatus::Active);
        assert_eq!(started.current_level_index, 0);
        assert!(started.level_start_time.is_some());

        let err = start_session(&state, OperatorAccess::OPERATOR, summary.session_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let finished = finish_session(
            &state,
            OperatorAccess::OPERATOR,
            summary.session_id,
            FinishSessionRequest {
                status: SessionStatus::Completed,
            },
        )
        .await
        .unwrap();
        assert_eq!(finished.status, SessionStatus::Completed);
    }

    #[tokio::test]
    async fn registration_update_keeps_entries_when_absent() {
        let state = state().await;
        let summary = create(&state).await;

        let updated = update_registration(
            &state,
            OperatorAccess::OPERATOR,
            summary.session_id,
            RegistrationUpdateRequest {
                registration_closed: false,
                entries: Some(42),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.entries, 42);

        let updated = update_registration(
            &state,
            OperatorAccess::OPERATOR,
            summary.session_id,
            RegistrationUpdateRequest {
                registration_closed: true,
                entries: None,
            },
        )
        .await
        .unwrap();
        assert!(updated.registration_closed);
        assert_eq!(updated.entries, 42);
    }

    #[tokio::test]
    async fn viewers_cannot_manage_sessions() {
        let state = state().await;
        let err = create_session(
            &state,
            OperatorAccess::VIEWER,
            CreateSessionRequest {
                name: "nope".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
        assert!(list_sessions(&state, OperatorAccess::VIEWER).await.is_err());
    }
}
