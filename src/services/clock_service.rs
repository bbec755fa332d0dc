//! Clock snapshot read path and the level advancement write path.
//!
//! Advancement writes go through [`AppState::run_serialized`] so the
//! read-modify-write of a session record never interleaves with another
//! writer; the record is then stored whole, moving `current_level_index` and
//! `level_start_time` together.
//!
//! [`AppState::run_serialized`]: crate::state::AppState::run_serialized

use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dto::clock::{AdvanceLevelResponse, ClockSnapshotResponse},
    error::ServiceError,
    services::{access::OperatorAccess, sse_events},
    state::{SharedState, session::SessionClockState},
};

/// Load a session or fail with [`ServiceError::NotFound`].
pub(crate) async fn load_session(
    state: &SharedState,
    session_id: Uuid,
) -> Result<SessionClockState, ServiceError> {
    let store = state.require_session_store().await?;
    store
        .find_session(session_id)
        .await?
        .map(SessionClockState::from)
        .ok_or_else(|| ServiceError::NotFound(format!("session `{session_id}` not found")))
}

/// Persist the whole session record.
pub(crate) async fn save_session(
    state: &SharedState,
    session: &SessionClockState,
) -> Result<(), ServiceError> {
    let store = state.require_session_store().await?;
    store.save_session(session.clone().into()).await?;
    Ok(())
}

/// Combined schedule and session clock state. Side-effect free.
pub async fn clock_snapshot(
    state: &SharedState,
    session_id: Uuid,
) -> Result<ClockSnapshotResponse, ServiceError> {
    let session = load_session(state, session_id).await?;
    let config = state.config();
    Ok(ClockSnapshotResponse::new(
        &session,
        config.schedule(),
        config.payout_policy(),
        OffsetDateTime::now_utc(),
    ))
}

/// Set the authoritative level of `session_id` to `level_index`, restarting its timer.
///
/// Rejections happen before any write: non-operators get `Unauthorized`,
/// indices outside the schedule get `InvalidInput`, unknown sessions get
/// `NotFound` and sessions that are not running get `InvalidState`. Writing
/// the index the session already holds succeeds and restarts the level.
pub async fn advance_level(
    state: &SharedState,
    access: OperatorAccess,
    session_id: Uuid,
    level_index: usize,
) -> Result<AdvanceLevelResponse, ServiceError> {
    if let Err(err) = access.require_operator("change the current level") {
        debug!(%session_id, level_index, "rejected level change from non-operator");
        return Err(err);
    }

    let schedule = state.schedule();
    if !schedule.contains(level_index) {
        debug!(%session_id, level_index, "rejected out-of-range level change");
        return Err(ServiceError::InvalidInput(format!(
            "level index {level_index} is out of range; valid indices are 0..={}",
            schedule.last_index()
        )));
    }

    let session = state
        .run_serialized(|| async {
            let mut session = load_session(state, session_id).await?;
            let previous = session.current_level_index;
            session.advance_to(level_index, OffsetDateTime::now_utc())?;
            save_session(state, &session).await?;
            info!(
                %session_id,
                from = previous,
                to = level_index,
                "level advanced"
            );
            Ok(session)
        })
        .await?;

    sse_events::broadcast_level_changed(state, &session);

    let level_start_time = session.level_start_time.ok_or_else(|| {
        ServiceError::InvalidState("advanced session has no level start time".into())
    })?;

    Ok(AdvanceLevelResponse {
        session_id,
        current_level_index: session.current_level_index,
        level_start_time,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::session_store::memory::MemorySessionStore,
        services::payout_service,
        state::{
            AppState, payouts::PayoutPolicy, schedule::tests::sample_schedule,
            session::SessionStatus,
        },
    };

    async fn state_with_session(status: SessionStatus) -> (SharedState, Uuid) {
        let config = AppConfig::builtin()
            .unwrap()
            .with_schedule(sample_schedule());
        state_from_config(config, status).await
    }

    async fn state_from_config(config: AppConfig, status: SessionStatus) -> (SharedState, Uuid) {
        let state = AppState::new(config);
        state
            .set_session_store(Arc::new(MemorySessionStore::new()))
            .await;

        let now = OffsetDateTime::now_utc();
        let mut session = SessionClockState::new(Uuid::new_v4(), "Main event", now);
        if status != SessionStatus::NotStarted {
            session.start(state.schedule(), now).unwrap();
        }
        if status.is_terminal() {
            session.finish(status, now).unwrap();
        }
        save_session(&state, &session).await.unwrap();
        (state, session.session_id)
    }

    #[tokio::test]
    async fn advance_updates_index_and_start_time() {
        let (state, id) = state_with_session(SessionStatus::Active).await;
        let before = clock_snapshot(&state, id).await.unwrap();

        let response = advance_level(&state, OperatorAccess::OPERATOR, id, 2)
            .await
            .unwrap();
        assert_eq!(response.current_level_index, 2);

        let after = clock_snapshot(&state, id).await.unwrap();
        assert_eq!(after.current_level_index, 2);
        assert_eq!(after.level_start_time, Some(response.level_start_time));
        assert!(after.level_start_time >= before.level_start_time);
        assert_eq!(after.current_level.unwrap().break_label.as_deref(), Some("B2"));
    }

    #[tokio::test]
    async fn advancing_twice_to_same_index_is_idempotent() {
        let (state, id) = state_with_session(SessionStatus::Active).await;
        let first = advance_level(&state, OperatorAccess::OPERATOR, id, 1)
            .await
            .unwrap();
        let second = advance_level(&state, OperatorAccess::OPERATOR, id, 1)
            .await
            .unwrap();

        assert_eq!(second.current_level_index, 1);
        assert!(second.level_start_time >= first.level_start_time);
        let snapshot = clock_snapshot(&state, id).await.unwrap();
        assert_eq!(snapshot.current_level_index, 1);
        assert_eq!(snapshot.level_start_time, Some(second.level_start_time));
    }

    #[tokio::test]
    async fn out_of_range_index_is_rejected_without_mutation() {
        let (state, id) = state_with_session(SessionStatus::Active).await;
        let before = clock_snapshot(&state, id).await.unwrap();

        let err = advance_level(&state, OperatorAccess::OPERATOR, id, 4)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(ref message) if message.contains("0..=3")));

        let after = clock_snapshot(&state, id).await.unwrap();
        assert_eq!(after.current_level_index, before.current_level_index);
        assert_eq!(after.level_start_time, before.level_start_time);
    }

    #[tokio::test]
    async fn viewer_cannot_advance() {
        let (state, id) = state_with_session(SessionStatus::Active).await;
        let err = advance_level(&state, OperatorAccess::VIEWER, id, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
        assert_eq!(
            clock_snapshot(&state, id).await.unwrap().current_level_index,
            0
        );
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let (state, _) = state_with_session(SessionStatus::Active).await;
        let err = advance_level(&state, OperatorAccess::OPERATOR, Uuid::new_v4(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn frozen_sessions_reject_advancement() {
        for status in [
            SessionStatus::NotStarted,
            SessionStatus::Completed,
            SessionStatus::Cancelled,
        ] {
            let (state, id) = state_with_session(status).await;
            let err = advance_level(&state, OperatorAccess::OPERATOR, id, 1)
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::InvalidState(_)), "{status:?}");
        }
    }

    #[tokio::test]
    async fn snapshot_payouts_use_configured_policy() {
        // no second-break label matches, so only the fallback level counts
        let config = AppConfig::builtin()
            .unwrap()
            .with_schedule(sample_schedule())
            .with_payout_policy(PayoutPolicy::new(3, Vec::<String>::new()));
        let (state, id) = state_from_config(config, SessionStatus::Active).await;

        let mut shown = Vec::new();
        for index in 0..=3 {
            advance_level(&state, OperatorAccess::OPERATOR, id, index)
                .await
                .unwrap();
            let snapshot = clock_snapshot(&state, id).await.unwrap();
            let payouts = payout_service::payouts(&state, OperatorAccess::VIEWER, id)
                .await
                .unwrap();
            assert_eq!(snapshot.show_payouts, payouts.show_payouts, "level {index}");
            shown.push(snapshot.show_payouts);
        }
        assert_eq!(shown, vec![false, false, false, true]);
    }

    #[tokio::test]
    async fn advancement_is_broadcast() {
        let (state, id) = state_with_session(SessionStatus::Active).await;
        let mut events = state.public_sse().subscribe();
        advance_level(&state, OperatorAccess::OPERATOR, id, 3)
            .await
            .unwrap();

        let event = events.recv().await.unwrap();
        assert_eq!(
            event.event.as_deref(),
            Some(sse_events::EVENT_LEVEL_CHANGED)
        );
        let body: serde_json::Value = serde_json::from_str(&event.data).unwrap();
        assert_eq!(body["currentLevelIndex"], 3);
    }
}
