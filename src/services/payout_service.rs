use tracing::debug;
use uuid::Uuid;

use crate::{
    dto::payouts::PayoutsResponse,
    error::ServiceError,
    services::{access::OperatorAccess, clock_service::load_session},
    state::SharedState,
};

/// Evaluate payout visibility on the server-confirmed level of a session.
///
/// Tier percentages are attached when payouts are visible, and always for
/// operators.
pub async fn payouts(
    state: &SharedState,
    access: OperatorAccess,
    session_id: Uuid,
) -> Result<PayoutsResponse, ServiceError> {
    let session = load_session(state, session_id).await?;
    let config = state.config();

    let decision = config.payout_policy().evaluate(
        session.current_level_index,
        config.schedule(),
        session.registration_closed,
    );
    debug!(%session_id, level_index = session.current_level_index, ?decision, "payout visibility evaluated");

    let show_payouts = decision.is_shown();
    let tiers = (show_payouts || access.privileged)
        .then(|| config.payout_table().tiers_for(session.entries))
        .flatten()
        .map(<[f64]>::to_vec);

    Ok(PayoutsResponse {
        session_id,
        show_payouts,
        current_level_index: session.current_level_index,
        entries: session.entries,
        tiers,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::OffsetDateTime;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::session_store::{SessionStore, memory::MemorySessionStore},
        state::{AppState, schedule::tests::sample_schedule, session::SessionClockState},
    };

    async fn state_at(level_index: usize, entries: u32) -> (SharedState, Uuid) {
        let state = AppState::new(
            AppConfig::builtin()
                .unwrap()
                .with_schedule(sample_schedule()),
        );
        let store = Arc::new(MemorySessionStore::new());
        state.set_session_store(store.clone()).await;

        let now = OffsetDateTime::now_utc();
        let mut session = SessionClockState::new(Uuid::new_v4(), "Deepstack", now);
        session.start(state.schedule(), now).unwrap();
        session.advance_to(level_index, now).unwrap();
        session.entries = entries;
        store.save_session(session.clone().into()).await.unwrap();
        (state, session.session_id)
    }

    #[tokio::test]
    async fn hidden_before_second_break_for_viewers() {
        let (state, id) = state_at(1, 20).await;
        let response = payouts(&state, OperatorAccess::VIEWER, id).await.unwrap();
        assert!(!response.show_payouts);
        assert!(response.tiers.is_none());
    }

    #[tokio::test]
    async fn operators_always_see_tiers() {
        let (state, id) = state_at(1, 20).await;
        let response = payouts(&state, OperatorAccess::OPERATOR, id).await.unwrap();
        assert!(!response.show_payouts);
        assert_eq!(response.tiers.map(|tiers| tiers.len()), Some(3));
    }

    #[tokio::test]
    async fn shown_once_second_break_reached() {
        let (state, id) = state_at(2, 20).await;
        let response = payouts(&state, OperatorAccess::VIEWER, id).await.unwrap();
        assert!(response.show_payouts);
        assert_eq!(response.tiers, Some(vec![50.0, 30.0, 20.0]));
    }
}
