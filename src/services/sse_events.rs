use serde::Serialize;
use tracing::warn;

use crate::{
    dto::sse::{LevelChangedEvent, ServerEvent, SessionStatusEvent},
    state::{SharedState, session::SessionClockState},
};

pub const EVENT_LEVEL_CHANGED: &str = "clock.level_changed";
pub const EVENT_SESSION_STATUS: &str = "clock.session_status";

/// Announce a new authoritative level so dashboards can refresh without waiting for a poll.
pub fn broadcast_level_changed(state: &SharedState, session: &SessionClockState) {
    let Some(level_start_time) = session.level_start_time else {
        return;
    };
    let payload = LevelChangedEvent {
        session_id: session.session_id,
        current_level_index: session.current_level_index,
        level_start_time,
    };
    send_public_event(state, EVENT_LEVEL_CHANGED, &payload);
}

/// Announce a lifecycle change of a session.
pub fn broadcast_session_status(state: &SharedState, session: &SessionClockState) {
    let payload = SessionStatusEvent {
        session_id: session.session_id,
        status: session.status,
    };
    send_public_event(state, EVENT_SESSION_STATUS, &payload);
}

fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.public_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}
