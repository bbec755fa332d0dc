use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::state::session::{SessionClockState, SessionStatus};

/// Persisted representation of a tournament session and its clock.
///
/// The record is always written whole, so `current_level_index` and
/// `level_start_time` reach the store together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionEntity {
    /// Stable identifier for the session.
    pub id: Uuid,
    /// Human readable session name.
    pub name: String,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Authoritative level index.
    pub current_level_index: usize,
    /// Instant the current level began.
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub level_start_time: Option<OffsetDateTime>,
    /// Late registration closed flag.
    #[serde(default)]
    pub registration_closed: bool,
    /// Entry count.
    #[serde(default)]
    pub entries: u32,
    /// Creation timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last time this record was updated.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<SessionClockState> for SessionEntity {
    fn from(value: SessionClockState) -> Self {
        Self {
            id: value.session_id,
            name: value.name,
            status: value.status,
            current_level_index: value.current_level_index,
            level_start_time: value.level_start_time,
            registration_closed: value.registration_closed,
            entries: value.entries,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl From<SessionEntity> for SessionClockState {
    fn from(value: SessionEntity) -> Self {
        Self {
            session_id: value.id,
            name: value.name,
            status: value.status,
            current_level_index: value.current_level_index,
            level_start_time: value.level_start_time,
            registration_closed: value.registration_closed,
            entries: value.entries,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}
