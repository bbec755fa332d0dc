//! DTO definitions used by the operator session management API.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::validation::validate_session_name,
    state::session::{SessionClockState, SessionStatus},
};

/// Payload creating a session that has not started yet.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateSessionRequest {
    #[validate(length(min = 1, max = 120), custom(function = "validate_session_name"))]
    pub name: String,
}

/// Terminal outcome requested when finishing a session.
#[derive(Debug, Deserialize, ToSchema)]
pub struct FinishSessionRequest {
    /// `COMPLETED` or `CANCELLED`.
    pub status: SessionStatus,
}

/// Registration flags maintained by the floor.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationUpdateRequest {
    pub registration_closed: bool,
    /// Replaces the entry count when present.
    #[serde(default)]
    #[validate(range(max = 100_000))]
    pub entries: Option<u32>,
}

/// Operator view of a session record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub name: String,
    pub status: SessionStatus,
    pub current_level_index: usize,
    #[serde(with = "time::serde::rfc3339::option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub level_start_time: Option<OffsetDateTime>,
    pub registration_closed: bool,
    pub entries: u32,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: OffsetDateTime,
}

impl From<SessionClockState> for SessionSummary {
    fn from(value: SessionClockState) -> Self {
        Self {
            session_id: value.session_id,
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
