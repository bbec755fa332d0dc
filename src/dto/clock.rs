//! Wire types of the clock snapshot and level advancement endpoints.
//!
//! These payloads are shared by the HTTP handlers and the viewer's HTTP
//! client, so they derive both `Serialize` and `Deserialize`.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::{
    payouts::PayoutPolicy,
    schedule::{Blinds, Level, LevelKind, LevelSchedule, ScheduleError, SpecialAction},
    session::{SessionClockState, SessionStatus},
};

/// Flat representation of a level, as stored in config files and sent to viewers.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LevelDto {
    pub index: usize,
    pub duration_minutes: u32,
    #[serde(default)]
    pub is_break: bool,
    /// Present only on play levels.
    pub small_blind: Option<u64>,
    /// Present only on play levels.
    pub big_blind: Option<u64>,
    /// Present only on play levels.
    pub ante: Option<u64>,
    /// Present only on breaks.
    pub break_label: Option<String>,
    #[serde(default)]
    pub special_action: SpecialAction,
}

impl From<&Level> for LevelDto {
    fn from(level: &Level) -> Self {
        match &level.kind {
            LevelKind::Regular(blinds) => Self {
                index: level.index,
                duration_minutes: level.duration_minutes,
                is_break: false,
                small_blind: Some(blinds.small_blind),
                big_blind: Some(blinds.big_blind),
                ante: Some(blinds.ante),
                break_label: None,
                special_action: SpecialAction::None,
            },
            LevelKind::Break {
                label,
                special_action,
            } => Self {
                index: level.index,
                duration_minutes: level.duration_minutes,
                is_break: true,
                small_blind: None,
                big_blind: None,
                ante: None,
                break_label: Some(label.clone()),
                special_action: *special_action,
            },
        }
    }
}

impl TryFrom<LevelDto> for Level {
    type Error = ScheduleError;

    fn try_from(value: LevelDto) -> Result<Self, Self::Error> {
        if value.is_break {
            let label = value
                .break_label
                .filter(|label| !label.trim().is_empty())
                .unwrap_or_else(|| "Break".to_string());
            return Ok(Level::break_level(
                value.index,
                value.duration_minutes,
                label,
                value.special_action,
            ));
        }

        if value.special_action != SpecialAction::None {
            return Err(ScheduleError::SpecialActionOnPlayLevel {
                index: value.index,
                action: value.special_action,
            });
        }

        let (Some(small_blind), Some(big_blind)) = (value.small_blind, value.big_blind) else {
            return Err(ScheduleError::MissingBlinds { index: value.index });
        };

        Ok(Level::regular(
            value.index,
            value.duration_minutes,
            Blinds {
                small_blind,
                big_blind,
                ante: value.ante.unwrap_or(0),
            },
        ))
    }
}

/// Convert flat level records into a validated schedule.
pub fn schedule_from_dtos(levels: Vec<LevelDto>) -> Result<LevelSchedule, ScheduleError> {
    let levels = levels
        .into_iter()
        .map(Level::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    LevelSchedule::new(levels)
}

/// Flatten a schedule for the wire.
pub fn schedule_to_dtos(schedule: &LevelSchedule) -> Vec<LevelDto> {
    schedule.levels().iter().map(LevelDto::from).collect()
}

/// Combined schedule + session clock state returned to polling viewers.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClockSnapshotResponse {
    pub session_id: Uuid,
    pub levels: Vec<LevelDto>,
    /// Authoritative level index.
    pub current_level_index: usize,
    pub current_level: Option<LevelDto>,
    /// RFC 3339 instant the current level began; null before the session starts.
    #[serde(with = "time::serde::rfc3339::option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub level_start_time: Option<OffsetDateTime>,
    pub session_status: SessionStatus,
    pub registration_closed: bool,
    /// Payout visibility on `current_level_index` under the configured policy.
    pub show_payouts: bool,
    /// Server clock when the snapshot was taken, useful to estimate skew.
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub server_time: OffsetDateTime,
}

impl ClockSnapshotResponse {
    /// Build the snapshot of `session` against `schedule`.
    pub fn new(
        session: &SessionClockState,
        schedule: &LevelSchedule,
        payout_policy: &PayoutPolicy,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            session_id: session.session_id,
            levels: schedule_to_dtos(schedule),
            current_level_index: session.current_level_index,
            current_level: schedule
                .level_at(session.current_level_index)
                .map(LevelDto::from),
            level_start_time: session.level_start_time,
            session_status: session.status,
            registration_closed: session.registration_closed,
            show_payouts: payout_policy.should_show_payouts(
                session.current_level_index,
                schedule,
                session.registration_closed,
            ),
            server_time: now,
        }
    }
}

/// Request body of the level advancement endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceLevelRequest {
    pub level_index: usize,
}

/// Confirmation of a level advancement.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceLevelResponse {
    pub session_id: Uuid,
    pub current_level_index: usize,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub level_start_time: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::schedule::tests::sample_schedule;

    #[test]
    fn level_dto_round_trips_through_schedule() {
        let schedule = sample_schedule();
        let rebuilt = schedule_from_dtos(schedule_to_dtos(&schedule)).unwrap();
        assert_eq!(rebuilt, schedule);
    }

    #[test]
    fn play_level_requires_blinds() {
        let dto = LevelDto {
            index: 0,
            duration_minutes: 20,
            is_break: false,
            small_blind: Some(100),
            big_blind: None,
            ante: None,
            break_label: None,
            special_action: SpecialAction::None,
        };
        assert_eq!(
            Level::try_from(dto),
            Err(ScheduleError::MissingBlinds { index: 0 })
        );
    }

    #[test]
    fn break_fields_are_omitted_from_play_levels() {
        let schedule = sample_schedule();
        let json = serde_json::to_value(LevelDto::from(schedule.level_at(0).unwrap())).unwrap();
        assert_eq!(json["smallBlind"], 100);
        assert!(json.get("breakLabel").is_none());
        assert_eq!(json["specialAction"], "none");

        let json = serde_json::to_value(LevelDto::from(schedule.level_at(2).unwrap())).unwrap();
        assert_eq!(json["isBreak"], true);
        assert_eq!(json["breakLabel"], "B2");
        assert_eq!(json["specialAction"], "chip_up_to_5s");
        assert!(json.get("smallBlind").is_none());
    }

    #[test]
    fn config_style_level_parses_with_defaults() {
        let dto: LevelDto = serde_json::from_str(
            r#"{"index": 1, "durationMinutes": 15, "smallBlind": 50, "bigBlind": 100}"#,
        )
        .unwrap();
        let level = Level::try_from(dto).unwrap();
        assert_eq!(level.blinds().unwrap().ante, 0);
        assert!(!level.is_break());
    }
}
