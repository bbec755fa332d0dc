use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::schedule::{LevelSchedule, remaining_seconds};

/// Overall status of a tournament session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Registration may be open, the clock has not started.
    NotStarted,
    /// The clock is running.
    Active,
    /// The tournament ran to completion.
    Completed,
    /// The tournament was called off.
    Cancelled,
}

impl SessionStatus {
    /// Terminal statuses freeze the clock for good.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Cancelled)
    }
}

/// Rejected lifecycle transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionTransitionError {
    /// Only sessions that have not started can be started.
    #[error("session cannot be started while {0:?}")]
    NotStartable(SessionStatus),
    /// The clock only moves while the session is active.
    #[error("session clock is frozen while {0:?}")]
    NotActive(SessionStatus),
    /// Finishing requires a terminal outcome.
    #[error("{0:?} is not a terminal status")]
    NotTerminal(SessionStatus),
}

/// Server-owned clock state of one session.
///
/// `level_start_time` is always the instant the recorded `current_level_index`
/// began; both fields only change together through [`Self::advance_to`] or
/// [`Self::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClockState {
    /// Session identifier.
    pub session_id: Uuid,
    /// Display name.
    pub name: String,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Authoritative level index.
    pub current_level_index: usize,
    /// Instant the current level began, unset until the session starts.
    pub level_start_time: Option<OffsetDateTime>,
    /// Late registration has been closed by the floor.
    pub registration_closed: bool,
    /// Number of entries, used for payout tiers.
    pub entries: u32,
    /// Creation timestamp.
    pub created_at: OffsetDateTime,
    /// Last mutation timestamp.
    pub updated_at: OffsetDateTime,
}

impl SessionClockState {
    /// New session waiting to start.
    pub fn new(session_id: Uuid, name: impl Into<String>, now: OffsetDateTime) -> Self {
        Self {
            session_id,
            name: name.into(),
            status: SessionStatus::NotStarted,
            current_level_index: 0,
            level_start_time: None,
            registration_closed: false,
            entries: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Activate the clock on the first play level of `schedule`.
    pub fn start(
        &mut self,
        schedule: &LevelSchedule,
        now: OffsetDateTime,
    ) -> Result<(), SessionTransitionError> {
        if self.status != SessionStatus::NotStarted {
            return Err(SessionTransitionError::NotStartable(self.status));
        }
        self.status = SessionStatus::Active;
        self.current_level_index = schedule.first_playable_index();
        self.level_start_time = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Record `index` as the current level, starting now.
    ///
    /// Setting the index the session already holds still restarts the level.
    pub fn advance_to(
        &mut self,
        index: usize,
        now: OffsetDateTime,
    ) -> Result<(), SessionTransitionError> {
        if self.status != SessionStatus::Active {
            return Err(SessionTransitionError::NotActive(self.status));
        }
        self.current_level_index = index;
        self.level_start_time = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Move to a terminal status.
    pub fn finish(
        &mut self,
        outcome: SessionStatus,
        now: OffsetDateTime,
    ) -> Result<(), SessionTransitionError> {
        if !outcome.is_terminal() {
            return Err(SessionTransitionError::NotTerminal(outcome));
        }
        if self.status.is_terminal() {
            return Err(SessionTransitionError::NotActive(self.status));
        }
        self.status = outcome;
        self.updated_at = now;
        Ok(())
    }

    /// Seconds left in the recorded level as seen by the server.
    pub fn remaining_seconds(&self, schedule: &LevelSchedule, now: OffsetDateTime) -> Option<u64> {
        let level = schedule.level_at(self.current_level_index)?;
        let started_at = self.level_start_time?;
        Some(remaining_seconds(started_at, level.duration_seconds(), now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::schedule::tests::sample_schedule;
    use time::Duration;

    fn started() -> (SessionClockState, OffsetDateTime) {
        let t0 = OffsetDateTime::UNIX_EPOCH;
        let mut session = SessionClockState::new(Uuid::new_v4(), "Friday deepstack", t0);
        session.start(&sample_schedule(), t0).unwrap();
        (session, t0)
    }

    #[test]
    fn start_activates_first_playable_level() {
        let (session, t0) = started();
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.current_level_index, 0);
        assert_eq!(session.level_start_time, Some(t0));
    }

    #[test]
    fn start_twice_is_rejected() {
        let (mut session, t0) = started();
        assert_eq!(
            session.start(&sample_schedule(), t0),
            Err(SessionTransitionError::NotStartable(SessionStatus::Active))
        );
    }

    #[test]
    fn advance_moves_index_and_start_time_together() {
        let (mut session, t0) = started();
        let later = t0 + Duration::minutes(20);
        session.advance_to(1, later).unwrap();
        assert_eq!(session.current_level_index, 1);
        assert_eq!(session.level_start_time, Some(later));

        let again = later + Duration::seconds(3);
        session.advance_to(1, again).unwrap();
        assert_eq!(session.current_level_index, 1);
        assert_eq!(session.level_start_time, Some(again));
    }

    #[test]
    fn finished_session_is_frozen() {
        let (mut session, t0) = started();
        session.finish(SessionStatus::Completed, t0).unwrap();
        assert_eq!(
            session.advance_to(2, t0),
            Err(SessionTransitionError::NotActive(SessionStatus::Completed))
        );
        assert_eq!(session.current_level_index, 0);
    }

    #[test]
    fn finish_requires_terminal_outcome() {
        let (mut session, t0) = started();
        assert_eq!(
            session.finish(SessionStatus::Active, t0),
            Err(SessionTransitionError::NotTerminal(SessionStatus::Active))
        );
    }

    #[test]
    fn remaining_time_reflects_server_level() {
        let (session, t0) = started();
        let schedule = sample_schedule();
        assert_eq!(
            session.remaining_seconds(&schedule, t0 + Duration::minutes(5)),
            Some(15 * 60)
        );
        assert_eq!(
            session.remaining_seconds(&schedule, t0 + Duration::minutes(21)),
            Some(0)
        );
    }
}
