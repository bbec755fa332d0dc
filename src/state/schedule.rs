//! Blind-level schedule model shared by the server and the viewer.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use utoipa::ToSchema;

/// Action announced on a break level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SpecialAction {
    /// Nothing happens during this break.
    #[default]
    None,
    /// Colour up the smallest chips to 1s.
    #[serde(rename = "chip_up_to_1s")]
    ChipUpTo1s,
    /// Colour up the smallest chips to 5s.
    #[serde(rename = "chip_up_to_5s")]
    ChipUpTo5s,
    /// Late registration closes at this break.
    RegistrationCloses,
    /// Late registration closes and chips are coloured up to 5s.
    #[serde(rename = "registration_closes_and_chip_up_to_5s")]
    RegistrationClosesAndChipUpTo5s,
}

impl SpecialAction {
    /// True when this action closes late registration.
    pub fn closes_registration(self) -> bool {
        matches!(
            self,
            SpecialAction::RegistrationCloses | SpecialAction::RegistrationClosesAndChipUpTo5s
        )
    }
}

/// Forced bets of a play level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blinds {
    /// Small blind amount.
    pub small_blind: u64,
    /// Big blind amount.
    pub big_blind: u64,
    /// Ante, zero when the level has none.
    pub ante: u64,
}

/// Shape of a level: either a play period or a break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelKind {
    /// Regular play period with blinds.
    Regular(Blinds),
    /// Non-play period.
    Break {
        /// Display label, e.g. `B2`.
        label: String,
        /// Action taken during the break.
        special_action: SpecialAction,
    },
}

/// One immutable entry of the schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    /// 0-based position in the schedule.
    pub index: usize,
    /// Duration in whole minutes.
    pub duration_minutes: u32,
    /// Play level or break.
    pub kind: LevelKind,
}

impl Level {
    /// Build a regular play level.
    pub fn regular(index: usize, duration_minutes: u32, blinds: Blinds) -> Self {
        Self {
            index,
            duration_minutes,
            kind: LevelKind::Regular(blinds),
        }
    }

    /// Build a break level.
    pub fn break_level(
        index: usize,
        duration_minutes: u32,
        label: impl Into<String>,
        special_action: SpecialAction,
    ) -> Self {
        Self {
            index,
            duration_minutes,
            kind: LevelKind::Break {
                label: label.into(),
                special_action,
            },
        }
    }

    /// Level duration expressed in seconds.
    pub fn duration_seconds(&self) -> u64 {
        u64::from(self.duration_minutes) * 60
    }

    /// Whether this level is a break.
    pub fn is_break(&self) -> bool {
        matches!(self.kind, LevelKind::Break { .. })
    }

    /// Break label, `None` for play levels.
    pub fn break_label(&self) -> Option<&str> {
        match &self.kind {
            LevelKind::Break { label, .. } => Some(label),
            LevelKind::Regular(_) => None,
        }
    }

    /// Special action, always [`SpecialAction::None`] for play levels.
    pub fn special_action(&self) -> SpecialAction {
        match &self.kind {
            LevelKind::Break { special_action, .. } => *special_action,
            LevelKind::Regular(_) => SpecialAction::None,
        }
    }

    /// Blinds of a play level.
    pub fn blinds(&self) -> Option<Blinds> {
        match &self.kind {
            LevelKind::Regular(blinds) => Some(*blinds),
            LevelKind::Break { .. } => None,
        }
    }
}

/// Reasons a schedule cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// The schedule has no levels at all.
    #[error("schedule must contain at least one level")]
    Empty,
    /// Two levels claim the same index.
    #[error("duplicate level index {index}")]
    DuplicateIndex {
        /// Offending index.
        index: usize,
    },
    /// Indices are not contiguous from zero.
    #[error("level indices must be contiguous from 0; expected {expected}, found {found}")]
    Gap {
        /// Index that should appear at this position.
        expected: usize,
        /// Index actually found.
        found: usize,
    },
    /// A level lasts zero minutes.
    #[error("level {index} has a zero duration")]
    ZeroDuration {
        /// Offending index.
        index: usize,
    },
    /// A play level lacks its blinds.
    #[error("level {index} is not a break but has no blinds")]
    MissingBlinds {
        /// Offending index.
        index: usize,
    },
    /// A play level carries a break-only special action.
    #[error("level {index} is not a break but declares special action {action:?}")]
    SpecialActionOnPlayLevel {
        /// Offending index.
        index: usize,
        /// Declared action.
        action: SpecialAction,
    },
}

/// Ordered, immutable list of levels.
///
/// Ordering by `index` is the only invariant: after construction, the level at
/// position `i` always has `index == i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelSchedule {
    levels: Vec<Level>,
}

impl LevelSchedule {
    /// Validate and order the given levels.
    pub fn new(mut levels: Vec<Level>) -> Result<Self, ScheduleError> {
        if levels.is_empty() {
            return Err(ScheduleError::Empty);
        }

        levels.sort_by_key(|level| level.index);
        for (position, level) in levels.iter().enumerate() {
            if level.index < position {
                return Err(ScheduleError::DuplicateIndex { index: level.index });
            }
            if level.index != position {
                return Err(ScheduleError::Gap {
                    expected: position,
                    found: level.index,
                });
            }
            if level.duration_minutes == 0 {
                return Err(ScheduleError::ZeroDuration { index: level.index });
            }
        }

        Ok(Self { levels })
    }

    /// Level stored at `index`, `None` past the final level.
    pub fn level_at(&self, index: usize) -> Option<&Level> {
        self.levels.get(index)
    }

    /// All levels in schedule order.
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Number of levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Always false for a constructed schedule, kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Index of the final level.
    pub fn last_index(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    /// True when `index` designates an existing level.
    pub fn contains(&self, index: usize) -> bool {
        index < self.levels.len()
    }

    /// Index following `index`, if the schedule continues.
    pub fn next_index(&self, index: usize) -> Option<usize> {
        let next = index.checked_add(1)?;
        self.contains(next).then_some(next)
    }

    /// First level that is not a break; the first level when all are breaks.
    pub fn first_playable_index(&self) -> usize {
        self.levels
            .iter()
            .find(|level| !level.is_break())
            .map(|level| level.index)
            .unwrap_or(0)
    }

    /// Total duration in seconds of the levels in `from..to`.
    ///
    /// Returns `None` when the range leaves the schedule.
    pub fn span_seconds(&self, from: usize, to: usize) -> Option<u64> {
        if from > to {
            return None;
        }
        self.levels
            .get(from..to)
            .map(|levels| levels.iter().map(Level::duration_seconds).sum())
    }
}

/// Seconds left in a level of `duration_seconds` that began at `started_at`.
///
/// Elapsed time is counted in whole seconds and a start in the future counts
/// as zero elapsed; the result is floored at zero.
pub fn remaining_seconds(
    started_at: OffsetDateTime,
    duration_seconds: u64,
    now: OffsetDateTime,
) -> u64 {
    let elapsed = (now - started_at).whole_seconds().max(0) as u64;
    duration_seconds.saturating_sub(elapsed)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use time::Duration;

    pub(crate) fn blinds(small_blind: u64) -> Blinds {
        Blinds {
            small_blind,
            big_blind: small_blind * 2,
            ante: 0,
        }
    }

    /// L0(20m), L1(20m), Break(10m, "B2"), L2(20m).
    pub(crate) fn sample_schedule() -> LevelSchedule {
        LevelSchedule::new(vec![
            Level::regular(0, 20, blinds(100)),
            Level::regular(1, 20, blinds(200)),
            Level::break_level(2, 10, "B2", SpecialAction::ChipUpTo5s),
            Level::regular(3, 20, blinds(300)),
        ])
        .unwrap()
    }

    #[test]
    fn levels_are_ordered_by_index() {
        let schedule = LevelSchedule::new(vec![
            Level::regular(1, 20, blinds(200)),
            Level::regular(0, 15, blinds(100)),
        ])
        .unwrap();

        assert_eq!(schedule.level_at(0).unwrap().duration_minutes, 15);
        assert_eq!(schedule.level_at(1).unwrap().duration_minutes, 20);
        assert!(schedule.level_at(2).is_none());
    }

    #[test]
    fn rejects_malformed_schedules() {
        assert_eq!(LevelSchedule::new(vec![]), Err(ScheduleError::Empty));
        assert_eq!(
            LevelSchedule::new(vec![
                Level::regular(0, 20, blinds(100)),
                Level::regular(0, 20, blinds(100)),
            ]),
            Err(ScheduleError::DuplicateIndex { index: 0 })
        );
        assert_eq!(
            LevelSchedule::new(vec![
                Level::regular(0, 20, blinds(100)),
                Level::regular(2, 20, blinds(100)),
            ]),
            Err(ScheduleError::Gap {
                expected: 1,
                found: 2
            })
        );
        assert_eq!(
            LevelSchedule::new(vec![Level::regular(0, 0, blinds(100))]),
            Err(ScheduleError::ZeroDuration { index: 0 })
        );
    }

    #[test]
    fn next_index_stops_at_final_level() {
        let schedule = sample_schedule();
        assert_eq!(schedule.next_index(2), Some(3));
        assert_eq!(schedule.next_index(3), None);
        assert_eq!(schedule.last_index(), 3);
    }

    #[test]
    fn first_playable_skips_leading_breaks() {
        let schedule = LevelSchedule::new(vec![
            Level::break_level(0, 5, "Seating", SpecialAction::None),
            Level::regular(1, 20, blinds(100)),
        ])
        .unwrap();
        assert_eq!(schedule.first_playable_index(), 1);
    }

    #[test]
    fn span_covers_half_open_range() {
        let schedule = sample_schedule();
        assert_eq!(schedule.span_seconds(1, 3), Some(30 * 60));
        assert_eq!(schedule.span_seconds(2, 2), Some(0));
        assert_eq!(schedule.span_seconds(3, 5), None);
    }

    #[test]
    fn remaining_is_floored_at_zero() {
        let start = OffsetDateTime::UNIX_EPOCH;
        assert_eq!(
            remaining_seconds(start, 1200, start + Duration::seconds(90)),
            1110
        );
        assert_eq!(
            remaining_seconds(start, 1200, start + Duration::minutes(21)),
            0
        );
        assert_eq!(
            remaining_seconds(start, 1200, start - Duration::seconds(5)),
            1200
        );
    }
}
