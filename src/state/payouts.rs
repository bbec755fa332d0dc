//! Payout visibility rules and the payout tier table.

use crate::state::schedule::LevelSchedule;

/// Level index from which payouts are shown when the schedule carries no
/// better marker. Nobody has documented where this value comes from; treat it
/// as a heuristic and keep it configurable.
pub const DEFAULT_FALLBACK_LEVEL_INDEX: usize = 6;

/// Break labels that designate the second scheduled break.
pub const DEFAULT_SECOND_BREAK_LABELS: &[&str] = &["B2", "Break 2", "Second Break"];

/// Which rule decided payout visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayoutDecision {
    /// The floor closed registration explicitly.
    RegistrationClosed,
    /// The second break has been reached.
    SecondBreakReached {
        /// Index of the second break.
        break_index: usize,
    },
    /// The level closing registration has been reached.
    RegistrationClosingLevelReached {
        /// Index of that level.
        level_index: usize,
    },
    /// The fallback level index has been reached.
    FallbackLevelReached {
        /// Configured fallback index.
        level_index: usize,
    },
    /// No rule matched yet.
    Hidden,
}

impl PayoutDecision {
    /// True unless the decision is [`PayoutDecision::Hidden`].
    pub fn is_shown(self) -> bool {
        !matches!(self, PayoutDecision::Hidden)
    }
}

/// Rules deciding whether payout information is exposed to regular viewers.
///
/// Every rule is a lower bound on the level index, so once payouts are shown
/// for an index they stay shown for every later index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutPolicy {
    fallback_level_index: usize,
    second_break_labels: Vec<String>,
}

impl Default for PayoutPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_FALLBACK_LEVEL_INDEX,
            DEFAULT_SECOND_BREAK_LABELS.iter().map(|label| label.to_string()),
        )
    }
}

impl PayoutPolicy {
    /// Build a policy from a fallback index and the labels naming the second break.
    pub fn new(
        fallback_level_index: usize,
        second_break_labels: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            fallback_level_index,
            second_break_labels: second_break_labels
                .into_iter()
                .map(|label| normalize_label(&label))
                .filter(|label| !label.is_empty())
                .collect(),
        }
    }

    /// Configured fallback index.
    pub fn fallback_level_index(&self) -> usize {
        self.fallback_level_index
    }

    /// Evaluate the rules in priority order.
    ///
    /// `current_level_index` must be the server-confirmed index whenever the
    /// answer gates money figures.
    pub fn evaluate(
        &self,
        current_level_index: usize,
        schedule: &LevelSchedule,
        registration_closed: bool,
    ) -> PayoutDecision {
        if registration_closed {
            return PayoutDecision::RegistrationClosed;
        }

        if let Some(break_index) = self.second_break_index(schedule) {
            if current_level_index >= break_index {
                return PayoutDecision::SecondBreakReached { break_index };
            }
        }

        if let Some(level_index) = registration_closing_index(schedule) {
            if current_level_index >= level_index {
                return PayoutDecision::RegistrationClosingLevelReached { level_index };
            }
        }

        if current_level_index >= self.fallback_level_index {
            return PayoutDecision::FallbackLevelReached {
                level_index: self.fallback_level_index,
            };
        }

        PayoutDecision::Hidden
    }

    /// Shorthand for `evaluate(..).is_shown()`.
    pub fn should_show_payouts(
        &self,
        current_level_index: usize,
        schedule: &LevelSchedule,
        registration_closed: bool,
    ) -> bool {
        self.evaluate(current_level_index, schedule, registration_closed)
            .is_shown()
    }

    /// Index of the break whose label marks it as the second scheduled break.
    pub fn second_break_index(&self, schedule: &LevelSchedule) -> Option<usize> {
        schedule
            .levels()
            .iter()
            .filter_map(|level| level.break_label().map(|label| (level.index, label)))
            .find(|(_, label)| {
                let label = normalize_label(label);
                self.second_break_labels.iter().any(|known| *known == label)
            })
            .map(|(index, _)| index)
    }
}

fn registration_closing_index(schedule: &LevelSchedule) -> Option<usize> {
    schedule
        .levels()
        .iter()
        .find(|level| level.special_action().closes_registration())
        .map(|level| level.index)
}

fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Payout split for tournaments starting at `min_entries` entries.
#[derive(Debug, Clone, PartialEq)]
pub struct PayoutBracket {
    /// Smallest entry count this bracket applies to.
    pub min_entries: u32,
    /// Percentages of the prize pool, first place first.
    pub percentages: Vec<f64>,
}

/// Entry-count → payout tier lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct PayoutTable {
    brackets: Vec<PayoutBracket>,
}

impl Default for PayoutTable {
    fn default() -> Self {
        Self::new(vec![
            PayoutBracket {
                min_entries: 1,
                percentages: vec![100.0],
            },
            PayoutBracket {
                min_entries: 8,
                percentages: vec![65.0, 35.0],
            },
            PayoutBracket {
                min_entries: 16,
                percentages: vec![50.0, 30.0, 20.0],
            },
            PayoutBracket {
                min_entries: 28,
                percentages: vec![45.0, 27.0, 18.0, 10.0],
            },
            PayoutBracket {
                min_entries: 40,
                percentages: vec![40.0, 25.0, 16.0, 11.0, 8.0],
            },
        ])
    }
}

impl PayoutTable {
    /// Build a table; brackets may be given in any order.
    pub fn new(mut brackets: Vec<PayoutBracket>) -> Self {
        brackets.sort_by_key(|bracket| bracket.min_entries);
        Self { brackets }
    }

    /// Tier percentages for `entries`, `None` below the smallest bracket.
    pub fn tiers_for(&self, entries: u32) -> Option<&[f64]> {
        self.brackets
            .iter()
            .rev()
            .find(|bracket| bracket.min_entries <= entries)
            .map(|bracket| bracket.percentages.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::schedule::{
        Level, SpecialAction,
        tests::{blinds, sample_schedule},
    };

    fn long_schedule(closing_at: Option<usize>) -> LevelSchedule {
        let levels = (0..12)
            .map(|index| match closing_at {
                Some(at) if at == index => {
                    Level::break_level(index, 10, "Break", SpecialAction::RegistrationCloses)
                }
                _ => Level::regular(index, 20, blinds(100 * (index as u64 + 1))),
            })
            .collect();
        LevelSchedule::new(levels).unwrap()
    }

    #[test]
    fn second_break_gates_visibility() {
        let policy = PayoutPolicy::default();
        let schedule = sample_schedule();
        assert!(!policy.should_show_payouts(1, &schedule, false));
        assert_eq!(
            policy.evaluate(2, &schedule, false),
            PayoutDecision::SecondBreakReached { break_index: 2 }
        );
    }

    #[test]
    fn registration_closed_flag_wins() {
        let policy = PayoutPolicy::default();
        assert_eq!(
            policy.evaluate(0, &sample_schedule(), true),
            PayoutDecision::RegistrationClosed
        );
    }

    #[test]
    fn registration_closing_level_is_used_without_second_break() {
        let policy = PayoutPolicy::default();
        let schedule = long_schedule(Some(4));
        assert!(!policy.should_show_payouts(3, &schedule, false));
        assert_eq!(
            policy.evaluate(4, &schedule, false),
            PayoutDecision::RegistrationClosingLevelReached { level_index: 4 }
        );
    }

    #[test]
    fn fallback_threshold_is_configurable() {
        let schedule = long_schedule(None);
        let policy = PayoutPolicy::default();
        assert!(!policy.should_show_payouts(5, &schedule, false));
        assert!(policy.should_show_payouts(6, &schedule, false));

        let stricter = PayoutPolicy::new(9, Vec::new());
        assert!(!stricter.should_show_payouts(8, &schedule, false));
        assert!(stricter.should_show_payouts(9, &schedule, false));
    }

    #[test]
    fn labels_match_loosely() {
        let schedule = LevelSchedule::new(vec![
            Level::regular(0, 20, blinds(100)),
            Level::break_level(1, 10, "  second   BREAK ", SpecialAction::None),
        ])
        .unwrap();
        assert_eq!(
            PayoutPolicy::default().second_break_index(&schedule),
            Some(1)
        );
    }

    #[test]
    fn visibility_is_monotonic_in_level_index() {
        let policy = PayoutPolicy::default();
        for schedule in [sample_schedule(), long_schedule(Some(3)), long_schedule(None)] {
            let mut shown = false;
            for index in 0..schedule.len() {
                let now_shown = policy.should_show_payouts(index, &schedule, false);
                assert!(!shown || now_shown, "visibility regressed at {index}");
                shown = now_shown;
            }
        }
    }

    #[test]
    fn tiers_follow_entry_brackets() {
        let table = PayoutTable::default();
        assert_eq!(table.tiers_for(0), None);
        assert_eq!(table.tiers_for(7), Some(&[100.0][..]));
        assert_eq!(table.tiers_for(16).map(<[f64]>::len), Some(3));
        assert_eq!(table.tiers_for(500).map(<[f64]>::len), Some(5));
    }
}
