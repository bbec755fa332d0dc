//! Clock reconciliation between the server's confirmed level and the local
//! countdown.
//!
//! [`ClockEngine`] is a plain state object: every transition takes the
//! current instant as an argument and returns the [`ClockCommand`]s the
//! runtime has to execute, so the whole state machine is testable without
//! timers or a network.
//!
//! The displayed level may run ahead of the server while the countdown keeps
//! expiring locally. A privileged engine additionally asks the server to
//! advance, at most once per expiry, guarded by the `has_requested_advance`
//! lock which is set before the request command leaves the engine. Once the
//! confirmed level has run out, failed requests are retried on later ticks
//! while the display keeps counting down the optimistic level.

use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};

use crate::{
    dto::clock::AdvanceLevelResponse,
    state::{
        schedule::{Level, LevelSchedule, remaining_seconds},
        session::SessionStatus,
    },
    viewer::{
        api::ClockSnapshot,
        error::{ApiError, LevelRequestError},
    },
};

/// Event fed into the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum ClockInput {
    /// A successful poll.
    Poll(ClockSnapshot),
    /// One second of local time elapsed.
    Tick,
    /// An advancement request finished.
    AdvanceResolved(AdvanceResolution),
}

/// What caused an advancement request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceTrigger {
    /// The confirmed level ran out on a privileged viewer.
    Expiry,
    /// An operator picked a level explicitly.
    Manual,
}

/// Advancement request the runtime must send to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceRequest {
    pub generation: u64,
    pub request_id: u64,
    pub target: usize,
    pub trigger: AdvanceTrigger,
}

/// Side effect requested by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockCommand {
    /// Send an advancement request.
    Advance(AdvanceRequest),
    /// Poll now instead of waiting for the next interval.
    Refresh,
}

/// Result of an advancement request, tagged with the request that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvanceResolution {
    pub generation: u64,
    pub request_id: u64,
    pub outcome: AdvanceOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Confirmed { level_index: usize },
    Failed { retryable: bool, reason: String },
}

impl AdvanceOutcome {
    pub fn from_result(result: &Result<AdvanceLevelResponse, ApiError>) -> Self {
        match result {
            Ok(response) => AdvanceOutcome::Confirmed {
                level_index: response.current_level_index,
            },
            Err(err) => AdvanceOutcome::Failed {
                retryable: err.is_retryable(),
                reason: err.to_string(),
            },
        }
    }
}

/// Render-ready state of one viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct ClockView {
    pub displayed_level_index: usize,
    pub displayed_level: Option<Level>,
    pub remaining_seconds: u64,
    /// Last index confirmed by a poll.
    pub server_level_index: usize,
    /// Whether the display shows the server-confirmed level.
    pub synced: bool,
    pub status: SessionStatus,
    pub registration_closed: bool,
    pub advance_requested: bool,
    /// Payout visibility the server reported for `server_level_index`.
    pub show_payouts: bool,
}

impl ClockView {
    /// Remaining time as `MM:SS`, or `H:MM:SS` past an hour.
    pub fn remaining_display(&self) -> String {
        format_remaining(self.remaining_seconds)
    }
}

/// Format a second count as `MM:SS`, or `H:MM:SS` past an hour.
pub fn format_remaining(seconds: u64) -> String {
    let (hours, minutes, seconds) = (seconds / 3600, seconds / 60 % 60, seconds % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

/// Per-viewer clock state machine.
#[derive(Debug, Clone)]
pub struct ClockEngine {
    privileged: bool,
    auto_advance: bool,
    generation: u64,
    next_request_id: u64,
    snapshot: ClockSnapshot,
    /// Server clock minus local clock, measured at the last poll.
    skew: Duration,
    displayed_level_index: usize,
    remaining_seconds: u64,
    has_requested_advance: bool,
    pending_expiry_request: Option<u64>,
    /// The server-confirmed level ran out locally and the server has not moved yet.
    confirmed_expired: bool,
}

impl ClockEngine {
    /// Engine synced to `snapshot` as of `now`.
    pub fn new(snapshot: ClockSnapshot, privileged: bool, now: OffsetDateTime) -> Self {
        let mut engine = Self {
            privileged,
            auto_advance: privileged,
            generation: 0,
            next_request_id: 0,
            skew: snapshot.server_time - now,
            displayed_level_index: snapshot.current_level_index,
            remaining_seconds: 0,
            has_requested_advance: false,
            pending_expiry_request: None,
            confirmed_expired: false,
            snapshot,
        };
        engine.remaining_seconds = engine.estimate_remaining(now);
        engine
    }

    /// Apply one input, returning the commands to execute.
    pub fn apply(&mut self, input: ClockInput, now: OffsetDateTime) -> Vec<ClockCommand> {
        match input {
            ClockInput::Poll(snapshot) => {
                self.poll(snapshot, now);
                Vec::new()
            }
            ClockInput::Tick => self.tick(),
            ClockInput::AdvanceResolved(resolution) => self.resolve(resolution),
        }
    }

    /// Reconcile with a fresh server snapshot.
    ///
    /// A different confirmed level (or a restarted one) resyncs the display
    /// and clears the advancement lock. While the display runs ahead, the
    /// countdown is re-estimated from the server's start time plus the
    /// durations of the levels in between.
    pub fn poll(&mut self, snapshot: ClockSnapshot, now: OffsetDateTime) {
        let index_changed = snapshot.current_level_index != self.snapshot.current_level_index;
        let restarted = snapshot.level_start_time != self.snapshot.level_start_time;

        self.skew = snapshot.server_time - now;
        self.snapshot = snapshot;

        if index_changed || restarted {
            debug!(
                server_level_index = self.snapshot.current_level_index,
                displayed_level_index = self.displayed_level_index,
                "clock resynced from server"
            );
            self.displayed_level_index = self.snapshot.current_level_index;
            self.has_requested_advance = false;
            self.pending_expiry_request = None;
            self.confirmed_expired = false;
            self.remaining_seconds = self.estimate_remaining(now);
        } else if self.displayed_level_index > self.snapshot.current_level_index {
            self.remaining_seconds = self.estimate_remaining(now);
        }
    }

    /// One second of countdown.
    ///
    /// The tick that finds the countdown already at zero handles the expiry:
    /// a privileged engine whose confirmed level ran out first requests the
    /// next level from the server, then every engine moves its display to the
    /// next level. With no next level the display holds at zero. Other ticks
    /// only re-send a request that failed earlier.
    pub fn tick(&mut self) -> Vec<ClockCommand> {
        if self.snapshot.status != SessionStatus::Active || self.displayed_level().is_none() {
            return Vec::new();
        }

        if self.remaining_seconds > 0 {
            self.remaining_seconds -= 1;
            return self.request_expired_advance().into_iter().collect();
        }

        self.expire()
    }

    fn expire(&mut self) -> Vec<ClockCommand> {
        let schedule = Arc::clone(&self.snapshot.schedule);
        if self.displayed_level_index == self.snapshot.current_level_index {
            self.confirmed_expired = true;
        }
        let commands: Vec<ClockCommand> = self.request_expired_advance().into_iter().collect();

        if let Some(next) = schedule
            .next_index(self.displayed_level_index)
            .and_then(|index| schedule.level_at(index))
        {
            self.displayed_level_index = next.index;
            self.remaining_seconds = next.duration_seconds();
        }

        commands
    }

    /// Ask the server for the level after the confirmed one, unless a
    /// request is already out or the confirmed level is still running.
    fn request_expired_advance(&mut self) -> Option<ClockCommand> {
        if !(self.privileged
            && self.auto_advance
            && self.confirmed_expired
            && !self.has_requested_advance)
        {
            return None;
        }

        let confirmed = self.snapshot.current_level_index;
        let target = self.snapshot.schedule.next_index(confirmed)?;
        self.has_requested_advance = true;
        let request = self.issue(target, AdvanceTrigger::Expiry);
        self.pending_expiry_request = Some(request.request_id);
        info!(
            from = confirmed,
            to = target,
            request_id = request.request_id,
            "level expired; requesting advancement"
        );
        Some(ClockCommand::Advance(request))
    }

    /// Handle the answer to an advancement request.
    ///
    /// Answers from an older generation are dropped. A failed expiry request
    /// releases the lock so the next tick retries, leaving the display where
    /// it is; a permanent failure (unauthorized, unknown session) turns
    /// automatic advancement off instead.
    pub fn resolve(&mut self, resolution: AdvanceResolution) -> Vec<ClockCommand> {
        if resolution.generation != self.generation {
            debug!(
                request_id = resolution.request_id,
                generation = resolution.generation,
                current_generation = self.generation,
                "discarding stale advancement response"
            );
            return Vec::new();
        }

        let from_expiry = self.pending_expiry_request == Some(resolution.request_id);
        match resolution.outcome {
            AdvanceOutcome::Confirmed { level_index } => {
                if from_expiry {
                    // lock stays set until a poll confirms the new level
                    self.pending_expiry_request = None;
                }
                debug!(request_id = resolution.request_id, level_index, "advancement confirmed");
                vec![ClockCommand::Refresh]
            }
            AdvanceOutcome::Failed { retryable, reason } => {
                if !from_expiry {
                    return Vec::new();
                }
                self.pending_expiry_request = None;
                self.has_requested_advance = false;

                if retryable {
                    warn!(request_id = resolution.request_id, %reason, "advancement failed; will retry");
                } else {
                    warn!(
                        request_id = resolution.request_id,
                        %reason,
                        "advancement refused; automatic advancement disabled"
                    );
                    self.auto_advance = false;
                }
                Vec::new()
            }
        }
    }

    /// Manual override to any level of the schedule, forward or backward.
    ///
    /// Not gated by the countdown and ignores the advancement lock.
    pub fn request_level(&mut self, target: usize) -> Result<AdvanceRequest, LevelRequestError> {
        if !self.privileged {
            return Err(LevelRequestError::NotPrivileged);
        }
        let schedule = &self.snapshot.schedule;
        if !schedule.contains(target) {
            return Err(LevelRequestError::OutOfRange {
                target,
                last: schedule.last_index(),
            });
        }
        Ok(self.issue(target, AdvanceTrigger::Manual))
    }

    /// Drop everything in flight; later answers to earlier requests are ignored.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.has_requested_advance = false;
        self.pending_expiry_request = None;
    }

    pub fn view(&self) -> ClockView {
        let server_level_index = self.snapshot.current_level_index;
        ClockView {
            displayed_level_index: self.displayed_level_index,
            displayed_level: self.displayed_level().cloned(),
            remaining_seconds: self.remaining_seconds,
            server_level_index,
            synced: self.displayed_level_index == server_level_index,
            status: self.snapshot.status,
            registration_closed: self.snapshot.registration_closed,
            advance_requested: self.has_requested_advance,
            show_payouts: self.snapshot.show_payouts,
        }
    }

    pub fn displayed_level_index(&self) -> usize {
        self.displayed_level_index
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn server_level_index(&self) -> usize {
        self.snapshot.current_level_index
    }

    pub fn has_requested_advance(&self) -> bool {
        self.has_requested_advance
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn schedule(&self) -> &LevelSchedule {
        &self.snapshot.schedule
    }

    fn displayed_level(&self) -> Option<&Level> {
        self.snapshot.schedule.level_at(self.displayed_level_index)
    }

    fn issue(&mut self, target: usize, trigger: AdvanceTrigger) -> AdvanceRequest {
        self.next_request_id += 1;
        AdvanceRequest {
            generation: self.generation,
            request_id: self.next_request_id,
            target,
            trigger,
        }
    }

    /// Remaining seconds of the displayed level at `now`.
    ///
    /// When the display runs ahead, its start is the server's start plus the
    /// durations of the levels in between; without a usable start the level
    /// starts full.
    fn estimate_remaining(&self, now: OffsetDateTime) -> u64 {
        let Some(level) = self.displayed_level() else {
            return 0;
        };
        let confirmed = self.snapshot.current_level_index;

        let started_at = self.snapshot.level_start_time.and_then(|start| {
            if self.displayed_level_index == confirmed {
                return Some(start);
            }
            self.snapshot
                .schedule
                .span_seconds(confirmed, self.displayed_level_index)
                .and_then(|span| i64::try_from(span).ok())
                .map(|span| start + Duration::seconds(span))
        });

        match started_at {
            Some(started_at) => {
                remaining_seconds(started_at, level.duration_seconds(), now + self.skew)
            }
            None => level.duration_seconds(),
        }
    }
}
