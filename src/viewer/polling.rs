//! Periodic snapshot fetching that keeps the last good state on failure.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::viewer::{
    api::{ClockApi, ClockSnapshot},
    error::ApiError,
};

/// Default cadence of background polls.
pub const DEFAULT_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(10);

/// Fetches snapshots of one session and remembers the latest good one.
pub struct PollingClient {
    api: Arc<dyn ClockApi>,
    session_id: Uuid,
    latest: Option<ClockSnapshot>,
    consecutive_failures: u32,
}

impl PollingClient {
    pub fn new(api: Arc<dyn ClockApi>, session_id: Uuid) -> Self {
        Self {
            api,
            session_id,
            latest: None,
            consecutive_failures: 0,
        }
    }

    /// First fetch; its failure is the caller's problem.
    pub async fn initial_fetch(&mut self) -> Result<ClockSnapshot, ApiError> {
        let snapshot = self.api.fetch_clock(self.session_id).await?;
        self.latest = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Refresh the snapshot.
    ///
    /// Returns the fresh snapshot, or `None` when the fetch failed; a failure
    /// is logged and leaves [`Self::latest`] untouched.
    pub async fn poll(&mut self) -> Option<&ClockSnapshot> {
        match self.api.fetch_clock(self.session_id).await {
            Ok(snapshot) => {
                if self.consecutive_failures > 0 {
                    debug!(
                        session_id = %self.session_id,
                        failures = self.consecutive_failures,
                        "clock poll recovered"
                    );
                }
                self.consecutive_failures = 0;
                self.latest = Some(snapshot);
                self.latest.as_ref()
            }
            Err(err) => {
                self.consecutive_failures += 1;
                warn!(
                    session_id = %self.session_id,
                    failures = self.consecutive_failures,
                    error = %err,
                    "clock poll failed; keeping last known state"
                );
                None
            }
        }
    }

    /// Latest good snapshot.
    pub fn latest(&self) -> Option<&ClockSnapshot> {
        self.latest.as_ref()
    }

    /// Authoritative index of the latest good snapshot.
    pub fn server_level_index(&self) -> Option<usize> {
        self.latest.as_ref().map(|snapshot| snapshot.current_level_index)
    }
}
