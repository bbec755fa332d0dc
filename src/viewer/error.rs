use thiserror::Error;

use crate::state::schedule::ScheduleError;

/// Failures of the viewer's HTTP client.
///
/// Permission problems, unknown sessions and rejected indices stay distinct
/// so they can be reported differently.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The operator token is missing or wrong.
    #[error("not authorized: {0}")]
    Unauthorized(String),
    /// The session does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Any other non-success answer, e.g. an out-of-range index.
    #[error("request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    /// The response body could not be decoded.
    #[error("failed to decode response from {url}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The snapshot carries a schedule that does not validate.
    #[error("server sent an invalid schedule: {0}")]
    InvalidSnapshot(#[from] ScheduleError),
}

impl ApiError {
    /// Whether repeating the same request may succeed later.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ApiError::Unauthorized(_) | ApiError::NotFound(_))
    }
}

/// Rejections of a manual level request detected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LevelRequestError {
    /// Only operators may change the level.
    #[error("only operators may change the level")]
    NotPrivileged,
    /// The target does not exist in the schedule.
    #[error("level index {target} is out of range; valid indices are 0..={last}")]
    OutOfRange { target: usize, last: usize },
}

/// Failures of the viewer runtime.
#[derive(Debug, Error)]
pub enum ViewerError {
    /// The first snapshot could not be fetched.
    #[error("initial clock fetch failed")]
    InitialFetch(#[source] ApiError),
    /// The viewer has been shut down.
    #[error("viewer has been shut down")]
    ShutDown,
    /// A manual level request was refused locally.
    #[error(transparent)]
    Rejected(#[from] LevelRequestError),
    /// A manual level request failed on the server.
    #[error("level request failed")]
    Api(#[source] ApiError),
}
