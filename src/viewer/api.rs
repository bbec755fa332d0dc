//! HTTP access to the clock endpoints.

use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    dto::clock::{
        AdvanceLevelRequest, AdvanceLevelResponse, ClockSnapshotResponse, schedule_from_dtos,
    },
    services::access::OPERATOR_TOKEN_HEADER,
    state::{schedule::LevelSchedule, session::SessionStatus},
    viewer::error::ApiError,
};

/// Server clock state as seen by a viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct ClockSnapshot {
    pub schedule: Arc<LevelSchedule>,
    pub current_level_index: usize,
    pub level_start_time: Option<OffsetDateTime>,
    pub status: SessionStatus,
    pub registration_closed: bool,
    /// Payout visibility decided by the server on `current_level_index`.
    pub show_payouts: bool,
    /// Server clock when the snapshot was produced.
    pub server_time: OffsetDateTime,
}

impl TryFrom<ClockSnapshotResponse> for ClockSnapshot {
    type Error = ApiError;

    fn try_from(value: ClockSnapshotResponse) -> Result<Self, Self::Error> {
        Ok(Self {
            schedule: Arc::new(schedule_from_dtos(value.levels)?),
            current_level_index: value.current_level_index,
            level_start_time: value.level_start_time,
            status: value.session_status,
            registration_closed: value.registration_closed,
            show_payouts: value.show_payouts,
            server_time: value.server_time,
        })
    }
}

/// Read and write access to one clock server.
pub trait ClockApi: Send + Sync {
    /// Fetch the schedule and clock state of a session. Side-effect free.
    fn fetch_clock(&self, session_id: Uuid) -> BoxFuture<'static, Result<ClockSnapshot, ApiError>>;

    /// Ask the server to make `level_index` the current level.
    fn advance_level(
        &self,
        session_id: Uuid,
        level_index: usize,
    ) -> BoxFuture<'static, Result<AdvanceLevelResponse, ApiError>>;
}

/// [`ClockApi`] over the server's REST endpoints.
#[derive(Clone)]
pub struct HttpClockApi {
    client: Client,
    base_url: Arc<str>,
    operator_token: Option<Arc<str>>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl HttpClockApi {
    /// Client for the server at `base_url`, sending `operator_token` on writes.
    pub fn new(base_url: &str, operator_token: Option<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .build()
            .map_err(|source| ApiError::Transport {
                url: base_url.to_string(),
                source,
            })?;
        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            operator_token: operator_token.map(Arc::from),
        })
    }

    fn url(&self, session_id: Uuid, leaf: &str) -> String {
        format!("{}/sessions/{session_id}/{leaf}", self.base_url)
    }
}

/// Turn a non-success response into the matching [`ApiError`].
async fn error_for_status(response: Response) -> ApiError {
    let status = response.status();
    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.message,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string(),
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized(message),
        StatusCode::NOT_FOUND => ApiError::NotFound(message),
        other => ApiError::Rejected {
            status: other.as_u16(),
            message,
        },
    }
}

impl ClockApi for HttpClockApi {
    fn fetch_clock(&self, session_id: Uuid) -> BoxFuture<'static, Result<ClockSnapshot, ApiError>> {
        let api = self.clone();
        Box::pin(async move {
            let url = api.url(session_id, "clock");
            let response = api
                .client
                .get(&url)
                .send()
                .await
                .map_err(|source| ApiError::Transport {
                    url: url.clone(),
                    source,
                })?;

            if !response.status().is_success() {
                return Err(error_for_status(response).await);
            }

            let body = response
                .json::<ClockSnapshotResponse>()
                .await
                .map_err(|source| ApiError::Decode { url, source })?;
            ClockSnapshot::try_from(body)
        })
    }

    fn advance_level(
        &self,
        session_id: Uuid,
        level_index: usize,
    ) -> BoxFuture<'static, Result<AdvanceLevelResponse, ApiError>> {
        let api = self.clone();
        Box::pin(async move {
            let url = api.url(session_id, "level");
            let mut request = api
                .client
                .put(&url)
                .json(&AdvanceLevelRequest { level_index });
            if let Some(token) = api.operator_token.as_deref() {
                request = request.header(OPERATOR_TOKEN_HEADER, token);
            }

            let response = request.send().await.map_err(|source| ApiError::Transport {
                url: url.clone(),
                source,
            })?;

            if !response.status().is_success() {
                return Err(error_for_status(response).await);
            }

            response
                .json::<AdvanceLevelResponse>()
                .await
                .map_err(|source| ApiError::Decode { url, source })
        })
    }
}
