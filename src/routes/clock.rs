use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::clock::{AdvanceLevelRequest, AdvanceLevelResponse, ClockSnapshotResponse},
    error::{AppError, ErrorBody},
    services::{access::OperatorAccess, clock_service},
    state::SharedState,
};

/// Clock snapshot and level advancement endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/sessions/{id}/clock", get(get_clock))
        .route(
            "/sessions/{id}/level",
            axum::routing::put(advance_level).post(advance_level),
        )
}

/// Return the schedule together with the authoritative clock state of a session.
#[utoipa::path(
    get,
    path = "/sessions/{id}/clock",
    tag = "clock",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Clock snapshot", body = ClockSnapshotResponse),
        (status = 404, description = "Unknown session", body = ErrorBody),
        (status = 503, description = "Storage unavailable", body = ErrorBody)
    )
)]
pub async fn get_clock(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ClockSnapshotResponse>, AppError> {
    Ok(Json(clock_service::clock_snapshot(&state, id).await?))
}

/// Set the current level of a session and restart its timer.
#[utoipa::path(
    put,
    path = "/sessions/{id}/level",
    tag = "clock",
    params(
        ("id" = Uuid, Path, description = "Session identifier"),
        ("X-Operator-Token" = String, Header, description = "Operator token")
    ),
    request_body = AdvanceLevelRequest,
    responses(
        (status = 200, description = "Level changed", body = AdvanceLevelResponse),
        (status = 400, description = "Level index out of range", body = ErrorBody),
        (status = 401, description = "Caller is not an operator", body = ErrorBody),
        (status = 404, description = "Unknown session", body = ErrorBody),
        (status = 409, description = "Session clock is not running", body = ErrorBody)
    )
)]
pub async fn advance_level(
    State(state): State<SharedState>,
    Extension(access): Extension<OperatorAccess>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdvanceLevelRequest>,
) -> Result<Json<AdvanceLevelResponse>, AppError> {
    Ok(Json(
        clock_service::advance_level(&state, access, id, payload.level_index).await?,
    ))
}
