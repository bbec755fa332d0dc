use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::admin::{
        CreateSessionRequest, FinishSessionRequest, RegistrationUpdateRequest, SessionSummary,
    },
    error::{AppError, ErrorBody},
    services::{access::OperatorAccess, session_service},
    state::SharedState,
};

/// Operator-only session management endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/admin/sessions", get(list_sessions).post(create_session))
        .route("/admin/sessions/{id}/start", post(start_session))
        .route("/admin/sessions/{id}/finish", post(finish_session))
        .route("/admin/sessions/{id}/registration", put(update_registration))
}

/// List every session.
#[utoipa::path(
    get,
    path = "/admin/sessions",
    tag = "admin",
    params(("X-Operator-Token" = String, Header, description = "Operator token")),
    responses(
        (status = 200, description = "Known sessions", body = [SessionSummary]),
        (status = 401, description = "Caller is not an operator", body = ErrorBody)
    )
)]
pub async fn list_sessions(
    State(state): State<SharedState>,
    Extension(access): Extension<OperatorAccess>,
) -> Result<Json<Vec<SessionSummary>>, AppError> {
    Ok(Json(session_service::list_sessions(&state, access).await?))
}

/// Create a session that has not started yet.
#[utoipa::path(
    post,
    path = "/admin/sessions",
    tag = "admin",
    params(("X-Operator-Token" = String, Header, description = "Operator token")),
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created", body = SessionSummary),
        (status = 400, description = "Invalid name", body = ErrorBody),
        (status = 401, description = "Caller is not an operator", body = ErrorBody)
    )
)]
pub async fn create_session(
    State(state): State<SharedState>,
    Extension(access): Extension<OperatorAccess>,
    Valid(Json(payload)): Valid<Json<CreateSessionRequest>>,
) -> Result<(StatusCode, Json<SessionSummary>), AppError> {
    let summary = session_service::create_session(&state, access, payload).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// Start the clock of a session on its first play level.
#[utoipa::path(
    post,
    path = "/admin/sessions/{id}/start",
    tag = "admin",
    params(
        ("id" = Uuid, Path, description = "Session identifier"),
        ("X-Operator-Token" = String, Header, description = "Operator token")
    ),
    responses(
        (status = 200, description = "Session started", body = SessionSummary),
        (status = 401, description = "Caller is not an operator", body = ErrorBody),
        (status = 404, description = "Unknown session", body = ErrorBody),
        (status = 409, description = "Session already started", body = ErrorBody)
    )
)]
pub async fn start_session(
    State(state): State<SharedState>,
    Extension(access): Extension<OperatorAccess>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>, AppError> {
    Ok(Json(
        session_service::start_session(&state, access, id).await?,
    ))
}

/// Complete or cancel a session.
#[utoipa::path(
    post,
    path = "/admin/sessions/{id}/finish",
    tag = "admin",
    params(
        ("id" = Uuid, Path, description = "Session identifier"),
        ("X-Operator-Token" = String, Header, description = "Operator token")
    ),
    request_body = FinishSessionRequest,
    responses(
        (status = 200, description = "Session finished", body = SessionSummary),
        (status = 401, description = "Caller is not an operator", body = ErrorBody),
        (status = 404, description = "Unknown session", body = ErrorBody),
        (status = 409, description = "Status is not terminal or session already finished", body = ErrorBody)
    )
)]
pub async fn finish_session(
    State(state): State<SharedState>,
    Extension(access): Extension<OperatorAccess>,
    Path(id): Path<Uuid>,
    Json(payload): Json<FinishSessionRequest>,
) -> Result<Json<SessionSummary>, AppError> {
    Ok(Json(
        session_service::finish_session(&state, access, id, payload).await?,
    ))
}

/// Close or reopen late registration and record the entry count.
#[utoipa::path(
    put,
    path = "/admin/sessions/{id}/registration",
    tag = "admin",
    params(
        ("id" = Uuid, Path, description = "Session identifier"),
        ("X-Operator-Token" = String, Header, description = "Operator token")
    ),
    request_body = RegistrationUpdateRequest,
    responses(
        (status = 200, description = "Registration updated", body = SessionSummary),
        (status = 401, description = "Caller is not an operator", body = ErrorBody),
        (status = 404, description = "Unknown session", body = ErrorBody)
    )
)]
pub async fn update_registration(
    State(state): State<SharedState>,
    Extension(access): Extension<OperatorAccess>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<RegistrationUpdateRequest>>,
) -> Result<Json<SessionSummary>, AppError> {
    Ok(Json(
        session_service::update_registration(&state, access, id, payload).await?,
    ))
}
