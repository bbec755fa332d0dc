use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::payouts::PayoutsResponse,
    error::{AppError, ErrorBody},
    services::{access::OperatorAccess, payout_service},
    state::SharedState,
};

/// Payout visibility endpoint.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sessions/{id}/payouts", get(get_payouts))
}

/// Whether payouts are visible at the confirmed level, with tiers when allowed.
#[utoipa::path(
    get,
    path = "/sessions/{id}/payouts",
    tag = "payouts",
    params(
        ("id" = Uuid, Path, description = "Session identifier"),
        ("X-Operator-Token" = Option<String>, Header, description = "Operator token; operators always receive tiers")
    ),
    responses(
        (status = 200, description = "Payout visibility", body = PayoutsResponse),
        (status = 404, description = "Unknown session", body = ErrorBody)
    )
)]
pub async fn get_payouts(
    State(state): State<SharedState>,
    Extension(access): Extension<OperatorAccess>,
    Path(id): Path<Uuid>,
) -> Result<Json<PayoutsResponse>, AppError> {
    Ok(Json(payout_service::payouts(&state, access, id).await?))
}
