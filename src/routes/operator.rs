use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::{
    services::access::{OPERATOR_TOKEN_HEADER, OperatorAccess},
    state::SharedState,
};

/// Resolve the `X-Operator-Token` header into an [`OperatorAccess`] request extension.
///
/// Never rejects: a missing or wrong token yields a regular viewer, and the
/// services refuse privileged operations for it.
pub async fn resolve_operator(
    State(state): State<SharedState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let presented = req
        .headers()
        .get(OPERATOR_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());
    let access = OperatorAccess::resolve(state.config().operator_token(), presented);

    req.extensions_mut().insert(access);
    next.run(req).await
}
