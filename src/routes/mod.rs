use axum::{Router, middleware};

use crate::state::SharedState;

pub mod admin;
pub mod clock;
pub mod docs;
pub mod health;
mod operator;
pub mod payouts;
pub mod sse;

/// Compose all route trees, wiring in shared state, operator resolution and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(clock::router())
        .merge(payouts::router())
        .merge(admin::router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            operator::resolve_operator,
        ));

    api_router.merge(docs::router()).with_state(state)
}
