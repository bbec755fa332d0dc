use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the blind clock service.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::clock::get_clock,
        crate::routes::clock::advance_level,
        crate::routes::payouts::get_payouts,
        crate::routes::admin::list_sessions,
        crate::routes::admin::create_session,
        crate::routes::admin::start_session,
        crate::routes::admin::finish_session,
        crate::routes::admin::update_registration,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::clock::LevelDto,
            crate::dto::clock::ClockSnapshotResponse,
            crate::dto::clock::AdvanceLevelRequest,
            crate::dto::clock::AdvanceLevelResponse,
            crate::dto::payouts::PayoutsResponse,
            crate::dto::admin::CreateSessionRequest,
            crate::dto::admin::FinishSessionRequest,
            crate::dto::admin::RegistrationUpdateRequest,
            crate::dto::admin::SessionSummary,
            crate::dto::sse::LevelChangedEvent,
            crate::dto::sse::SessionStatusEvent,
            crate::dto::sse::SystemStatus,
            crate::state::schedule::SpecialAction,
            crate::state::session::SessionStatus,
            crate::error::ErrorBody,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "clock", description = "Clock snapshot and level advancement"),
        (name = "payouts", description = "Payout visibility"),
        (name = "admin", description = "Operator session management"),
    )
)]
pub struct ApiDoc;
