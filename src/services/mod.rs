/// Operator capability resolution.
pub mod access;
/// Clock snapshot reads and level advancement writes.
pub mod clock_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Payout visibility and tiers.
pub mod payout_service;
/// Session lifecycle management.
pub mod session_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Storage connection supervision and degraded mode handling.
pub mod storage_supervisor;
