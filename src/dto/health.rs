use serde::Serialize;
use utoipa::ToSchema;

/// Body of `/healthcheck`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: &'static str,
    /// Levels in the loaded schedule.
    pub schedule_levels: usize,
}

impl HealthResponse {
    const DEGRADED: &'static str = "degraded";

    pub fn ok(schedule_levels: usize) -> Self {
        Self {
            status: "ok",
            schedule_levels,
        }
    }

    pub fn degraded(schedule_levels: usize) -> Self {
        Self {
            status: Self::DEGRADED,
            schedule_levels,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.status == Self::DEGRADED
    }
}
