use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;

/// Payout visibility for a session, evaluated on the server-confirmed level.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PayoutsResponse {
    pub session_id: Uuid,
    pub show_payouts: bool,
    /// Level index the decision was taken on.
    pub current_level_index: usize,
    pub entries: u32,
    /// Prize pool percentages, first place first. Omitted while payouts are hidden.
    pub tiers: Option<Vec<f64>>,
}
