use serde::Serialize;
use utoipa::ToSchema;

use crate::services::token_manager::TokenSummary;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
}

impl HealthResponse {
    /// Every integration path is usable.
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }

    /// Tokens are held in memory only because the configured store failed.
    pub fn degraded() -> Self {
        Self {
            status: "degraded".to_string(),
        }
    }
}

/// Detailed status served by `/debug/health`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DebugHealthResponse {
    /// `ok` or `degraded`.
    pub status: String,
    /// Seconds since startup.
    pub uptime_secs: u64,
    /// Browser sessions with discovered lights.
    pub light_sessions: usize,
    /// Open `/sse/sensors` streams.
    pub sensor_subscribers: usize,
    /// Token bookkeeping counters.
    #[serde(flatten)]
    pub tokens: TokenSummary,
}
