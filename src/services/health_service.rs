use tracing::warn;

use crate::{
    dto::health::{DebugHealthResponse, HealthResponse},
    services::token_manager::{TokenStoreStatus, TokenSummary},
    state::SharedState,
};

/// Report `degraded` once the durable token store has been given up on.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.tokens().store_status().await {
        TokenStoreStatus::Disabled => {
            warn!("token store disabled (memory-only mode)");
            HealthResponse::degraded()
        }
        TokenStoreStatus::MemoryOnly | TokenStoreStatus::Persistent => HealthResponse::ok(),
    }
}

/// Detailed health for `/debug/health`.
pub async fn debug_health(state: &SharedState) -> DebugHealthResponse {
    let status = health_status(state).await.status;
    DebugHealthResponse {
        status,
        uptime_secs: state.uptime().as_secs(),
        light_sessions: state.lights().session_count(),
        sensor_subscribers: state.sensors().events().subscriber_count(),
        tokens: state.tokens().summary().await,
    }
}

/// Token counters for `/debug/tokens`.
pub async fn debug_tokens(state: &SharedState) -> TokenSummary {
    state.tokens().summary().await
}
