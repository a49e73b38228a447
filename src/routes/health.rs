use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::health::{DebugHealthResponse, HealthResponse},
    services::{health_service, token_manager::TokenSummary},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/healthcheck",
    tag = "health",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
/// Return the current health status of the backend.
pub async fn healthcheck(State(state): State<SharedState>) -> Json<HealthResponse> {
    let status = health_service::health_status(&state).await;
    Json(status)
}

#[utoipa::path(
    get,
    path = "/debug/health",
    tag = "health",
    responses((status = 200, description = "Uptime and token bookkeeping", body = DebugHealthResponse))
)]
/// Uptime, subscribers and token counters.
pub async fn debug_health(State(state): State<SharedState>) -> Json<DebugHealthResponse> {
    Json(health_service::debug_health(&state).await)
}

#[utoipa::path(
    get,
    path = "/debug/tokens",
    tag = "health",
    responses((status = 200, description = "Event Gateway token counters", body = TokenSummary))
)]
/// Event Gateway token counters.
pub async fn debug_tokens(State(state): State<SharedState>) -> Json<TokenSummary> {
    Json(health_service::debug_tokens(&state).await)
}

/// Configure the health and debug routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/healthcheck", get(healthcheck))
        .route("/debug/health", get(debug_health))
        .route("/debug/tokens", get(debug_tokens))
}
