use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};

use crate::{
    dto::trigger::{
        SensorStatesResponse, TriggerDirectRequest, TriggerDirectResponse, TriggerRequest,
        TriggerResponse,
    },
    error::AppError,
    routes::extract::ApiJson,
    services::effect_service,
    state::SharedState,
};

/// Endpoints driven by the browser cue player.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/trigger-direct", post(trigger_direct))
        .route("/api/trigger", post(trigger))
        .route("/api/sensor-states", get(sensor_states))
}

#[utoipa::path(
    post,
    path = "/api/trigger-direct",
    tag = "triggers",
    request_body = TriggerDirectRequest,
    responses(
        (status = 200, description = "Per-channel results; `success` is false when every channel failed", body = TriggerDirectResponse),
        (status = 400, description = "Unknown effect or malformed body")
    )
)]
/// Fire an effect on every configured channel.
pub async fn trigger_direct(
    State(state): State<SharedState>,
    ApiJson(request): ApiJson<TriggerDirectRequest>,
) -> Result<Json<TriggerDirectResponse>, AppError> {
    let response = effect_service::trigger_direct(&state, request).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/trigger",
    tag = "triggers",
    request_body = TriggerRequest,
    responses(
        (status = 200, description = "Maker Webhooks outcome", body = TriggerResponse),
        (status = 400, description = "Unknown effect or neither event nor effect given")
    )
)]
/// IFTTT-only fallback: forward a raw Maker event or fire an effect's Maker event.
pub async fn trigger(
    State(state): State<SharedState>,
    ApiJson(request): ApiJson<TriggerRequest>,
) -> Result<Json<TriggerResponse>, AppError> {
    let response = effect_service::trigger_fallback(&state, request).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/sensor-states",
    tag = "triggers",
    responses((status = 200, description = "Detection state of every sensor", body = SensorStatesResponse))
)]
/// Current detection state of every virtual contact sensor.
pub async fn sensor_states(State(state): State<SharedState>) -> Json<SensorStatesResponse> {
    Json(SensorStatesResponse {
        states: state.sensors().snapshot(),
    })
}
