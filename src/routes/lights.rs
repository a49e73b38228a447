use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::put,
};
use axum_valid::Valid;

use crate::{
    dto::lights::{LightsResponse, RegisterLightsRequest},
    error::AppError,
    services::lights_service,
    state::SharedState,
};

/// Per-session registry of discovered lights.
pub fn router() -> Router<SharedState> {
    Router::new().route(
        "/api/lights/{session_id}",
        put(register_lights).get(session_lights).delete(end_session),
    )
}

#[utoipa::path(
    put,
    path = "/api/lights/{session_id}",
    tag = "lights",
    params(("session_id" = String, Path, description = "Browser session that ran the discovery")),
    request_body = RegisterLightsRequest,
    responses(
        (status = 200, description = "Lights stored for the session", body = LightsResponse),
        (status = 400, description = "Invalid light address or name")
    )
)]
/// Store the lights a discovery scan found for this session.
pub async fn register_lights(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
    Valid(Json(request)): Valid<Json<RegisterLightsRequest>>,
) -> Json<LightsResponse> {
    Json(lights_service::register_lights(&state, &session_id, request))
}

#[utoipa::path(
    get,
    path = "/api/lights/{session_id}",
    tag = "lights",
    params(("session_id" = String, Path, description = "Browser session that ran the discovery")),
    responses((status = 200, description = "Lights known for the session", body = LightsResponse))
)]
/// Lights known for a session.
pub async fn session_lights(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Json<LightsResponse> {
    Json(lights_service::session_lights(&state, &session_id))
}

#[utoipa::path(
    delete,
    path = "/api/lights/{session_id}",
    tag = "lights",
    params(("session_id" = String, Path, description = "Browser session that ran the discovery")),
    responses(
        (status = 204, description = "Session lights discarded"),
        (status = 404, description = "No lights registered for the session")
    )
)]
/// Discard the session's lights.
pub async fn end_session(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, AppError> {
    lights_service::end_session(&state, &session_id)?;
    Ok(StatusCode::NO_CONTENT)
}
