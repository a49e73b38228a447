use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    routing::{get, post},
};

use crate::{
    dto::ifttt::{
        ActionResponse, IftttErrorBody, RunEffectRequest, TestSetupResponse, TriggerPollRequest,
        TriggerPollResponse, UserInfoResponse,
    },
    error::IftttError,
    routes::extract::IftttJson,
    services::ifttt_service,
    state::SharedState,
};

const SERVICE_KEY_HEADER: &str = "ifttt-service-key";

/// IFTTT service protocol endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/ifttt/v1/status", get(status).post(status))
        .route("/ifttt/v1/test/setup", post(test_setup))
        .route("/ifttt/v1/user/info", get(user_info))
        .route("/ifttt/v1/actions/run_effect", post(run_effect))
        .route("/ifttt/v1/triggers/effect_requested", post(effect_requested))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

#[utoipa::path(
    get,
    path = "/ifttt/v1/status",
    tag = "ifttt",
    params(("IFTTT-Service-Key" = String, Header, description = "Service key issued by IFTTT")),
    responses(
        (status = 200, description = "Service is available"),
        (status = 401, description = "Missing or wrong service key", body = IftttErrorBody)
    )
)]
/// Availability check authenticated by the service key.
pub async fn status(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<StatusCode, IftttError> {
    ifttt_service::verify_service_key(&state, header(&headers, SERVICE_KEY_HEADER))?;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/ifttt/v1/test/setup",
    tag = "ifttt",
    params(("IFTTT-Service-Key" = String, Header, description = "Service key issued by IFTTT")),
    responses(
        (status = 200, description = "Test token and samples", body = TestSetupResponse),
        (status = 401, description = "Missing or wrong service key", body = IftttErrorBody)
    )
)]
/// Issue a test access token and sample fields for IFTTT's endpoint tests.
pub async fn test_setup(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<TestSetupResponse>, IftttError> {
    let response = ifttt_service::test_setup(&state, header(&headers, SERVICE_KEY_HEADER))?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/ifttt/v1/user/info",
    tag = "ifttt",
    responses(
        (status = 200, description = "User behind the bearer token", body = UserInfoResponse),
        (status = 401, description = "Invalid access token", body = IftttErrorBody)
    )
)]
/// User behind the IFTTT bearer token.
pub async fn user_info(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<UserInfoResponse>, IftttError> {
    let response = ifttt_service::user_info(&state, header(&headers, AUTHORIZATION.as_str()))?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/ifttt/v1/actions/run_effect",
    tag = "ifttt",
    request_body = RunEffectRequest,
    responses(
        (status = 200, description = "Effect dispatched", body = ActionResponse),
        (status = 400, description = "Unknown effect, skipped", body = IftttErrorBody),
        (status = 401, description = "Invalid access token", body = IftttErrorBody)
    )
)]
/// Run the `run_effect` action.
pub async fn run_effect(
    State(state): State<SharedState>,
    headers: HeaderMap,
    IftttJson(request): IftttJson<RunEffectRequest>,
) -> Result<Json<ActionResponse>, IftttError> {
    let response =
        ifttt_service::run_effect(&state, header(&headers, AUTHORIZATION.as_str()), request)
            .await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/ifttt/v1/triggers/effect_requested",
    tag = "ifttt",
    request_body = TriggerPollRequest,
    responses(
        (status = 200, description = "Most recent effect requests, newest first", body = TriggerPollResponse),
        (status = 401, description = "Invalid access token", body = IftttErrorBody)
    )
)]
/// Poll the `effect_requested` trigger.
pub async fn effect_requested(
    State(state): State<SharedState>,
    headers: HeaderMap,
    IftttJson(request): IftttJson<TriggerPollRequest>,
) -> Result<Json<TriggerPollResponse>, IftttError> {
    let response =
        ifttt_service::effect_requested(&state, header(&headers, AUTHORIZATION.as_str()), request)
            .await?;
    Ok(Json(response))
}
