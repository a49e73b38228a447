use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, header::AUTHORIZATION},
    routing::post,
};

use crate::{
    dto::alexa::{AlexaErrorBody, AlexaRequest, AlexaResponse},
    error::AlexaError,
    routes::extract::DirectiveJson,
    services::alexa_service,
    state::SharedState,
};

/// Alexa Smart Home skill endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/alexa/smarthome", post(smarthome))
        .route("/api/alexa/handle-grant", post(handle_grant))
}

#[utoipa::path(
    post,
    path = "/alexa/smarthome",
    tag = "alexa",
    request_body = AlexaRequest,
    responses(
        (status = 200, description = "Directive handled", body = AlexaResponse),
        (status = 400, description = "Unsupported or malformed directive", body = AlexaErrorBody),
        (status = 401, description = "Invalid bearer token", body = AlexaErrorBody),
        (status = 500, description = "AcceptGrant token exchange failed")
    )
)]
/// Handle Discovery, ReportState and AcceptGrant directives.
pub async fn smarthome(
    State(state): State<SharedState>,
    headers: HeaderMap,
    DirectiveJson(request): DirectiveJson<AlexaRequest>,
) -> Result<Json<AlexaResponse>, AlexaError> {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let response = alexa_service::handle_directive(&state, request, authorization).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/alexa/handle-grant",
    tag = "alexa",
    request_body = AlexaRequest,
    responses(
        (status = 200, description = "Grant accepted and tokens stored", body = AlexaResponse),
        (status = 400, description = "Malformed directive", body = AlexaErrorBody),
        (status = 500, description = "Token exchange failed")
    )
)]
/// Exchange an AcceptGrant code forwarded by the skill's Lambda.
pub async fn handle_grant(
    State(state): State<SharedState>,
    DirectiveJson(request): DirectiveJson<AlexaRequest>,
) -> Result<Json<AlexaResponse>, AlexaError> {
    let response = alexa_service::accept_grant(&state, request.directive).await?;
    Ok(Json(response))
}
