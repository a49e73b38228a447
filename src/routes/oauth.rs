use axum::{
    Form, Json, Router,
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
};

use crate::{
    dto::oauth::{AuthorizeParams, OAuthErrorBody, TokenRequest, TokenResponse},
    error::{AppError, OAuthError},
    routes::extract::OAuthForm,
    services::oauth_service,
    state::SharedState,
};

/// OAuth endpoints used by IFTTT to link the demo account.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/oauth/authorize", get(authorize).post(authorize_form))
        .route("/oauth/token", post(token))
}

#[utoipa::path(
    get,
    path = "/oauth/authorize",
    tag = "oauth",
    params(AuthorizeParams),
    responses(
        (status = 303, description = "Redirect back to the client with a one-time code"),
        (status = 400, description = "Malformed authorization request"),
        (status = 401, description = "Unknown client")
    )
)]
/// Auto-approve the authorization request for the single demo user.
pub async fn authorize(
    State(state): State<SharedState>,
    Query(params): Query<AuthorizeParams>,
) -> Result<Redirect, AppError> {
    let target = oauth_service::authorize(&state, params)?;
    Ok(Redirect::to(&target))
}

/// Form-posted variant of [`authorize`].
pub async fn authorize_form(
    State(state): State<SharedState>,
    Form(params): Form<AuthorizeParams>,
) -> Result<Redirect, AppError> {
    let target = oauth_service::authorize(&state, params)?;
    Ok(Redirect::to(&target))
}

#[utoipa::path(
    post,
    path = "/oauth/token",
    tag = "oauth",
    request_body(content = TokenRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Issued tokens", body = TokenResponse),
        (status = 400, description = "invalid_grant, invalid_request or unsupported_grant_type", body = OAuthErrorBody),
        (status = 401, description = "invalid_client", body = OAuthErrorBody)
    )
)]
/// Exchange an authorization code or refresh token.
pub async fn token(
    State(state): State<SharedState>,
    OAuthForm(request): OAuthForm<TokenRequest>,
) -> Result<Json<TokenResponse>, OAuthError> {
    Ok(Json(oauth_service::token(&state, request)?))
}
