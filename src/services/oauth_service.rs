//! Minimal authorization-code grant for the IFTTT service: one fixed user, auto-approved.

use reqwest::Url;
use tracing::{debug, info};

use crate::{
    dto::oauth::{AuthorizeParams, TokenRequest, TokenResponse},
    error::{OAuthError, ServiceError},
    state::{SharedState, oauth::TokenPair},
};

/// Approve the authorization request and return the redirect target carrying the code.
pub fn authorize(state: &SharedState, params: AuthorizeParams) -> Result<String, ServiceError> {
    if let Some(expected) = state.config().ifttt.client_id.as_deref() {
        if params.client_id != expected {
            return Err(ServiceError::Unauthorized("unknown client_id".into()));
        }
    }
    if let Some(response_type) = params.response_type.as_deref() {
        if response_type != "code" {
            return Err(ServiceError::InvalidInput(format!(
                "unsupported response_type `{response_type}`"
            )));
        }
    }
    let redirect_uri = params
        .redirect_uri
        .as_deref()
        .ok_or_else(|| ServiceError::InvalidInput("redirect_uri is required".into()))?;
    let mut target = Url::parse(redirect_uri)
        .map_err(|_| ServiceError::InvalidInput("redirect_uri is not a valid URL".into()))?;

    let code = state.oauth().issue_code(&params.client_id, Some(redirect_uri));
    {
        let mut query = target.query_pairs_mut();
        query.append_pair("code", &code);
        if let Some(csrf_state) = params.state.as_deref() {
            query.append_pair("state", csrf_state);
        }
    }
    info!(client_id = %params.client_id, "authorization code issued");
    Ok(target.into())
}

/// Token endpoint: `authorization_code` and `refresh_token` grants.
pub fn token(state: &SharedState, request: TokenRequest) -> Result<TokenResponse, OAuthError> {
    let client_id = verify_client(state, &request)?;

    let pair = match request.grant_type.as_str() {
        "authorization_code" => {
            let code = request
                .code
                .as_deref()
                .ok_or_else(|| OAuthError::InvalidRequest("code is required".into()))?;
            state
                .oauth()
                .redeem_code(code, &client_id, request.redirect_uri.as_deref())?
        }
        "refresh_token" => {
            let refresh_token = request
                .refresh_token
                .as_deref()
                .ok_or_else(|| OAuthError::InvalidRequest("refresh_token is required".into()))?;
            state.oauth().refresh(refresh_token)?
        }
        other => {
            debug!(grant_type = other, "unsupported grant type");
            return Err(OAuthError::UnsupportedGrantType);
        }
    };

    Ok(token_response(pair))
}

/// Check the client credentials against the configured IFTTT client, when one is configured.
fn verify_client(state: &SharedState, request: &TokenRequest) -> Result<String, OAuthError> {
    let config = &state.config().ifttt;
    let client_id = request.client_id.clone().unwrap_or_default();

    if let Some(expected) = config.client_id.as_deref() {
        if client_id != expected {
            return Err(OAuthError::InvalidClient);
        }
    }
    if let Some(expected) = config.client_secret.as_deref() {
        if request.client_secret.as_deref() != Some(expected) {
            return Err(OAuthError::InvalidClient);
        }
    }
    Ok(client_id)
}

fn token_response(pair: TokenPair) -> TokenResponse {
    TokenResponse {
        token_type: "Bearer".into(),
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        expires_in: pair.expires_in.as_secs(),
    }
}
