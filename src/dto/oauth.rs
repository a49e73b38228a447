use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::{IntoParams, ToSchema};

/// Query (or form) parameters of the authorization request.
#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuthorizeParams {
    /// Must match the configured IFTTT client id.
    pub client_id: String,
    /// Where the code is sent back.
    #[serde(default)]
    pub redirect_uri: Option<String>,
    /// Opaque value echoed on the redirect.
    #[serde(default)]
    pub state: Option<String>,
    /// Only `code` is supported.
    #[serde(default)]
    pub response_type: Option<String>,
    /// Ignored.
    #[serde(default)]
    pub scope: Option<String>,
}

/// Form body of `POST /oauth/token`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenRequest {
    /// `authorization_code` or `refresh_token`.
    pub grant_type: String,
    /// Code from the authorization redirect.
    #[serde(default)]
    pub code: Option<String>,
    /// Refresh token from an earlier exchange.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Client id, unless sent through HTTP Basic.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Client secret, unless sent through HTTP Basic.
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Must match the authorization request.
    #[serde(default)]
    pub redirect_uri: Option<String>,
}

/// Successful token endpoint response.
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    /// Always `Bearer`.
    pub token_type: String,
    /// Token for the IFTTT service endpoints.
    pub access_token: String,
    /// Token for the next refresh.
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// RFC 6749 error body.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct OAuthErrorBody {
    /// RFC 6749 error code.
    pub error: String,
    /// Human-readable detail.
    pub error_description: Option<String>,
}
