use axum::{
    Json,
    extract::rejection::{FormRejection, JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    clients::error::ClientError,
    dto::{
        alexa::{AlexaErrorBody, EventHeader},
        ifttt::{IftttErrorBody, IftttErrorMessage},
        oauth::OAuthErrorBody,
    },
    state::{effect::UnknownEffect, oauth::GrantError},
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing or rejected credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Directive or grant type this server does not implement.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// A required integration is not configured.
    #[error("not configured: {0}")]
    NotConfigured(String),
    /// An upstream service (Amazon, IFTTT, light bridge) failed.
    #[error("upstream failure")]
    Upstream(#[source] ClientError),
    /// Operation exceeded its timeout limit.
    #[error("operation timed out")]
    Timeout,
}

impl From<ClientError> for ServiceError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Timeout { .. } => ServiceError::Timeout,
            ClientError::Unauthorized { target } => {
                ServiceError::Unauthorized(format!("{target} rejected the credentials"))
            }
            ClientError::NotConfigured { setting } => {
                ServiceError::NotConfigured(format!("{setting} is not set"))
            }
            other => ServiceError::Upstream(other),
        }
    }
}

impl From<UnknownEffect> for ServiceError {
    fn from(err: UnknownEffect) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// An upstream dependency answered with an error.
    #[error("bad gateway: {0}")]
    BadGateway(String),
    /// Service unavailable or not configured.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::UnsupportedOperation(message) => AppError::BadRequest(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::NotConfigured(message) => AppError::ServiceUnavailable(message),
            ServiceError::Upstream(source) => AppError::BadGateway(source.to_string()),
            ServiceError::Timeout => AppError::BadGateway("upstream timed out".into()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

/// Errors returned on the IFTTT service surface, rendered as `{"errors": [...]}`.
#[derive(Debug, Error)]
pub enum IftttError {
    /// Missing or wrong service key or bearer token.
    #[error("{0}")]
    Unauthorized(String),
    /// Request body IFTTT sent could not be decoded.
    #[error("{0}")]
    BadRequest(String),
    /// Action input IFTTT should not retry.
    #[error("{0}")]
    Skip(String),
    /// Unexpected failure.
    #[error("{0}")]
    Internal(String),
}

impl From<ServiceError> for IftttError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unauthorized(message) => IftttError::Unauthorized(message),
            ServiceError::InvalidInput(message) => IftttError::Skip(message),
            other => IftttError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for IftttError {
    fn from(rejection: JsonRejection) -> Self {
        IftttError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for IftttError {
    fn into_response(self) -> axum::response::Response {
        let (status, skip) = match &self {
            IftttError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, false),
            IftttError::BadRequest(_) => (StatusCode::BAD_REQUEST, false),
            IftttError::Skip(_) => (StatusCode::BAD_REQUEST, true),
            IftttError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, false),
        };

        let body = IftttErrorBody {
            errors: vec![IftttErrorMessage {
                status: skip.then(|| "SKIP".to_string()),
                message: self.to_string(),
            }],
        };
        (status, Json(body)).into_response()
    }
}

/// RFC 6749 token endpoint errors.
#[derive(Debug, Error)]
pub enum OAuthError {
    /// Malformed token request.
    #[error("invalid_request: {0}")]
    InvalidRequest(String),
    /// Wrong client credentials.
    #[error("invalid_client")]
    InvalidClient,
    /// Code or refresh token cannot be redeemed.
    #[error("invalid_grant: {0}")]
    InvalidGrant(String),
    /// Grant type other than `authorization_code` or `refresh_token`.
    #[error("unsupported_grant_type")]
    UnsupportedGrantType,
}

impl OAuthError {
    fn code(&self) -> &'static str {
        match self {
            OAuthError::InvalidRequest(_) => "invalid_request",
            OAuthError::InvalidClient => "invalid_client",
            OAuthError::InvalidGrant(_) => "invalid_grant",
            OAuthError::UnsupportedGrantType => "unsupported_grant_type",
        }
    }
}

impl From<FormRejection> for OAuthError {
    fn from(rejection: FormRejection) -> Self {
        OAuthError::InvalidRequest(rejection.body_text())
    }
}

impl From<GrantError> for OAuthError {
    fn from(err: GrantError) -> Self {
        OAuthError::InvalidGrant(err.to_string())
    }
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            OAuthError::InvalidClient => StatusCode::UNAUTHORIZED,
            _ => StatusCode::BAD_REQUEST,
        };
        let description = match &self {
            OAuthError::InvalidRequest(detail) | OAuthError::InvalidGrant(detail) => {
                Some(detail.clone())
            }
            _ => None,
        };
        let body = OAuthErrorBody {
            error: self.code().to_string(),
            error_description: description,
        };
        (status, Json(body)).into_response()
    }
}

/// Failures on the Alexa Smart Home surface.
#[derive(Debug, Error)]
pub enum AlexaError {
    /// Directive the skill does not implement.
    #[error("unsupported directive {namespace}.{name}")]
    UnsupportedOperation {
        /// Directive namespace.
        namespace: String,
        /// Directive name.
        name: String,
    },
    /// Directive missing required fields.
    #[error("invalid directive: {0}")]
    InvalidDirective(String),
    /// Bearer token rejected by Amazon.
    #[error("invalid authorization credential")]
    InvalidAuthorization,
    /// The AcceptGrant token exchange failed; rendered as an `Alexa.Authorization` error event.
    #[error("token exchange failed")]
    AcceptGrantFailed {
        /// Message id of the failed directive, echoed in the error event.
        message_id: String,
    },
    /// Unexpected failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for AlexaError {
    fn from(rejection: JsonRejection) -> Self {
        AlexaError::InvalidDirective(rejection.body_text())
    }
}

impl IntoResponse for AlexaError {
    fn into_response(self) -> axum::response::Response {
        let (status, code) = match &self {
            AlexaError::UnsupportedOperation { .. } => {
                (StatusCode::BAD_REQUEST, "UNSUPPORTED_OPERATION")
            }
            AlexaError::InvalidDirective(_) => (StatusCode::BAD_REQUEST, "INVALID_DIRECTIVE"),
            AlexaError::InvalidAuthorization => {
                (StatusCode::UNAUTHORIZED, "INVALID_AUTHORIZATION_CREDENTIAL")
            }
            AlexaError::AcceptGrantFailed { message_id } => {
                let header =
                    EventHeader::new("Alexa.Authorization", "ErrorResponse", message_id.clone());
                let body = json!({
                    "event": {
                        "header": header,
                        "payload": {
                            "type": "ACCEPT_GRANT_FAILED",
                            "message": "Token exchange failed",
                        }
                    }
                });
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
            }
            AlexaError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = AlexaErrorBody {
            error: code.to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
