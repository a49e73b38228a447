//! Body extractors that render malformed payloads as 400 in each surface's error format.

use axum::extract::FromRequest;

use crate::error::{AlexaError, AppError, IftttError, OAuthError};

/// JSON body for the trigger and debug endpoints.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Smart Home directive body; decoding failures become `INVALID_DIRECTIVE`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AlexaError))]
pub struct DirectiveJson<T>(pub T);

/// IFTTT service request body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(IftttError))]
pub struct IftttJson<T>(pub T);

/// Form-encoded token request; decoding failures become `invalid_request`.
#[derive(FromRequest)]
#[from_request(via(axum::Form), rejection(OAuthError))]
pub struct OAuthForm<T>(pub T);
