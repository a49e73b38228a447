//! Error types shared by the outbound HTTP clients.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenient result alias returning [`ClientError`] failures.
pub type ClientResult<T> = Result<T, ClientError>;

/// Failures that can occur while talking to Amazon, IFTTT or the light bridge.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build HTTP client")]
    ClientBuilder {
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// A credential or endpoint required for the call is not configured.
    #[error("`{setting}` is not configured")]
    NotConfigured {
        /// Environment variable to set.
        setting: &'static str,
    },
    /// The target URL could not be assembled.
    #[error("invalid URL for {target}: {url}")]
    InvalidUrl {
        /// Upstream being called.
        target: &'static str,
        /// URL that failed to parse.
        url: String,
    },
    /// The request could not be sent.
    #[error("failed to send request to {target}")]
    RequestSend {
        /// Upstream being called.
        target: &'static str,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// The upstream did not answer in time.
    #[error("request to {target} timed out")]
    Timeout {
        /// Upstream being called.
        target: &'static str,
    },
    /// The upstream rejected the credentials we presented.
    #[error("{target} rejected the bearer token")]
    Unauthorized {
        /// Upstream being called.
        target: &'static str,
    },
    /// The upstream returned an unexpected status code.
    #[error("unexpected response status {status} from {target}")]
    Status {
        /// Upstream being called.
        target: &'static str,
        /// Status the upstream returned.
        status: StatusCode,
    },
    /// Response payload could not be parsed into JSON.
    #[error("failed to decode response from {target}")]
    DecodeResponse {
        /// Upstream being called.
        target: &'static str,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
}

impl ClientError {
    /// Classify a send failure, separating timeouts from other transport errors.
    pub fn from_send(target: &'static str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            ClientError::Timeout { target }
        } else {
            ClientError::RequestSend { target, source }
        }
    }

    /// Whether the upstream rejected the credential with 401.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized { .. })
    }
}
