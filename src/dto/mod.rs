use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Alexa Smart Home envelopes.
pub mod alexa;
/// Health payloads.
pub mod health;
/// IFTTT service protocol payloads.
pub mod ifttt;
/// Light discovery payloads.
pub mod lights;
/// OAuth account-linking payloads.
pub mod oauth;
/// Server-sent event payloads.
pub mod sse;
/// Effect trigger payloads.
pub mod trigger;
/// Shared input validators.
pub mod validation;

/// Render `time` as an ISO-8601 / RFC 3339 timestamp.
pub fn format_timestamp(time: OffsetDateTime) -> String {
    time.format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}

/// Current UTC time as an RFC 3339 timestamp.
pub fn now_timestamp() -> String {
    format_timestamp(OffsetDateTime::now_utc())
}
