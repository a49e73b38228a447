use std::time::Duration;

/// Access tokens expire from Redis after one hour, matching the Event Gateway token lifetime.
pub const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(3_600);

/// Runtime configuration describing how to reach Redis and lay out keys.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Connection URL, e.g. `redis://localhost:6379`.
    pub url: String,
    /// Expiry applied to access-token keys.
    pub access_token_ttl: Duration,
}

impl RedisConfig {
    /// Configuration for `url` with the default access-token TTL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            access_token_ttl: ACCESS_TOKEN_TTL,
        }
    }
}

const ACCESS_PREFIX: &str = "token:event_gateway_";
const REFRESH_PREFIX: &str = "refresh:event_gateway_";

/// Key holding the access token of `grantee`.
pub fn access_key(grantee: &str) -> String {
    format!("{ACCESS_PREFIX}{grantee}")
}

/// Key holding the refresh token of `grantee`.
pub fn refresh_key(grantee: &str) -> String {
    format!("{REFRESH_PREFIX}{grantee}")
}

/// Pattern matching every access-token key.
pub fn access_pattern() -> String {
    format!("{ACCESS_PREFIX}*")
}

/// Pattern matching every refresh-token key.
pub fn refresh_pattern() -> String {
    format!("{REFRESH_PREFIX}*")
}

/// Recover the grantee token from an access-token key.
pub fn grantee_from_access_key(key: &str) -> Option<&str> {
    key.strip_prefix(ACCESS_PREFIX)
        .filter(|grantee| !grantee.is_empty())
}

/// Recover the grantee token from a refresh-token key.
pub fn grantee_from_refresh_key(key: &str) -> Option<&str> {
    key.strip_prefix(REFRESH_PREFIX)
        .filter(|grantee| !grantee.is_empty())
}
