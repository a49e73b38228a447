/// Event Gateway credentials of one Alexa user, keyed by the grantee token from AcceptGrant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    /// Grantee token from AcceptGrant, identifying the user.
    pub grantee_token: String,
    /// Current Event Gateway access token.
    pub access_token: String,
    /// Refresh token, when Amazon issued one.
    pub refresh_token: Option<String>,
}

/// What the durable store holds for one grantee. The access token expires out of the store
/// on its own; the refresh token outlives it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTokens {
    /// Grantee token from AcceptGrant, identifying the user.
    pub grantee_token: String,
    /// Access token, unless it already expired out of the store.
    pub access_token: Option<String>,
    /// Refresh token, when Amazon issued one.
    pub refresh_token: Option<String>,
}

impl From<TokenRecord> for StoredTokens {
    fn from(record: TokenRecord) -> Self {
        Self {
            grantee_token: record.grantee_token,
            access_token: Some(record.access_token),
            refresh_token: record.refresh_token,
        }
    }
}

impl TokenRecord {
    /// Record for `grantee_token`.
    pub fn new(
        grantee_token: impl Into<String>,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
    ) -> Self {
        Self {
            grantee_token: grantee_token.into(),
            access_token: access_token.into(),
            refresh_token,
        }
    }
}
