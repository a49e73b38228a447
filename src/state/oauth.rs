//! Authorization-code grants issued to the IFTTT service for the single demo user.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use dashmap::DashMap;
use rand::{Rng, distr::Alphanumeric};
use thiserror::Error;
use tokio::time::Instant;

/// Identifier of the only user this service knows about.
pub const DEMO_USER_ID: &str = "haunted-house-demo";
/// Display name returned by `/ifttt/v1/user/info`.
pub const DEMO_USER_NAME: &str = "Haunted House";

const CODE_TTL: Duration = Duration::from_secs(600);
/// Lifetime of issued access tokens.
pub const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(3_600);
/// Lifetime of tokens handed to IFTTT's endpoint tests.
pub const TEST_TOKEN_TTL: Duration = Duration::from_secs(3_600);
/// Outstanding authorization codes kept at once; the oldest is evicted beyond this.
const MAX_PENDING_CODES: usize = 1_024;
const TOKEN_LENGTH: usize = 40;

#[derive(Debug, Clone)]
struct PendingCode {
    /// Issue order, used to evict the oldest code.
    sequence: u64,
    client_id: String,
    redirect_uri: Option<String>,
    expires_at: Instant,
}

#[derive(Debug, Clone)]
struct IssuedToken {
    user_id: String,
    expires_at: Instant,
}

#[derive(Debug, Clone)]
struct RefreshGrant {
    user_id: String,
    /// Access token issued alongside; revoked when this grant is rotated.
    access_token: String,
}

/// Access/refresh pair handed out by the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    /// Token for the IFTTT service endpoints.
    pub access_token: String,
    /// Single-use token for the next rotation.
    pub refresh_token: String,
    /// Access token lifetime.
    pub expires_in: Duration,
}

/// Reasons a grant cannot be redeemed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GrantError {
    /// Code unknown or already redeemed.
    #[error("authorization code is unknown or already used")]
    UnknownCode,
    /// Code older than its TTL.
    #[error("authorization code has expired")]
    ExpiredCode,
    /// Code issued to another client.
    #[error("authorization code was issued to another client")]
    ClientMismatch,
    /// Redirect URI differs from the authorization request.
    #[error("redirect_uri does not match the authorization request")]
    RedirectMismatch,
    /// Refresh token unknown or already rotated.
    #[error("refresh token is unknown")]
    UnknownRefreshToken,
}

/// In-memory store of outstanding codes and issued tokens.
#[derive(Default)]
pub struct OAuthGrants {
    codes: DashMap<String, PendingCode>,
    code_sequence: AtomicU64,
    access_tokens: DashMap<String, IssuedToken>,
    refresh_tokens: DashMap<String, RefreshGrant>,
}

impl OAuthGrants {
    /// Empty grant table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a one-time authorization code for `client_id`.
    pub fn issue_code(&self, client_id: &str, redirect_uri: Option<&str>) -> String {
        self.purge_expired();
        if self.codes.len() >= MAX_PENDING_CODES {
            self.evict_oldest_code();
        }

        let code = random_token();
        self.codes.insert(
            code.clone(),
            PendingCode {
                sequence: self.code_sequence.fetch_add(1, Ordering::Relaxed),
                client_id: client_id.to_string(),
                redirect_uri: redirect_uri.map(str::to_string),
                expires_at: Instant::now() + CODE_TTL,
            },
        );
        code
    }

    /// Consume `code` and issue a token pair. The code is gone afterwards even when
    /// redemption fails.
    pub fn redeem_code(
        &self,
        code: &str,
        client_id: &str,
        redirect_uri: Option<&str>,
    ) -> Result<TokenPair, GrantError> {
        let (_, pending) = self.codes.remove(code).ok_or(GrantError::UnknownCode)?;
        if pending.expires_at <= Instant::now() {
            return Err(GrantError::ExpiredCode);
        }
        if pending.client_id != client_id {
            return Err(GrantError::ClientMismatch);
        }
        if let (Some(expected), Some(actual)) = (pending.redirect_uri.as_deref(), redirect_uri) {
            if expected != actual {
                return Err(GrantError::RedirectMismatch);
            }
        }
        Ok(self.issue_tokens(DEMO_USER_ID))
    }

    /// Rotate a refresh token into a fresh token pair, revoking the access token issued with it.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair, GrantError> {
        let (_, grant) = self
            .refresh_tokens
            .remove(refresh_token)
            .ok_or(GrantError::UnknownRefreshToken)?;
        self.access_tokens.remove(&grant.access_token);
        Ok(self.issue_tokens(&grant.user_id))
    }

    /// Issue a short-lived access token for IFTTT's endpoint tests.
    pub fn issue_test_token(&self) -> String {
        self.purge_expired();
        let token = random_token();
        self.access_tokens.insert(
            token.clone(),
            IssuedToken {
                user_id: DEMO_USER_ID.to_string(),
                expires_at: Instant::now() + TEST_TOKEN_TTL,
            },
        );
        token
    }

    /// User owning `access_token`, if the token is known and still valid.
    pub fn user_for(&self, access_token: &str) -> Option<String> {
        let issued = self.access_tokens.get(access_token)?;
        (issued.expires_at > Instant::now()).then(|| issued.user_id.clone())
    }

    /// Drop expired codes and access tokens.
    fn purge_expired(&self) {
        let now = Instant::now();
        self.codes.retain(|_, pending| pending.expires_at > now);
        self.access_tokens.retain(|_, issued| issued.expires_at > now);
    }

    fn evict_oldest_code(&self) {
        let oldest = self
            .codes
            .iter()
            .min_by_key(|entry| entry.value().sequence)
            .map(|entry| entry.key().clone());
        if let Some(code) = oldest {
            self.codes.remove(&code);
        }
    }

    fn issue_tokens(&self, user_id: &str) -> TokenPair {
        self.purge_expired();
        let access_token = random_token();
        let refresh_token = random_token();
        self.access_tokens.insert(
            access_token.clone(),
            IssuedToken {
                user_id: user_id.to_string(),
                expires_at: Instant::now() + ACCESS_TOKEN_TTL,
            },
        );
        self.refresh_tokens.insert(
            refresh_token.clone(),
            RefreshGrant {
                user_id: user_id.to_string(),
                access_token: access_token.clone(),
            },
        );
        TokenPair {
            access_token,
            refresh_token,
            expires_in: ACCESS_TOKEN_TTL,
        }
    }
}

fn random_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_single_use() {
        let grants = OAuthGrants::new();
        let code = grants.issue_code("ifttt", Some("https://ifttt.com/channels/haunted/authorize"));

        let pair = grants
            .redeem_code(&code, "ifttt", Some("https://ifttt.com/channels/haunted/authorize"))
            .unwrap();
        assert_eq!(grants.user_for(&pair.access_token).as_deref(), Some(DEMO_USER_ID));

        assert_eq!(
            grants.redeem_code(&code, "ifttt", None),
            Err(GrantError::UnknownCode)
        );
    }

    #[test]
    fn client_mismatch_burns_the_code() {
        let grants = OAuthGrants::new();
        let code = grants.issue_code("ifttt", None);
        assert_eq!(
            grants.redeem_code(&code, "someone-else", None),
            Err(GrantError::ClientMismatch)
        );
        assert_eq!(
            grants.redeem_code(&code, "ifttt", None),
            Err(GrantError::UnknownCode)
        );
    }

    #[test]
    fn redirect_uri_must_match() {
        let grants = OAuthGrants::new();
        let code = grants.issue_code("ifttt", Some("https://a.example/cb"));
        assert_eq!(
            grants.redeem_code(&code, "ifttt", Some("https://b.example/cb")),
            Err(GrantError::RedirectMismatch)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn expired_codes_are_rejected() {
        let grants = OAuthGrants::new();
        let code = grants.issue_code("ifttt", None);
        tokio::time::advance(CODE_TTL + Duration::from_secs(1)).await;
        assert_eq!(
            grants.redeem_code(&code, "ifttt", None),
            Err(GrantError::ExpiredCode)
        );
    }

    #[test]
    fn refresh_rotates_tokens() {
        let grants = OAuthGrants::new();
        let code = grants.issue_code("ifttt", None);
        let first = grants.redeem_code(&code, "ifttt", None).unwrap();

        let second = grants.refresh(&first.refresh_token).unwrap();
        assert_ne!(first.access_token, second.access_token);
        assert!(grants.user_for(&second.access_token).is_some());
        assert!(grants.user_for(&first.access_token).is_none());
        assert_eq!(grants.access_tokens.len(), 1);
        assert_eq!(
            grants.refresh(&first.refresh_token),
            Err(GrantError::UnknownRefreshToken)
        );
    }

    #[test]
    fn unknown_tokens_have_no_user() {
        let grants = OAuthGrants::new();
        assert!(grants.user_for("nope").is_none());
        let test_token = grants.issue_test_token();
        assert_eq!(grants.user_for(&test_token).as_deref(), Some(DEMO_USER_ID));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_grants_are_purged_on_issue() {
        let grants = OAuthGrants::new();
        grants.issue_code("ifttt", None);
        let test_token = grants.issue_test_token();
        let code = grants.issue_code("ifttt", None);
        let pair = grants.redeem_code(&code, "ifttt", None).unwrap();

        tokio::time::advance(ACCESS_TOKEN_TTL.max(TEST_TOKEN_TTL) + Duration::from_secs(1)).await;
        assert!(grants.user_for(&test_token).is_none());
        assert!(grants.user_for(&pair.access_token).is_none());

        grants.issue_code("ifttt", None);
        assert_eq!(grants.codes.len(), 1);
        assert!(grants.access_tokens.is_empty());
    }

    #[test]
    fn pending_codes_are_capped() {
        let grants = OAuthGrants::new();
        let first = grants.issue_code("ifttt", None);
        for _ in 0..MAX_PENDING_CODES {
            grants.issue_code("ifttt", None);
        }

        assert_eq!(grants.codes.len(), MAX_PENDING_CODES);
        assert_eq!(
            grants.redeem_code(&first, "ifttt", None),
            Err(GrantError::UnknownCode)
        );
    }
}
