//! Login-with-Amazon token endpoints and the Alexa Event Gateway.

use std::{sync::Arc, time::Duration};

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AlexaConfig;

use super::error::{ClientError, ClientResult};

const AMAZON_TIMEOUT: Duration = Duration::from_secs(10);
const TOKEN_TARGET: &str = "Amazon token endpoint";
const TOKENINFO_TARGET: &str = "Amazon tokeninfo endpoint";
const GATEWAY_TARGET: &str = "Alexa Event Gateway";

/// Token pair returned by the Login-with-Amazon token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct LwaTokens {
    /// Bearer token for Event Gateway calls.
    pub access_token: String,
    /// Absent when Amazon keeps the previous refresh token valid.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Subset of the tokeninfo payload used to validate ReportState callers.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenInfo {
    /// Client id the token was issued to.
    #[serde(default)]
    pub aud: Option<String>,
    /// Amazon account behind the token.
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Thin client over the Amazon endpoints the skill talks to.
#[derive(Clone)]
pub struct AmazonClient {
    http: Client,
    config: Arc<AlexaConfig>,
}

impl AmazonClient {
    /// Client sharing `http` with the rest of the process.
    pub fn new(http: Client, config: AlexaConfig) -> Self {
        Self {
            http,
            config: Arc::new(config),
        }
    }

    /// Exchange an AcceptGrant code for Event Gateway tokens.
    pub async fn exchange_grant_code(&self, code: &str) -> ClientResult<LwaTokens> {
        let (client_id, client_secret) = self.credentials()?;
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ])
        .await
    }

    /// Trade a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> ClientResult<LwaTokens> {
        let (client_id, client_secret) = self.credentials()?;
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ])
        .await
    }

    /// Resolve a bearer token through tokeninfo, rejecting tokens minted for another client.
    pub async fn token_info(&self, access_token: &str) -> ClientResult<TokenInfo> {
        let response = self
            .http
            .get(&self.config.tokeninfo_url)
            .query(&[("access_token", access_token)])
            .timeout(AMAZON_TIMEOUT)
            .send()
            .await
            .map_err(|source| ClientError::from_send(TOKENINFO_TARGET, source))?;

        match response.status() {
            status if status.is_success() => {
                let info = response.json::<TokenInfo>().await.map_err(|source| {
                    ClientError::DecodeResponse {
                        target: TOKENINFO_TARGET,
                        source,
                    }
                })?;
                match (&self.config.lwa_client_id, &info.aud) {
                    (Some(expected), Some(aud)) if expected != aud => {
                        debug!(%aud, "bearer token issued for another client");
                        Err(ClientError::Unauthorized {
                            target: TOKENINFO_TARGET,
                        })
                    }
                    _ => Ok(info),
                }
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized {
                target: TOKENINFO_TARGET,
            }),
            other => Err(ClientError::Status {
                target: TOKENINFO_TARGET,
                status: other,
            }),
        }
    }

    /// Post an event to the Event Gateway using `access_token`.
    pub async fn send_event<E>(&self, access_token: &str, event: &E) -> ClientResult<()>
    where
        E: Serialize + ?Sized,
    {
        let response = self
            .http
            .post(&self.config.event_gateway_url)
            .bearer_auth(access_token)
            .json(event)
            .timeout(AMAZON_TIMEOUT)
            .send()
            .await
            .map_err(|source| ClientError::from_send(GATEWAY_TARGET, source))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized {
                target: GATEWAY_TARGET,
            }),
            other => Err(ClientError::Status {
                target: GATEWAY_TARGET,
                status: other,
            }),
        }
    }

    fn credentials(&self) -> ClientResult<(&str, &str)> {
        let client_id = self
            .config
            .client_id
            .as_deref()
            .ok_or(ClientError::NotConfigured {
                setting: "ALEXA_CLIENT_ID",
            })?;
        let client_secret =
            self.config
                .client_secret
                .as_deref()
                .ok_or(ClientError::NotConfigured {
                    setting: "ALEXA_CLIENT_SECRET",
                })?;
        Ok((client_id, client_secret))
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> ClientResult<LwaTokens> {
        let response = self
            .http
            .post(&self.config.token_url)
            .form(form)
            .timeout(AMAZON_TIMEOUT)
            .send()
            .await
            .map_err(|source| ClientError::from_send(TOKEN_TARGET, source))?;

        if !response.status().is_success() {
            return Err(ClientError::Status {
                target: TOKEN_TARGET,
                status: response.status(),
            });
        }

        response
            .json::<LwaTokens>()
            .await
            .map_err(|source| ClientError::DecodeResponse {
                target: TOKEN_TARGET,
                source,
            })
    }
}
