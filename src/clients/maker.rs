//! IFTTT Maker Webhooks client.

use std::time::Duration;

use reqwest::{Client, Url};
use serde_json::Value;

use super::error::{ClientError, ClientResult};

const MAKER_TARGET: &str = "IFTTT Maker Webhooks";

/// Posts events to `https://maker.ifttt.com/trigger/<event>/...`.
#[derive(Clone)]
pub struct MakerClient {
    http: Client,
    base_url: String,
    key: Option<String>,
}

impl MakerClient {
    /// Client for `base_url`; inert without a webhook key.
    pub fn new(http: Client, base_url: impl Into<String>, key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            key,
        }
    }

    /// Whether `IFTTT_WEBHOOK_KEY` was set.
    pub fn is_configured(&self) -> bool {
        self.key.is_some()
    }

    /// Fire `event` with the classic `value1..value3` body.
    pub async fn trigger(&self, event: &str, body: &Value, timeout: Duration) -> ClientResult<()> {
        let url = self.url(&["trigger", event, "with", "key"])?;
        self.post(url, body, timeout).await
    }

    /// Fire `event` through the JSON endpoint, forwarding an arbitrary payload.
    pub async fn trigger_json(
        &self,
        event: &str,
        payload: &Value,
        timeout: Duration,
    ) -> ClientResult<()> {
        let url = self.url(&["trigger", event, "json", "with", "key"])?;
        self.post(url, payload, timeout).await
    }

    fn url(&self, segments: &[&str]) -> ClientResult<Url> {
        let key = self.key.as_deref().ok_or(ClientError::NotConfigured {
            setting: "IFTTT_WEBHOOK_KEY",
        })?;
        let invalid = || ClientError::InvalidUrl {
            target: MAKER_TARGET,
            url: self.base_url.clone(),
        };

        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments)
            .push(key);
        Ok(url)
    }

    async fn post(&self, url: Url, body: &Value, timeout: Duration) -> ClientResult<()> {
        let response = self
            .http
            .post(url)
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|source| ClientError::from_send(MAKER_TARGET, source))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ClientError::Status {
                target: MAKER_TARGET,
                status: response.status(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_escaped_trigger_urls() {
        let client = MakerClient::new(
            Client::new(),
            "https://maker.ifttt.com/",
            Some("secret".into()),
        );
        let url = client
            .url(&["trigger", "haunted on", "json", "with", "key"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://maker.ifttt.com/trigger/haunted%20on/json/with/key/secret"
        );
    }

    #[test]
    fn missing_key_is_not_configured() {
        let client = MakerClient::new(Client::new(), "https://maker.ifttt.com", None);
        assert!(!client.is_configured());
        assert!(matches!(
            client.url(&["trigger", "x", "with", "key"]),
            Err(ClientError::NotConfigured { .. })
        ));
    }
}
