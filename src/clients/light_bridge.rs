//! Client for a local light bridge daemon that owns TP-Link/Tapo and Tuya control.
//!
//! The bridge contract is this crate's own and no published bridge implements it yet: one
//! `POST {LIGHT_BRIDGE_URL}/lights/effect` per light with the body
//! `{"type": "tapo"|"tuya", "address": .., "name": .., "action": "on"|"off"|"flash_red"}`,
//! where any 2xx status counts as applied. A deployment must put a small adapter speaking this
//! contract in front of its devices; without `LIGHT_BRIDGE_URL` the lights channel reports
//! "Light bridge not configured" and the other channels are unaffected.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;

use crate::state::{effect::Effect, lights::DiscoveredLight};

use super::error::{ClientError, ClientResult};

const BRIDGE_TARGET: &str = "light bridge";
const BRIDGE_TIMEOUT: Duration = Duration::from_secs(3);

/// What a light should do for a given effect; serialised as the `action` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LightAction {
    /// Switch on.
    On,
    /// Switch off.
    Off,
    /// Flash red.
    FlashRed,
}

impl From<Effect> for LightAction {
    fn from(effect: Effect) -> Self {
        match effect {
            Effect::Blackout => LightAction::Off,
            Effect::FlashRed => LightAction::FlashRed,
            Effect::PlugOn | Effect::Reset => LightAction::On,
        }
    }
}

#[derive(Serialize)]
struct BridgeCommand<'a> {
    #[serde(flatten)]
    light: &'a DiscoveredLight,
    action: LightAction,
}

/// HTTP client for the light bridge; inert until a base URL is configured.
#[derive(Clone)]
pub struct LightBridgeClient {
    http: Client,
    base_url: Option<String>,
}

impl LightBridgeClient {
    /// Trailing slashes are dropped from `base_url`.
    pub fn new(http: Client, base_url: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.map(|url| url.trim_end_matches('/').to_string()),
        }
    }

    /// Whether `LIGHT_BRIDGE_URL` was set.
    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    /// Ask the bridge to apply `action` to `light`.
    pub async fn apply(&self, light: &DiscoveredLight, action: LightAction) -> ClientResult<()> {
        let base_url = self.base_url.as_deref().ok_or(ClientError::NotConfigured {
            setting: "LIGHT_BRIDGE_URL",
        })?;

        let response = self
            .http
            .post(format!("{base_url}/lights/effect"))
            .json(&BridgeCommand { light, action })
            .timeout(BRIDGE_TIMEOUT)
            .send()
            .await
            .map_err(|source| ClientError::from_send(BRIDGE_TARGET, source))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ClientError::Status {
                target: BRIDGE_TARGET,
                status: response.status(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::lights::LightKind;

    #[test]
    fn effects_map_to_light_actions() {
        assert_eq!(LightAction::from(Effect::Blackout), LightAction::Off);
        assert_eq!(LightAction::from(Effect::FlashRed), LightAction::FlashRed);
        assert_eq!(LightAction::from(Effect::Reset), LightAction::On);
    }

    #[test]
    fn command_flattens_light() {
        let light = DiscoveredLight {
            kind: LightKind::Tuya,
            address: "bf12ab".into(),
            name: "Hall".into(),
        };
        let json = serde_json::to_value(BridgeCommand {
            light: &light,
            action: LightAction::FlashRed,
        })
        .unwrap();
        assert_eq!(json["type"], "tuya");
        assert_eq!(json["address"], "bf12ab");
        assert_eq!(json["action"], "flash_red");
    }
}
