use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;

use crate::state::{effect::Effect, sensors::DetectionState};

/// Body of `POST /api/trigger-direct`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TriggerDirectRequest {
    /// Effect name; hyphenated legacy spellings are accepted.
    pub effect: String,
    /// Browser session whose discovered lights should take part.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Outcome of one delivery channel.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChannelResult {
    /// Whether the channel delivered the effect.
    pub success: bool,
    /// What happened, for the operator.
    pub message: String,
}

impl ChannelResult {
    /// Successful outcome.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// Failed outcome.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Outcome of the Alexa contact-sensor broadcast.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SensorChannelResult {
    /// Whether at least one user received the report.
    pub success: bool,
    /// What happened, for the operator.
    pub message: String,
    /// Users whose report was accepted.
    pub users_triggered: usize,
    /// Linked users.
    pub total_users: usize,
    /// Users whose token could not be refreshed and must relink the skill.
    pub reconnect_required: usize,
}

/// Aggregated result of a direct trigger, rendered by the cue player.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TriggerDirectResponse {
    /// Whether any channel succeeded.
    pub success: bool,
    /// Alexa contact sensors.
    pub sensor: SensorChannelResult,
    /// IFTTT Maker Webhooks.
    pub ifttt: ChannelResult,
    /// Session lights.
    pub lights: ChannelResult,
    /// Effect that was fired.
    pub effect: Effect,
    /// ISO-8601 dispatch time.
    pub timestamp: String,
}

/// Body of `POST /api/trigger`: either a raw Maker event or a known effect.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TriggerRequest {
    /// Raw Maker event name; wins over `effect`.
    #[serde(default)]
    pub event: Option<String>,
    /// Effect to fire through Maker.
    #[serde(default)]
    pub effect: Option<String>,
    /// JSON forwarded with `event`.
    #[serde(default)]
    pub payload: Option<Value>,
}

/// Result of `POST /api/trigger`.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct TriggerResponse {
    /// Whether Maker accepted the call.
    pub ok: bool,
    /// `maker_event` or `maker`.
    pub via: String,
    /// What happened, for the operator.
    pub message: Option<String>,
}

/// Current state of every virtual sensor.
#[derive(Debug, Serialize, ToSchema)]
pub struct SensorStatesResponse {
    /// State keyed by endpoint id.
    pub states: BTreeMap<String, DetectionState>,
}
