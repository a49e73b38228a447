//! Shapes mandated by the IFTTT service API.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;

/// Body of `/ifttt/v1/test/setup`.
#[derive(Debug, Serialize, ToSchema)]
pub struct TestSetupResponse {
    /// Test credentials and samples.
    pub data: TestSetupData,
}

/// What the IFTTT endpoint tests run with.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestSetupData {
    /// Token accepted by the service endpoints.
    pub access_token: String,
    /// Sample action and trigger fields.
    pub samples: Value,
}

/// Body of `/ifttt/v1/user/info`.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserInfoResponse {
    /// The linked user.
    pub data: UserInfo,
}

/// Linked IFTTT user.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserInfo {
    /// Display name.
    pub name: String,
    /// Stable user id.
    pub id: String,
}

/// Body IFTTT posts to `/ifttt/v1/actions/run_effect`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RunEffectRequest {
    /// Fields the applet filled in.
    #[serde(default)]
    pub action_fields: RunEffectFields,
}

/// Action fields of `run_effect`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RunEffectFields {
    /// Effect to fire.
    #[serde(default)]
    pub effect: Option<String>,
}

/// Successful action result.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    /// Exactly one record per run.
    pub data: Vec<ActionRecord>,
}

/// Identifier of one action run.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionRecord {
    /// Id of the recorded effect.
    pub id: String,
}

/// Body IFTTT posts when polling `/ifttt/v1/triggers/effect_requested`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TriggerPollRequest {
    /// Page size; 50 when absent and never more.
    #[serde(default)]
    pub limit: Option<usize>,
    /// Ignored; the trigger takes no fields.
    #[serde(default)]
    pub trigger_fields: Option<Value>,
}

/// Trigger poll result, newest first.
#[derive(Debug, Serialize, ToSchema)]
pub struct TriggerPollResponse {
    /// Recorded effects.
    pub data: Vec<TriggerItem>,
}

/// One recorded effect as IFTTT sees it.
#[derive(Debug, Serialize, ToSchema)]
pub struct TriggerItem {
    /// Effect name.
    pub effect: String,
    /// Who fired it.
    pub source: String,
    /// ISO-8601 creation time.
    pub created_at: String,
    /// Deduplication metadata.
    pub meta: TriggerMeta,
}

/// IFTTT deduplication metadata.
#[derive(Debug, Serialize, ToSchema)]
pub struct TriggerMeta {
    /// Unique event id.
    pub id: String,
    /// Unix seconds.
    pub timestamp: i64,
}

/// IFTTT error envelope: `{"errors": [{"message": ...}]}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct IftttErrorBody {
    /// One entry per error.
    pub errors: Vec<IftttErrorMessage>,
}

/// One IFTTT error.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct IftttErrorMessage {
    /// `SKIP` tells IFTTT not to retry an action that can never succeed.
    pub status: Option<String>,
    /// Human-readable detail.
    pub message: String,
}
