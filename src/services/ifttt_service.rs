//! IFTTT service protocol: status, endpoint-test setup, user info, the `run_effect` action and the
//! `effect_requested` polling trigger.

use serde_json::json;
use time::OffsetDateTime;

use crate::{
    dto::{
        format_timestamp,
        ifttt::{
            ActionRecord, ActionResponse, RunEffectRequest, TestSetupData, TestSetupResponse,
            TriggerItem, TriggerMeta, TriggerPollRequest, TriggerPollResponse, UserInfo,
            UserInfoResponse,
        },
    },
    error::ServiceError,
    services::effect_service,
    state::{
        SharedState,
        effect::Effect,
        ifttt::{DEFAULT_TRIGGER_LIMIT, EffectRequest},
        oauth::DEMO_USER_NAME,
    },
};

/// Check the `IFTTT-Service-Key` header against the configured key.
pub fn verify_service_key(state: &SharedState, provided: Option<&str>) -> Result<(), ServiceError> {
    let Some(expected) = state.config().ifttt.service_key.as_deref() else {
        return Err(ServiceError::Unauthorized(
            "IFTTT service key is not configured".into(),
        ));
    };
    match provided {
        Some(key) if key == expected => Ok(()),
        _ => Err(ServiceError::Unauthorized("invalid channel key".into())),
    }
}

/// Resolve the user behind an `Authorization: Bearer` header.
pub fn authenticate(state: &SharedState, authorization: Option<&str>) -> Result<String, ServiceError> {
    authorization
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .and_then(|token| state.oauth().user_for(token))
        .ok_or_else(|| ServiceError::Unauthorized("invalid access token".into()))
}

/// Issue a throwaway token plus sample field values for IFTTT's endpoint tests.
pub fn test_setup(
    state: &SharedState,
    service_key: Option<&str>,
) -> Result<TestSetupResponse, ServiceError> {
    verify_service_key(state, service_key)?;

    let samples = json!({
        "actions": {
            "run_effect": { "effect": Effect::FlashRed.as_str() }
        },
        "actionRecordSkipping": {
            "run_effect": { "effect": "not_a_real_effect" }
        },
        "triggers": {
            "effect_requested": {}
        }
    });

    Ok(TestSetupResponse {
        data: TestSetupData {
            access_token: state.oauth().issue_test_token(),
            samples,
        },
    })
}

/// Resolve the IFTTT user behind `authorization`.
pub fn user_info(
    state: &SharedState,
    authorization: Option<&str>,
) -> Result<UserInfoResponse, ServiceError> {
    let id = authenticate(state, authorization)?;
    Ok(UserInfoResponse {
        data: UserInfo {
            name: DEMO_USER_NAME.to_string(),
            id,
        },
    })
}

/// Run the `run_effect` action: dispatch the effect and return the created record id.
pub async fn run_effect(
    state: &SharedState,
    authorization: Option<&str>,
    request: RunEffectRequest,
) -> Result<ActionResponse, ServiceError> {
    authenticate(state, authorization)?;

    let raw = request
        .action_fields
        .effect
        .ok_or_else(|| ServiceError::InvalidInput("missing action field `effect`".into()))?;
    let effect: Effect = raw.parse()?;

    let outcome = effect_service::trigger_effect(state, effect, None, "ifttt_action").await;
    Ok(ActionResponse {
        data: vec![ActionRecord {
            id: outcome.request.id,
        }],
    })
}

/// Poll the `effect_requested` trigger: newest first, exactly `limit` items (at most 50).
pub async fn effect_requested(
    state: &SharedState,
    authorization: Option<&str>,
    request: TriggerPollRequest,
) -> Result<TriggerPollResponse, ServiceError> {
    authenticate(state, authorization)?;

    let limit = request.limit.unwrap_or(DEFAULT_TRIGGER_LIMIT);
    let data = state
        .effect_feed()
        .latest(limit)
        .await
        .into_iter()
        .map(trigger_item)
        .collect();
    Ok(TriggerPollResponse { data })
}

fn trigger_item(request: EffectRequest) -> TriggerItem {
    let created_at = OffsetDateTime::from_unix_timestamp(request.timestamp)
        .map(format_timestamp)
        .unwrap_or_default();
    TriggerItem {
        effect: request.effect.as_str().to_string(),
        source: request.source,
        created_at,
        meta: TriggerMeta {
            id: request.id,
            timestamp: request.timestamp,
        },
    }
}
