//! Fan-out of one effect to every delivery channel: Alexa contact sensors, IFTTT Maker Webhooks
//! and the lights discovered by the caller's browser session.

use std::time::Duration;

use dashmap::DashSet;
use futures::future::join_all;
use serde_json::{Value, json};
use time::OffsetDateTime;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::{
    clients::light_bridge::LightAction,
    dto::{
        format_timestamp, now_timestamp,
        trigger::{
            ChannelResult, SensorChannelResult, TriggerDirectRequest, TriggerDirectResponse,
            TriggerRequest, TriggerResponse,
        },
    },
    error::ServiceError,
    services::alexa_service,
    state::{
        AppState, SharedState,
        effect::Effect,
        ifttt::EffectRequest,
        sensors::{DetectionState, SENSOR_RESET_DELAY},
    },
};

const MAKER_TIMEOUT: Duration = Duration::from_secs(3);
const MAKER_JSON_TIMEOUT: Duration = Duration::from_secs(4);
const MAKER_SOURCE_TAG: &str = "haunted_trigger";

/// Result of a dispatched effect together with the feed entry recorded for it.
pub struct EffectOutcome {
    /// Per-channel results.
    pub response: TriggerDirectResponse,
    /// Feed entry recorded for the dispatch.
    pub request: EffectRequest,
}

/// Outcome of one Alexa user's change report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UserDelivery {
    Delivered,
    /// The token was rejected and could not be refreshed; the user must relink the skill.
    ReconnectRequired,
    Failed,
}

/// Handle `POST /api/trigger-direct`. Unknown effects are rejected before any state changes.
pub async fn trigger_direct(
    state: &SharedState,
    request: TriggerDirectRequest,
) -> Result<TriggerDirectResponse, ServiceError> {
    let effect: Effect = request.effect.parse()?;
    let session_id = request.session_id.as_deref();
    let outcome = trigger_effect(state, effect, session_id, "trigger_direct").await;
    Ok(outcome.response)
}

/// Fire `effect` on every channel concurrently and record it in the IFTTT feed.
///
/// The aggregate succeeds when any channel succeeded; a total failure is still a normal result.
pub async fn trigger_effect(
    state: &SharedState,
    effect: Effect,
    session_id: Option<&str>,
    source: &str,
) -> EffectOutcome {
    let (sensor, ifttt, lights) = tokio::join!(
        alexa_leg(state, effect),
        maker_leg(state, effect),
        lights_leg(state, effect, session_id),
    );

    let success = sensor.success || ifttt.success || lights.success;
    let now = OffsetDateTime::now_utc();
    let request = state.effect_feed().record(effect, source, now).await;

    info!(
        %effect,
        source,
        success,
        alexa = sensor.success,
        ifttt = ifttt.success,
        lights = lights.success,
        "effect dispatched"
    );

    EffectOutcome {
        response: TriggerDirectResponse {
            success,
            sensor,
            ifttt,
            lights,
            effect,
            timestamp: format_timestamp(now),
        },
        request,
    }
}

/// Handle `POST /api/trigger`: forward a raw Maker event, or fire a known effect through Maker only.
pub async fn trigger_fallback(
    state: &SharedState,
    request: TriggerRequest,
) -> Result<TriggerResponse, ServiceError> {
    if let Some(event) = request.event.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
        let payload = request.payload.unwrap_or_else(|| json!({}));
        let result = match state
            .maker()
            .trigger_json(event, &payload, MAKER_JSON_TIMEOUT)
            .await
        {
            Ok(()) => ChannelResult::ok("IFTTT triggered"),
            Err(err) => {
                warn!(event, error = %err, "maker event forwarding failed");
                ChannelResult::failed(err.to_string())
            }
        };
        return Ok(TriggerResponse {
            ok: result.success,
            via: "maker_event".into(),
            message: Some(result.message),
        });
    }

    let Some(raw) = request.effect else {
        return Err(ServiceError::InvalidInput(
            "either `event` or `effect` is required".into(),
        ));
    };
    let effect: Effect = raw.parse()?;
    let result = maker_leg(state, effect).await;
    if result.success {
        state
            .effect_feed()
            .record(effect, "api_trigger", OffsetDateTime::now_utc())
            .await;
    }

    Ok(TriggerResponse {
        ok: result.success,
        via: "maker".into(),
        message: Some(result.message),
    })
}

/// Flip the effect's sensor to `DETECTED`, report it to every linked user, and schedule the reset.
async fn alexa_leg(state: &SharedState, effect: Effect) -> SensorChannelResult {
    let Some(sensor) = state.config().sensors.sensor_for(effect) else {
        return SensorChannelResult {
            success: false,
            message: format!("No sensor configured for {effect}"),
            users_triggered: 0,
            total_users: 0,
            reconnect_required: 0,
        };
    };
    let endpoint_id = sensor.endpoint_id.clone();

    // The local state flips at the deadline, but the NOT_DETECTED report is held back until
    // every DETECTED report of this trigger has been answered.
    let (detected_sent, detected_done) = oneshot::channel::<()>();
    let reset_state = state.clone();
    let reset_endpoint = endpoint_id.clone();
    state
        .sensors()
        .trigger(&endpoint_id, SENSOR_RESET_DELAY, move || async move {
            let _ = detected_done.await;
            broadcast_change(&reset_state, &reset_endpoint, DetectionState::NotDetected).await;
        });

    let result = report_detected(state, effect, &endpoint_id).await;
    let _ = detected_sent.send(());
    result
}

async fn report_detected(
    state: &AppState,
    effect: Effect,
    endpoint_id: &str,
) -> SensorChannelResult {
    let tokens = state.tokens().get_all_event_gateway_tokens().await;
    if tokens.is_empty() {
        debug!(%effect, "no linked Alexa users");
        return SensorChannelResult {
            success: false,
            message: "No users linked".into(),
            users_triggered: 0,
            total_users: 0,
            reconnect_required: 0,
        };
    }

    let deliveries = join_all(
        tokens
            .iter()
            .map(|token| report_to_user(state, endpoint_id, DetectionState::Detected, token)),
    )
    .await;

    let total_users = deliveries.len();
    let users_triggered = count(&deliveries, UserDelivery::Delivered);
    let reconnect_required = count(&deliveries, UserDelivery::ReconnectRequired);

    let mut message = format!("Triggered {effect} for {users_triggered}/{total_users} users");
    if reconnect_required > 0 {
        message.push_str(&format!("; {reconnect_required} must relink the skill"));
    }

    SensorChannelResult {
        success: users_triggered > 0,
        message,
        users_triggered,
        total_users,
        reconnect_required,
    }
}

/// Report `detection` for `endpoint_id` to every linked user, ignoring individual failures.
async fn broadcast_change(state: &AppState, endpoint_id: &str, detection: DetectionState) {
    let tokens = state.tokens().get_all_event_gateway_tokens().await;
    let deliveries = join_all(
        tokens
            .iter()
            .map(|token| report_to_user(state, endpoint_id, detection, token)),
    )
    .await;
    debug!(
        endpoint_id,
        state = detection.as_str(),
        delivered = count(&deliveries, UserDelivery::Delivered),
        total = deliveries.len(),
        "sensor reset reported"
    );
}

/// Send one change report, refreshing the user's token at most once on a 401.
async fn report_to_user(
    state: &AppState,
    endpoint_id: &str,
    detection: DetectionState,
    access_token: &str,
) -> UserDelivery {
    let event = alexa_service::change_report(endpoint_id, detection, access_token);
    let err = match state.amazon().send_event(access_token, &event).await {
        Ok(()) => return UserDelivery::Delivered,
        Err(err) => err,
    };

    if !err.is_unauthorized() {
        warn!(endpoint_id, error = %err, "change report failed");
        return UserDelivery::Failed;
    }

    let Some(fresh_token) = state.tokens().refresh_access_token(access_token).await else {
        warn!(endpoint_id, "event gateway token expired and could not be refreshed");
        return UserDelivery::ReconnectRequired;
    };

    let event = alexa_service::change_report(endpoint_id, detection, &fresh_token);
    match state.amazon().send_event(&fresh_token, &event).await {
        Ok(()) => {
            debug!(endpoint_id, "change report delivered after token refresh");
            UserDelivery::Delivered
        }
        Err(err) if err.is_unauthorized() => {
            warn!(endpoint_id, "refreshed event gateway token was rejected");
            UserDelivery::ReconnectRequired
        }
        Err(err) => {
            warn!(endpoint_id, error = %err, "change report retry failed");
            UserDelivery::Failed
        }
    }
}

fn count(deliveries: &[UserDelivery], wanted: UserDelivery) -> usize {
    deliveries.iter().filter(|d| **d == wanted).count()
}

/// Removes the effect from the in-flight set when the Maker call ends, however it ends.
struct InFlight<'a> {
    set: &'a DashSet<Effect>,
    effect: Effect,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.effect);
    }
}

/// Fire the `haunted_<effect>` Maker event; no retry.
async fn maker_leg(state: &AppState, effect: Effect) -> ChannelResult {
    if !state.maker().is_configured() {
        return ChannelResult::failed("IFTTT not configured");
    }
    if !state.maker_in_flight().insert(effect) {
        debug!(%effect, "maker call already in flight");
        return ChannelResult::failed("Already in progress");
    }
    let _in_flight = InFlight {
        set: state.maker_in_flight(),
        effect,
    };

    let body: Value = json!({
        "value1": effect.as_str(),
        "value2": MAKER_SOURCE_TAG,
        "value3": now_timestamp(),
    });
    match state
        .maker()
        .trigger(&effect.webhook_event(), &body, MAKER_TIMEOUT)
        .await
    {
        Ok(()) => ChannelResult::ok("IFTTT triggered"),
        Err(err) => {
            warn!(%effect, error = %err, "maker webhook failed");
            ChannelResult::failed(err.to_string())
        }
    }
}

/// Drive every light the session discovered through the light bridge.
async fn lights_leg(state: &AppState, effect: Effect, session_id: Option<&str>) -> ChannelResult {
    let lights = session_id
        .map(|id| state.lights().lights(id))
        .unwrap_or_default();
    if lights.is_empty() {
        return ChannelResult::failed("No lights discovered for this session");
    }
    if !state.light_bridge().is_configured() {
        return ChannelResult::failed("Light bridge not configured");
    }

    let action = LightAction::from(effect);
    let results = join_all(
        lights
            .iter()
            .map(|light| state.light_bridge().apply(light, action)),
    )
    .await;

    let mut controlled = 0;
    for (light, result) in lights.iter().zip(&results) {
        match result {
            Ok(()) => controlled += 1,
            Err(err) => warn!(light = %light.name, error = %err, "light control failed"),
        }
    }

    let message = format!("Controlled {controlled}/{} lights", lights.len());
    if controlled > 0 {
        ChannelResult::ok(message)
    } else {
        ChannelResult::failed(message)
    }
}
