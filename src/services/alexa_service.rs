//! Alexa Smart Home skill: discovery, state reports, account-linking grants and the change
//! reports pushed through the Event Gateway.

use serde_json::json;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        alexa::{
            AcceptGrantPayload, AlexaContext, AlexaEvent, AlexaRequest, AlexaResponse, Capability,
            Directive, DirectiveEndpoint, DiscoveryEndpoint, EventHeader, PropertyState, Scope,
        },
        format_timestamp,
    },
    error::AlexaError,
    state::{SharedState, sensors::DetectionState},
};

const MANUFACTURER_NAME: &str = "Haunted House";
const CONTACT_SENSOR_CATEGORY: &str = "CONTACT_SENSOR";

/// Route a directive posted to the skill endpoint.
///
/// `authorization` is the raw `Authorization` header, used for ReportState when the directive
/// carries no endpoint scope.
pub async fn handle_directive(
    state: &SharedState,
    request: AlexaRequest,
    authorization: Option<&str>,
) -> Result<AlexaResponse, AlexaError> {
    let directive = request.directive;
    let namespace = directive.header.namespace.clone();
    let name = directive.header.name.clone();
    info!(%namespace, %name, "alexa directive received");

    match (namespace.as_str(), name.as_str()) {
        ("Alexa.Discovery", "Discover") => Ok(discover(state, &directive)),
        ("Alexa.Discovery", _) => Err(AlexaError::InvalidDirective("Unknown directive".into())),
        ("Alexa", "ReportState") => report_state(state, directive, authorization).await,
        ("Alexa.Authorization", "AcceptGrant") => accept_grant(state, directive).await,
        _ => Err(AlexaError::UnsupportedOperation {
            namespace: namespace.clone(),
            name: name.clone(),
        }),
    }
}

/// Announce one contact sensor per configured effect. No authentication is required.
pub fn discover(state: &SharedState, directive: &Directive) -> AlexaResponse {
    let endpoints: Vec<DiscoveryEndpoint> = state
        .config()
        .sensors
        .iter()
        .map(|sensor| DiscoveryEndpoint {
            endpoint_id: sensor.endpoint_id.clone(),
            manufacturer_name: MANUFACTURER_NAME.into(),
            friendly_name: sensor.friendly_name.clone(),
            description: sensor.description.clone(),
            display_categories: vec![CONTACT_SENSOR_CATEGORY.into()],
            capabilities: vec![
                Capability::interface("Alexa.ContactSensor", Some("detectionState")),
                Capability::interface("Alexa.EndpointHealth", Some("connectivity")),
                Capability::interface("Alexa", None),
            ],
        })
        .collect();
    info!(count = endpoints.len(), "prepared virtual contact sensors");

    AlexaResponse {
        event: AlexaEvent {
            header: EventHeader::new(
                "Alexa.Discovery",
                "Discover.Response",
                directive.header.message_id.clone(),
            ),
            endpoint: None,
            payload: json!({ "endpoints": endpoints }),
        },
        context: None,
    }
}

/// Answer a ReportState directive with the sensor's current detection state.
///
/// The bearer token is validated through Amazon's tokeninfo endpoint. Unknown endpoints report
/// `NOT_DETECTED`.
pub async fn report_state(
    state: &SharedState,
    directive: Directive,
    authorization: Option<&str>,
) -> Result<AlexaResponse, AlexaError> {
    let endpoint = directive
        .endpoint
        .clone()
        .ok_or_else(|| AlexaError::InvalidDirective("ReportState requires an endpoint".into()))?;

    let token = bearer_token(&endpoint, authorization).ok_or(AlexaError::InvalidAuthorization)?;
    match state.amazon().token_info(&token).await {
        Ok(_) => {}
        Err(err) if err.is_unauthorized() => return Err(AlexaError::InvalidAuthorization),
        Err(err) => {
            warn!(error = %err, "tokeninfo lookup failed");
            return Err(AlexaError::Internal("token validation unavailable".into()));
        }
    }

    let detection = state.sensors().state(&endpoint.endpoint_id);
    let now = format_timestamp(OffsetDateTime::now_utc());

    Ok(AlexaResponse {
        event: AlexaEvent {
            header: EventHeader::new("Alexa", "StateReport", directive.header.message_id)
                .with_correlation_token(directive.header.correlation_token),
            endpoint: Some(endpoint),
            payload: json!({}),
        },
        context: Some(AlexaContext {
            properties: vec![
                detection_property(detection, now.clone()),
                PropertyState {
                    namespace: "Alexa.EndpointHealth".into(),
                    name: "connectivity".into(),
                    value: json!({ "value": "OK" }),
                    time_of_sample: now,
                    uncertainty_in_milliseconds: 0,
                },
            ],
        }),
    })
}

/// Exchange an AcceptGrant code for Event Gateway tokens and store them for the grantee.
pub async fn accept_grant(
    state: &SharedState,
    directive: Directive,
) -> Result<AlexaResponse, AlexaError> {
    let message_id = directive.header.message_id.clone();
    let failed = || AlexaError::AcceptGrantFailed {
        message_id: message_id.clone(),
    };

    if directive.header.name != "AcceptGrant" {
        warn!(name = %directive.header.name, "grant handler received another directive");
        return Err(failed());
    }
    let payload: AcceptGrantPayload = serde_json::from_value(directive.payload).map_err(|err| {
        warn!(error = %err, "malformed AcceptGrant payload");
        failed()
    })?;

    info!("exchanging grant code for event gateway access");
    let tokens = state
        .amazon()
        .exchange_grant_code(&payload.grant.code)
        .await
        .map_err(|err| {
            warn!(error = %err, "grant code exchange failed");
            failed()
        })?;

    state
        .tokens()
        .store_event_gateway_token(
            &payload.grantee.token,
            &tokens.access_token,
            tokens.refresh_token,
        )
        .await;

    Ok(AlexaResponse {
        event: AlexaEvent {
            header: EventHeader::new("Alexa.Authorization", "AcceptGrant.Response", message_id),
            endpoint: None,
            payload: json!({}),
        },
        context: None,
    })
}

/// Build the proactive ChangeReport sent to the Event Gateway for one user.
pub fn change_report(
    endpoint_id: &str,
    detection: DetectionState,
    access_token: &str,
) -> AlexaResponse {
    let now = format_timestamp(OffsetDateTime::now_utc());
    AlexaResponse {
        event: AlexaEvent {
            header: EventHeader::new("Alexa", "ChangeReport", Uuid::new_v4().to_string()),
            endpoint: Some(DirectiveEndpoint {
                endpoint_id: endpoint_id.to_string(),
                scope: Some(Scope::bearer(access_token)),
                cookie: None,
            }),
            payload: json!({
                "change": {
                    "cause": { "type": "PHYSICAL_INTERACTION" },
                    "properties": [detection_property(detection, now)],
                }
            }),
        },
        context: None,
    }
}

fn detection_property(detection: DetectionState, time_of_sample: String) -> PropertyState {
    PropertyState {
        namespace: "Alexa.ContactSensor".into(),
        name: "detectionState".into(),
        value: json!(detection.as_str()),
        time_of_sample,
        uncertainty_in_milliseconds: 0,
    }
}

/// Bearer token from the endpoint scope, falling back to the `Authorization` header.
fn bearer_token(endpoint: &DirectiveEndpoint, authorization: Option<&str>) -> Option<String> {
    if let Some(scope) = &endpoint.scope {
        if !scope.token.is_empty() {
            return Some(scope.token.clone());
        }
    }
    authorization
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_report_carries_scope_and_detection_state() {
        let report = change_report(
            "haunted-blackout-sensor",
            DetectionState::Detected,
            "access-a",
        );
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["event"]["header"]["name"], "ChangeReport");
        assert_eq!(value["event"]["header"]["payloadVersion"], "3");
        assert_eq!(value["event"]["endpoint"]["scope"]["token"], "access-a");
        let property = &value["event"]["payload"]["change"]["properties"][0];
        assert_eq!(property["namespace"], "Alexa.ContactSensor");
        assert_eq!(property["value"], "DETECTED");
        assert!(value.get("context").is_none());
    }

    #[test]
    fn bearer_prefers_endpoint_scope() {
        let endpoint = DirectiveEndpoint {
            endpoint_id: "haunted-reset-sensor".into(),
            scope: Some(Scope::bearer("from-scope")),
            cookie: None,
        };
        assert_eq!(
            bearer_token(&endpoint, Some("Bearer from-header")).as_deref(),
            Some("from-scope")
        );

        let bare = DirectiveEndpoint {
            scope: None,
            ..endpoint
        };
        assert_eq!(
            bearer_token(&bare, Some("Bearer from-header")).as_deref(),
            Some("from-header")
        );
        assert_eq!(bearer_token(&bare, Some("Basic abc")), None);
        assert_eq!(bearer_token(&bare, None), None);
    }
}
