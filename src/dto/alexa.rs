//! Alexa Smart Home directive and event envelopes (payload version 3).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;

/// Smart Home payload version sent on every event.
pub const PAYLOAD_VERSION: &str = "3";

/// Top-level body Alexa posts to the skill endpoint.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AlexaRequest {
    /// The directive itself.
    pub directive: Directive,
}

/// Directive envelope: header, optional endpoint, free-form payload.
#[derive(Debug, Deserialize, ToSchema)]
pub struct Directive {
    /// Routing information.
    pub header: DirectiveHeader,
    /// Target endpoint; absent for discovery and authorization.
    #[serde(default)]
    pub endpoint: Option<DirectiveEndpoint>,
    /// Interface-specific payload.
    #[serde(default)]
    pub payload: Value,
}

/// Directive header.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveHeader {
    /// Interface namespace, e.g. `Alexa.Discovery`.
    pub namespace: String,
    /// Directive name, e.g. `Discover`.
    pub name: String,
    /// Echoed back in responses.
    #[serde(default)]
    pub message_id: String,
    /// Echoed back in responses when present.
    #[serde(default)]
    pub correlation_token: Option<String>,
}

/// Endpoint addressed by a directive or an event.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveEndpoint {
    /// Endpoint id announced during discovery.
    pub endpoint_id: String,
    /// Bearer credential of the caller.
    #[serde(default)]
    pub scope: Option<Scope>,
    /// Opaque data announced during discovery.
    #[serde(default)]
    pub cookie: Option<Value>,
}

/// Bearer scope carried by directives and Event Gateway events.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Scope {
    /// Always `BearerToken`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The bearer token.
    pub token: String,
}

impl Scope {
    /// `BearerToken` scope for `token`.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            kind: "BearerToken".into(),
            token: token.into(),
        }
    }
}

/// Payload of an `Alexa.Authorization` / `AcceptGrant` directive.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AcceptGrantPayload {
    /// Authorization code to exchange with Login-with-Amazon.
    pub grant: Grant,
    /// User the grant belongs to.
    pub grantee: Grantee,
}

/// Grant half of an AcceptGrant payload.
#[derive(Debug, Deserialize, ToSchema)]
pub struct Grant {
    /// Authorization code.
    pub code: String,
}

/// Grantee half of an AcceptGrant payload.
#[derive(Debug, Deserialize, ToSchema)]
pub struct Grantee {
    /// Token identifying the linked user.
    pub token: String,
}

/// Any event sent back to Alexa, either as a response or through the Event Gateway.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct AlexaResponse {
    /// The event.
    pub event: AlexaEvent,
    /// Property states, for state reports and change reports.
    pub context: Option<AlexaContext>,
}

/// Event envelope: header, optional endpoint, payload.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct AlexaEvent {
    /// Routing information.
    pub header: EventHeader,
    /// Endpoint the event is about.
    pub endpoint: Option<DirectiveEndpoint>,
    /// Interface-specific payload.
    pub payload: Value,
}

/// Event header.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventHeader {
    /// Interface namespace.
    pub namespace: String,
    /// Event name, e.g. `ChangeReport`.
    pub name: String,
    /// Echo of the directive's message id, or a fresh UUID.
    pub message_id: String,
    /// Always [`PAYLOAD_VERSION`].
    pub payload_version: String,
    /// Echo of the directive's correlation token.
    pub correlation_token: Option<String>,
}

impl EventHeader {
    /// Header at [`PAYLOAD_VERSION`] without a correlation token.
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        message_id: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            message_id: message_id.into(),
            payload_version: PAYLOAD_VERSION.into(),
            correlation_token: None,
        }
    }

    /// Attach the directive's correlation token, if any.
    pub fn with_correlation_token(mut self, token: Option<String>) -> Self {
        self.correlation_token = token;
        self
    }
}

/// Context of a response or change report.
#[derive(Debug, Serialize, ToSchema)]
pub struct AlexaContext {
    /// Current property values.
    pub properties: Vec<PropertyState>,
}

/// Reported value of one capability property.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PropertyState {
    /// Interface owning the property.
    pub namespace: String,
    /// Property name.
    pub name: String,
    /// Property value.
    pub value: Value,
    /// ISO-8601 time the value was read.
    pub time_of_sample: String,
    /// How stale the value may be.
    pub uncertainty_in_milliseconds: u32,
}

/// One virtual device announced during discovery.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryEndpoint {
    /// Stable id of the virtual sensor.
    pub endpoint_id: String,
    /// Shown in the Alexa app.
    pub manufacturer_name: String,
    /// Name used in routines.
    pub friendly_name: String,
    /// Shown in the Alexa app.
    pub description: String,
    /// Device categories, `CONTACT_SENSOR` here.
    pub display_categories: Vec<String>,
    /// Interfaces the endpoint implements.
    pub capabilities: Vec<Capability>,
}

/// One interface an endpoint implements.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct Capability {
    /// Always `AlexaInterface`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Interface name, e.g. `Alexa.ContactSensor`.
    pub interface: String,
    /// Interface version.
    pub version: String,
    /// Reported properties, when the interface has any.
    pub properties: Option<CapabilityProperties>,
}

impl Capability {
    /// Interface at [`PAYLOAD_VERSION`], proactively reporting `supported` when given.
    pub fn interface(interface: &str, supported: Option<&str>) -> Self {
        Self {
            kind: "AlexaInterface".into(),
            interface: interface.into(),
            version: PAYLOAD_VERSION.into(),
            properties: supported.map(|name| CapabilityProperties {
                supported: vec![SupportedProperty { name: name.into() }],
                proactively_reported: true,
                retrievable: true,
            }),
        }
    }
}

/// Reporting behaviour of an interface's properties.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityProperties {
    /// Properties the interface exposes.
    pub supported: Vec<SupportedProperty>,
    /// Whether changes are pushed through the Event Gateway.
    pub proactively_reported: bool,
    /// Whether ReportState can read the property.
    pub retrievable: bool,
}

/// Name of one supported property.
#[derive(Debug, Serialize, ToSchema)]
pub struct SupportedProperty {
    /// Property name.
    pub name: String,
}

/// Error body for directives the skill does not handle or callers it cannot authenticate.
#[derive(Debug, Serialize, ToSchema)]
pub struct AlexaErrorBody {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable detail.
    pub message: String,
}
