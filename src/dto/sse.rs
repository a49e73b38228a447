use serde::Serialize;
use utoipa::ToSchema;

use crate::state::sensors::DetectionState;

#[derive(Clone, Debug)]
/// Named SSE event with a pre-rendered JSON data field.
pub struct ServerEvent {
    /// Event name; unnamed events arrive as `message`.
    pub event: Option<String>,
    /// JSON payload.
    pub data: String,
}

impl ServerEvent {
    /// Serialise `payload` into the data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Event emitted whenever a virtual contact sensor changes state.
pub struct SensorChangedEvent {
    /// Sensor that changed.
    pub endpoint_id: String,
    /// Its new state.
    pub state: DetectionState,
}
