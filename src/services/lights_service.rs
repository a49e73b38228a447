use tracing::info;

use crate::{
    dto::lights::{LightsResponse, RegisterLightsRequest},
    error::ServiceError,
    state::{SharedState, lights::DiscoveredLight},
};

/// Replace the lights a browser session discovered.
pub fn register_lights(
    state: &SharedState,
    session_id: &str,
    request: RegisterLightsRequest,
) -> LightsResponse {
    let lights: Vec<DiscoveredLight> = request.lights.into_iter().map(Into::into).collect();
    info!(session_id, count = lights.len(), "lights registered for session");
    state.lights().replace(session_id, lights.clone());
    LightsResponse {
        session_id: session_id.to_string(),
        lights,
    }
}

/// Lights known for `session_id`.
pub fn session_lights(state: &SharedState, session_id: &str) -> LightsResponse {
    LightsResponse {
        session_id: session_id.to_string(),
        lights: state.lights().lights(session_id),
    }
}

/// Forget a session's lights once the browser session ends.
pub fn end_session(state: &SharedState, session_id: &str) -> Result<(), ServiceError> {
    if state.lights().end(session_id) {
        info!(session_id, "light session ended");
        Ok(())
    } else {
        Err(ServiceError::NotFound(format!(
            "no lights registered for session {session_id}"
        )))
    }
}
