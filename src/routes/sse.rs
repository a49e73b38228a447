use std::convert::Infallible;

use axum::{Router, extract::State, response::sse::Sse, routing::get};
use futures::Stream;
use tracing::info;

use crate::{services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/sse/sensors",
    tag = "sse",
    responses((status = 200, description = "Sensor state transitions", content_type = "text/event-stream", body = String))
)]
/// Stream every sensor transition, starting with the current state of each sensor.
pub async fn sensor_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let (receiver, initial) = sse_service::subscribe_sensors(&state);
    info!("New sensor SSE connection");
    sse_service::to_sse_stream(receiver, initial)
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse/sensors", get(sensor_stream))
}
