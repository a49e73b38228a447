use axum::Router;

use crate::state::SharedState;

/// Alexa Smart Home skill endpoint.
pub mod alexa;
/// Swagger UI.
pub mod docs;
/// Body extractors with per-surface rejections.
pub mod extract;
/// Health checks.
pub mod health;
/// IFTTT service protocol.
pub mod ifttt;
/// Light discovery cache.
pub mod lights;
/// OAuth account linking for IFTTT.
pub mod oauth;
/// Sensor state stream.
pub mod sse;
/// Effect triggers.
pub mod triggers;

/// Compose every surface router and bind the shared state.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(alexa::router())
        .merge(triggers::router())
        .merge(ifttt::router())
        .merge(oauth::router())
        .merge(lights::router())
        .merge(docs::router());

    api_router.with_state(state)
}
