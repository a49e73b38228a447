//! Library crate for haunted-house-back, exposing modules for binaries and integration tests.

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Outbound HTTP clients.
pub mod clients;
/// Environment configuration.
pub mod config;
/// Token persistence.
pub mod dao;
/// Wire payloads.
pub mod dto;
/// Error types and their HTTP rendering.
pub mod error;
/// HTTP routes.
pub mod routes;
/// Business logic behind the routes.
pub mod services;
/// Shared application state.
pub mod state;

/// Build the top-level router and attach cross-cutting middleware layers.
pub fn build_router(state: state::SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
