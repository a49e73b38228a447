/// Alexa Smart Home directives and Event Gateway change reports.
pub mod alexa_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Multi-channel effect dispatcher.
pub mod effect_service;
/// Health check service.
pub mod health_service;
/// IFTTT service protocol endpoints.
pub mod ifttt_service;
/// Per-session light registration.
pub mod lights_service;
/// Authorization-code grant for the IFTTT service.
pub mod oauth_service;
/// Server-Sent Events streaming of sensor transitions.
pub mod sse_service;
/// Event Gateway token bookkeeping.
pub mod token_manager;
/// Background connection and health watch of the durable token store.
pub mod token_store_supervisor;
