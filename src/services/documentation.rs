use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Haunted House Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::health::debug_health,
        crate::routes::health::debug_tokens,
        crate::routes::sse::sensor_stream,
        crate::routes::alexa::smarthome,
        crate::routes::alexa::handle_grant,
        crate::routes::triggers::trigger_direct,
        crate::routes::triggers::trigger,
        crate::routes::triggers::sensor_states,
        crate::routes::ifttt::status,
        crate::routes::ifttt::test_setup,
        crate::routes::ifttt::user_info,
        crate::routes::ifttt::run_effect,
        crate::routes::ifttt::effect_requested,
        crate::routes::oauth::authorize,
        crate::routes::oauth::token,
        crate::routes::lights::register_lights,
        crate::routes::lights::session_lights,
        crate::routes::lights::end_session,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::sse::SensorChangedEvent,
            crate::state::effect::Effect,
            crate::state::sensors::DetectionState,
            crate::state::sensors::SensorConfig,
            crate::state::lights::DiscoveredLight,
        )
    ),
    tags(
        (name = "health", description = "Health check and debug endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "alexa", description = "Alexa Smart Home skill"),
        (name = "triggers", description = "Effect triggers used by the cue player"),
        (name = "ifttt", description = "IFTTT service protocol"),
        (name = "oauth", description = "Account linking for the IFTTT service"),
        (name = "lights", description = "Lights discovered per browser session"),
    )
)]
/// OpenAPI document of every route.
pub struct ApiDoc;
