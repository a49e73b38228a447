//! Application-level configuration: environment variables and the sensor registry file.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::{
    effect::Effect,
    sensors::{SensorConfig, SensorRegistry},
};

/// Default location on disk where the server looks for sensor overrides.
const DEFAULT_SENSORS_PATH: &str = "config/sensors.json";
/// Environment variable that overrides [`DEFAULT_SENSORS_PATH`].
const SENSORS_PATH_ENV: &str = "HAUNTED_SENSORS_PATH";

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_EVENT_GATEWAY_URL: &str = "https://api.eu.amazonalexa.com/v3/events";
const DEFAULT_LWA_TOKEN_URL: &str = "https://api.amazon.com/auth/o2/token";
const DEFAULT_LWA_TOKENINFO_URL: &str = "https://api.amazon.com/auth/o2/tokeninfo";
const DEFAULT_MAKER_URL: &str = "https://maker.ifttt.com";

/// Credentials and endpoints for the Alexa Smart Home integration.
#[derive(Debug, Clone)]
pub struct AlexaConfig {
    /// Skill messaging client used for the AcceptGrant exchange and token refresh.
    pub client_id: Option<String>,
    /// Secret paired with `client_id`.
    pub client_secret: Option<String>,
    /// Login-with-Amazon client expected as the audience of ReportState bearer tokens.
    pub lwa_client_id: Option<String>,
    /// Secret paired with `lwa_client_id`.
    pub lwa_client_secret: Option<String>,
    /// Endpoint receiving ChangeReport events.
    pub event_gateway_url: String,
    /// Login-with-Amazon token endpoint.
    pub token_url: String,
    /// Login-with-Amazon tokeninfo endpoint.
    pub tokeninfo_url: String,
}

impl Default for AlexaConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            lwa_client_id: None,
            lwa_client_secret: None,
            event_gateway_url: DEFAULT_EVENT_GATEWAY_URL.into(),
            token_url: DEFAULT_LWA_TOKEN_URL.into(),
            tokeninfo_url: DEFAULT_LWA_TOKENINFO_URL.into(),
        }
    }
}

/// Credentials for the IFTTT service endpoints and the Maker Webhooks channel.
#[derive(Debug, Clone)]
pub struct IftttConfig {
    /// Key IFTTT sends in `IFTTT-Service-Key`.
    pub service_key: Option<String>,
    /// OAuth client IFTTT links accounts with.
    pub client_id: Option<String>,
    /// Secret of the OAuth client.
    pub client_secret: Option<String>,
    /// Maker Webhooks key; the Maker channel is off without it.
    pub webhook_key: Option<String>,
    /// Maker Webhooks base URL.
    pub maker_url: String,
}

impl Default for IftttConfig {
    fn default() -> Self {
        Self {
            service_key: None,
            client_id: None,
            client_secret: None,
            webhook_key: None,
            maker_url: DEFAULT_MAKER_URL.into(),
        }
    }
}

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// TCP port the HTTP server binds on all interfaces.
    pub port: u16,
    /// Alexa Smart Home credentials and endpoints.
    pub alexa: AlexaConfig,
    /// IFTTT service and Maker credentials.
    pub ifttt: IftttConfig,
    /// Base URL of the local light-control bridge, when one runs next to the server.
    pub light_bridge_url: Option<String>,
    /// Redis URL for durable token storage; tokens stay in memory without it.
    pub redis_url: Option<String>,
    /// Accepted for deployment compatibility; the server keeps no cookie sessions.
    pub session_secret: Option<String>,
    /// Virtual contact sensors announced to Alexa.
    pub sensors: SensorRegistry,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            alexa: AlexaConfig::default(),
            ifttt: IftttConfig::default(),
            light_bridge_url: None,
            redis_url: None,
            session_secret: None,
            sensors: SensorRegistry::default(),
        }
    }
}

impl AppConfig {
    /// Build the configuration from the process environment and the sensor registry file.
    pub fn from_env() -> Self {
        let defaults = AlexaConfig::default();
        let alexa = AlexaConfig {
            client_id: var("ALEXA_CLIENT_ID"),
            client_secret: var("ALEXA_CLIENT_SECRET"),
            lwa_client_id: var("LWA_CLIENT_ID"),
            lwa_client_secret: var("LWA_CLIENT_SECRET"),
            event_gateway_url: var("ALEXA_EVENT_GATEWAY_URL").unwrap_or(defaults.event_gateway_url),
            token_url: var("LWA_TOKEN_URL").unwrap_or(defaults.token_url),
            tokeninfo_url: var("LWA_TOKENINFO_URL").unwrap_or(defaults.tokeninfo_url),
        };

        let ifttt = IftttConfig {
            service_key: var("IFTTT_SERVICE_KEY"),
            client_id: var("IFTTT_CLIENT_ID"),
            client_secret: var("IFTTT_CLIENT_SECRET"),
            webhook_key: var("IFTTT_WEBHOOK_KEY"),
            maker_url: var("IFTTT_MAKER_URL").unwrap_or_else(|| DEFAULT_MAKER_URL.into()),
        };

        let port = var("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        Self {
            port,
            alexa,
            ifttt,
            light_bridge_url: var("LIGHT_BRIDGE_URL"),
            redis_url: var("REDIS_URL"),
            session_secret: var("SESSION_SECRET"),
            sensors: load_sensor_registry(),
        }
    }
}

/// Read a non-empty environment variable.
fn var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Load the sensor registry from disk, falling back to the built-in sensors.
pub fn load_sensor_registry() -> SensorRegistry {
    let path = resolve_sensors_path();
    match fs::read_to_string(&path) {
        Ok(contents) => match parse_sensor_registry(&contents) {
            Ok(registry) => {
                info!(
                    path = %path.display(),
                    count = registry.len(),
                    "loaded sensor registry from config"
                );
                registry
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to parse sensor registry; falling back to defaults"
                );
                SensorRegistry::default()
            }
        },
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!(
                path = %path.display(),
                "sensor registry not found; using built-in sensors"
            );
            SensorRegistry::default()
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "failed to read sensor registry; falling back to defaults"
            );
            SensorRegistry::default()
        }
    }
}

/// Parse the JSON registry, rejecting files that break the one-endpoint-per-effect rule.
fn parse_sensor_registry(contents: &str) -> Result<SensorRegistry, String> {
    let raw: RawRegistry = serde_json::from_str(contents).map_err(|err| err.to_string())?;
    let sensors: Vec<SensorConfig> = raw.sensors.into_iter().map(Into::into).collect();
    let registry = SensorRegistry::new(sensors);

    if let Some(missing) = Effect::ALL
        .iter()
        .find(|effect| registry.sensor_for(**effect).is_none())
    {
        return Err(format!("no sensor configured for effect `{missing}`"));
    }
    if !registry.has_unique_endpoints() {
        return Err("sensor endpoint ids must be unique".into());
    }
    Ok(registry)
}

#[derive(Debug, Deserialize)]
/// JSON representation of the registry file located at [`DEFAULT_SENSORS_PATH`].
struct RawRegistry {
    sensors: Vec<RawSensor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSensor {
    effect: Effect,
    endpoint_id: String,
    friendly_name: String,
    #[serde(default)]
    description: String,
}

impl From<RawSensor> for SensorConfig {
    fn from(value: RawSensor) -> Self {
        Self {
            effect: value.effect,
            endpoint_id: value.endpoint_id,
            friendly_name: value.friendly_name,
            description: value.description,
        }
    }
}

/// Resolve the registry path taking the environment override into account.
fn resolve_sensors_path() -> PathBuf {
    env::var_os(SENSORS_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SENSORS_PATH))
}
