/// Effect catalogue.
pub mod effect;
/// Effect feed polled by IFTTT.
pub mod ifttt;
/// Per-session light cache.
pub mod lights;
/// OAuth grants for IFTTT.
pub mod oauth;
/// Virtual contact sensors.
pub mod sensors;
mod sse;

use std::sync::Arc;

use dashmap::DashSet;
use reqwest::Client;
use time::OffsetDateTime;
use tokio::time::Instant;

use crate::{
    clients::{
        amazon::AmazonClient,
        error::{ClientError, ClientResult},
        light_bridge::LightBridgeClient,
        maker::MakerClient,
    },
    config::AppConfig,
    services::token_manager::TokenManager,
    state::{
        effect::Effect, ifttt::EffectFeed, lights::LightSessions, oauth::OAuthGrants,
        sensors::SensorBoard,
    },
};

pub use self::sse::SseHub;

/// State shared by every handler.
pub type SharedState = Arc<AppState>;

const SENSOR_EVENT_CAPACITY: usize = 32;

/// State shared by every handler, built once at startup and injected through axum's `State`.
pub struct AppState {
    config: AppConfig,
    sensors: SensorBoard,
    tokens: TokenManager,
    amazon: AmazonClient,
    maker: MakerClient,
    light_bridge: LightBridgeClient,
    effect_feed: EffectFeed,
    oauth: OAuthGrants,
    lights: LightSessions,
    maker_in_flight: DashSet<Effect>,
    started_at: Instant,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig) -> ClientResult<SharedState> {
        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ClientError::ClientBuilder { source })?;

        let amazon = AmazonClient::new(http.clone(), config.alexa.clone());
        let maker = MakerClient::new(
            http.clone(),
            config.ifttt.maker_url.clone(),
            config.ifttt.webhook_key.clone(),
        );
        let light_bridge = LightBridgeClient::new(http, config.light_bridge_url.clone());
        let sensors = SensorBoard::new(&config.sensors, SseHub::new(SENSOR_EVENT_CAPACITY));

        Ok(Arc::new(Self {
            sensors,
            tokens: TokenManager::new(amazon.clone()),
            amazon,
            maker,
            light_bridge,
            effect_feed: EffectFeed::new(OffsetDateTime::now_utc()),
            oauth: OAuthGrants::new(),
            lights: LightSessions::new(),
            maker_in_flight: DashSet::new(),
            started_at: Instant::now(),
            config,
        }))
    }

    /// Configuration loaded at startup.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Live detection state of every virtual contact sensor.
    pub fn sensors(&self) -> &SensorBoard {
        &self.sensors
    }

    /// Event Gateway tokens of every linked Alexa user.
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Login-with-Amazon and Event Gateway client.
    pub fn amazon(&self) -> &AmazonClient {
        &self.amazon
    }

    /// IFTTT Maker Webhooks client.
    pub fn maker(&self) -> &MakerClient {
        &self.maker
    }

    /// Local light bridge client.
    pub fn light_bridge(&self) -> &LightBridgeClient {
        &self.light_bridge
    }

    /// Dispatched effects served to the IFTTT polling trigger.
    pub fn effect_feed(&self) -> &EffectFeed {
        &self.effect_feed
    }

    /// OAuth codes and tokens issued to IFTTT.
    pub fn oauth(&self) -> &OAuthGrants {
        &self.oauth
    }

    /// Lights discovered by each browser session.
    pub fn lights(&self) -> &LightSessions {
        &self.lights
    }

    /// Effects with a Maker Webhooks call currently in flight.
    pub fn maker_in_flight(&self) -> &DashSet<Effect> {
        &self.maker_in_flight
    }

    /// Time since startup.
    pub fn uptime(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Stop background work tied to the state before the process exits.
    pub fn shutdown(&self) {
        self.sensors.cancel_pending_resets();
    }
}
