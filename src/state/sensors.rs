//! Virtual contact sensors backing the Alexa integration and their live detection state.

use std::{collections::BTreeMap, future::Future, sync::Arc, time::Duration};

use dashmap::DashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::{task::JoinHandle, time::sleep};
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::{
    dto::sse::{SensorChangedEvent, ServerEvent},
    state::{effect::Effect, sse::SseHub},
};

/// Delay after which a triggered sensor falls back to `NOT_DETECTED`.
pub const SENSOR_RESET_DELAY: Duration = Duration::from_millis(2_000);

/// SSE event name carrying [`SensorChangedEvent`] payloads.
pub const EVENT_SENSOR_CHANGED: &str = "sensor.changed";

/// Static description of the virtual contact sensor mapped to one effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SensorConfig {
    /// Effect the sensor reports.
    pub effect: Effect,
    /// Stable Alexa endpoint id.
    pub endpoint_id: String,
    /// Name used in Alexa routines.
    pub friendly_name: String,
    /// Shown in the Alexa app.
    pub description: String,
}

/// Immutable effect → sensor mapping, loaded once at startup.
#[derive(Debug, Clone)]
pub struct SensorRegistry {
    sensors: IndexMap<Effect, SensorConfig>,
}

impl SensorRegistry {
    /// Build a registry from explicit sensor definitions, keeping the last definition per effect.
    pub fn new(sensors: impl IntoIterator<Item = SensorConfig>) -> Self {
        let sensors = sensors
            .into_iter()
            .map(|sensor| (sensor.effect, sensor))
            .collect();
        Self { sensors }
    }

    /// Sensor mapped to `effect`, if any.
    pub fn sensor_for(&self, effect: Effect) -> Option<&SensorConfig> {
        self.sensors.get(&effect)
    }

    /// Sensor owning `endpoint_id`, if any.
    pub fn by_endpoint(&self, endpoint_id: &str) -> Option<&SensorConfig> {
        self.sensors
            .values()
            .find(|sensor| sensor.endpoint_id == endpoint_id)
    }

    /// Sensors in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &SensorConfig> {
        self.sensors.values()
    }

    /// Number of configured sensors.
    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    /// Whether no sensor is configured.
    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// Check that no two effects share the same endpoint identifier.
    pub fn has_unique_endpoints(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.sensors
            .values()
            .all(|sensor| seen.insert(sensor.endpoint_id.as_str()))
    }
}

impl Default for SensorRegistry {
    fn default() -> Self {
        Self::new(default_sensors())
    }
}

/// Built-in sensors shipped with the binary.
pub fn default_sensors() -> Vec<SensorConfig> {
    vec![
        SensorConfig {
            effect: Effect::Blackout,
            endpoint_id: "haunted-blackout-sensor".into(),
            friendly_name: "Blackout Trigger".into(),
            description: "Contact sensor for blackout effect - use in routines".into(),
        },
        SensorConfig {
            effect: Effect::FlashRed,
            endpoint_id: "haunted-flash-red-sensor".into(),
            friendly_name: "Red Flash Trigger".into(),
            description: "Contact sensor for red flash effect - use in routines".into(),
        },
        SensorConfig {
            effect: Effect::PlugOn,
            endpoint_id: "haunted-plug-on-sensor".into(),
            friendly_name: "Plug On Trigger".into(),
            description: "Contact sensor for plug on effect - use in routines".into(),
        },
        SensorConfig {
            effect: Effect::Reset,
            endpoint_id: "haunted-reset-sensor".into(),
            friendly_name: "Reset Trigger".into(),
            description: "Contact sensor for reset effect - use in routines".into(),
        },
    ]
}

/// Alexa `ContactSensor.detectionState` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectionState {
    /// Contact open; the effect is running.
    Detected,
    /// Contact closed.
    NotDetected,
}

impl DetectionState {
    /// Wire value, e.g. `NOT_DETECTED`.
    pub fn as_str(self) -> &'static str {
        match self {
            DetectionState::Detected => "DETECTED",
            DetectionState::NotDetected => "NOT_DETECTED",
        }
    }
}

struct SensorSlot {
    state: DetectionState,
    generation: u64,
    pending_reset: Option<JoinHandle<()>>,
}

impl SensorSlot {
    fn idle() -> Self {
        Self {
            state: DetectionState::NotDetected,
            generation: 0,
            pending_reset: None,
        }
    }
}

/// Live detection state per sensor endpoint, including the pending reset timer of each sensor.
///
/// Cloning is cheap: clones share the same underlying map and event hub.
#[derive(Clone)]
pub struct SensorBoard {
    slots: Arc<DashMap<String, SensorSlot>>,
    events: SseHub,
}

impl SensorBoard {
    /// Create a board where every registered sensor starts as `NOT_DETECTED`.
    pub fn new(registry: &SensorRegistry, events: SseHub) -> Self {
        let slots = DashMap::new();
        for sensor in registry.iter() {
            slots.insert(sensor.endpoint_id.clone(), SensorSlot::idle());
        }
        Self {
            slots: Arc::new(slots),
            events,
        }
    }

    /// Current state of `endpoint_id`, `NOT_DETECTED` when the endpoint is unknown.
    pub fn state(&self, endpoint_id: &str) -> DetectionState {
        self.slots
            .get(endpoint_id)
            .map(|slot| slot.state)
            .unwrap_or(DetectionState::NotDetected)
    }

    /// Snapshot of every known sensor state keyed by endpoint identifier.
    pub fn snapshot(&self) -> BTreeMap<String, DetectionState> {
        self.slots
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().state))
            .collect()
    }

    /// Mark `endpoint_id` as `DETECTED` and schedule its reset after `delay`.
    ///
    /// A pending reset from an earlier trigger of the same sensor is cancelled and replaced.
    /// Once the reset has flipped the state back, `on_reset` runs (used to push the
    /// `NOT_DETECTED` change report).
    pub fn trigger<F, Fut>(&self, endpoint_id: &str, delay: Duration, on_reset: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let generation = {
            let mut slot = self
                .slots
                .entry(endpoint_id.to_string())
                .or_insert_with(SensorSlot::idle);
            if let Some(previous) = slot.pending_reset.take() {
                debug!(endpoint_id, "replacing pending sensor reset");
                previous.abort();
            }
            slot.state = DetectionState::Detected;
            slot.generation += 1;
            slot.generation
        };
        self.publish(endpoint_id, DetectionState::Detected);

        let board = self.clone();
        let endpoint = endpoint_id.to_string();
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            if board.reset_if_current(&endpoint, generation) {
                on_reset().await;
            }
        });

        if let Some(mut slot) = self.slots.get_mut(endpoint_id) {
            if slot.generation == generation && !handle.is_finished() {
                slot.pending_reset = Some(handle);
            }
        }
    }

    /// Cancel every pending reset, leaving states untouched.
    pub fn cancel_pending_resets(&self) {
        for mut slot in self.slots.iter_mut() {
            if let Some(handle) = slot.pending_reset.take() {
                handle.abort();
            }
        }
    }

    /// Whether a reset timer is currently scheduled for `endpoint_id`.
    pub fn has_pending_reset(&self, endpoint_id: &str) -> bool {
        self.slots
            .get(endpoint_id)
            .is_some_and(|slot| slot.pending_reset.is_some())
    }

    /// Subscribe-able hub carrying every sensor transition.
    pub fn events(&self) -> &SseHub {
        &self.events
    }

    fn reset_if_current(&self, endpoint_id: &str, generation: u64) -> bool {
        {
            let Some(mut slot) = self.slots.get_mut(endpoint_id) else {
                return false;
            };
            if slot.generation != generation {
                return false;
            }
            slot.state = DetectionState::NotDetected;
            // Detach rather than abort: this is the task currently running.
            slot.pending_reset.take();
        }
        self.publish(endpoint_id, DetectionState::NotDetected);
        true
    }

    fn publish(&self, endpoint_id: &str, state: DetectionState) {
        let payload = SensorChangedEvent {
            endpoint_id: endpoint_id.to_string(),
            state,
        };
        match ServerEvent::json(Some(EVENT_SENSOR_CHANGED.to_string()), &payload) {
            Ok(event) => self.events.broadcast(event),
            Err(err) => warn!(error = %err, "failed to serialise sensor event"),
        }
    }
}
