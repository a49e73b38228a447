//! Per-session cache of lights discovered on the local network.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Sessions idle for longer than this are forgotten.
pub const LIGHT_SESSION_TTL: Duration = Duration::from_secs(12 * 60 * 60);
/// Upper bound on remembered sessions; the least recently updated one is evicted beyond it.
pub const MAX_LIGHT_SESSIONS: usize = 256;

/// Local light families the bridge knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LightKind {
    /// TP-Link Tapo device addressed by LAN IP.
    Tapo,
    /// Tuya device addressed by cloud id.
    Tuya,
}

/// A light reported by a discovery scan: an IP address for Tapo devices, a cloud id for Tuya.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DiscoveredLight {
    /// Device family.
    #[serde(rename = "type")]
    pub kind: LightKind,
    /// IP address or cloud id.
    pub address: String,
    /// Display name.
    pub name: String,
}

struct LightSession {
    lights: Vec<DiscoveredLight>,
    updated_at: Instant,
}

/// Session-keyed light cache; entries vanish when the session ends, idles out, or is evicted.
#[derive(Default)]
pub struct LightSessions {
    sessions: DashMap<String, LightSession>,
}

impl LightSessions {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the lights known for `session_id`.
    pub fn replace(&self, session_id: &str, lights: Vec<DiscoveredLight>) {
        let now = Instant::now();
        self.sessions
            .retain(|_, session| now.duration_since(session.updated_at) < LIGHT_SESSION_TTL);
        if !self.sessions.contains_key(session_id) && self.sessions.len() >= MAX_LIGHT_SESSIONS {
            self.evict_stalest();
        }
        self.sessions.insert(
            session_id.to_string(),
            LightSession {
                lights,
                updated_at: now,
            },
        );
    }

    /// Lights known for `session_id`, empty when the session never ran a discovery or idled out.
    pub fn lights(&self, session_id: &str) -> Vec<DiscoveredLight> {
        self.sessions
            .get(session_id)
            .filter(|entry| entry.updated_at.elapsed() < LIGHT_SESSION_TTL)
            .map(|entry| entry.lights.clone())
            .unwrap_or_default()
    }

    /// Drop the session, returning whether it existed.
    pub fn end(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    /// Sessions currently remembered.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn evict_stalest(&self) {
        let stalest = self
            .sessions
            .iter()
            .min_by_key(|entry| entry.updated_at)
            .map(|entry| entry.key().clone());
        if let Some(session_id) = stalest {
            self.sessions.remove(&session_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lamp(address: &str) -> DiscoveredLight {
        DiscoveredLight {
            kind: LightKind::Tapo,
            address: address.into(),
            name: "Porch".into(),
        }
    }

    #[test]
    fn sessions_are_isolated() {
        let sessions = LightSessions::new();
        sessions.replace("a", vec![lamp("192.168.1.20")]);

        assert_eq!(sessions.lights("a").len(), 1);
        assert!(sessions.lights("b").is_empty());
    }

    #[test]
    fn ending_a_session_discards_lights() {
        let sessions = LightSessions::new();
        sessions.replace("a", vec![lamp("192.168.1.20"), lamp("192.168.1.21")]);
        assert!(sessions.end("a"));
        assert!(!sessions.end("a"));
        assert!(sessions.lights("a").is_empty());
        assert_eq!(sessions.session_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_expire() {
        let sessions = LightSessions::new();
        sessions.replace("old", vec![lamp("192.168.1.20")]);
        tokio::time::advance(LIGHT_SESSION_TTL).await;

        assert!(sessions.lights("old").is_empty());
        sessions.replace("new", vec![lamp("192.168.1.21")]);
        assert_eq!(sessions.session_count(), 1);
        assert_eq!(sessions.lights("new").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stalest_session_is_evicted_at_capacity() {
        let sessions = LightSessions::new();
        for i in 0..MAX_LIGHT_SESSIONS {
            sessions.replace(&format!("s{i}"), vec![lamp("192.168.1.20")]);
            tokio::time::advance(Duration::from_millis(1)).await;
        }
        // Updating a known session never evicts.
        sessions.replace("s1", vec![lamp("192.168.1.22")]);
        assert_eq!(sessions.session_count(), MAX_LIGHT_SESSIONS);

        sessions.replace("extra", vec![lamp("192.168.1.21")]);
        assert_eq!(sessions.session_count(), MAX_LIGHT_SESSIONS);
        assert!(sessions.lights("s0").is_empty());
        assert_eq!(sessions.lights("s1")[0].address, "192.168.1.22");
        assert_eq!(sessions.lights("extra").len(), 1);
    }

    #[test]
    fn kind_serialises_as_type() {
        let json = serde_json::to_value(lamp("10.0.0.5")).unwrap();
        assert_eq!(json["type"], "tapo");
        assert_eq!(json["address"], "10.0.0.5");
    }
}
