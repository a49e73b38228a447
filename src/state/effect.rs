use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use utoipa::ToSchema;

/// Haunted-house effects that can be fired from the video cue player or external integrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ToSchema)]
#[schema(as = String, example = "flash_red")]
pub enum Effect {
    /// Lights off.
    Blackout,
    /// Lights flash red.
    FlashRed,
    /// Smart plug on.
    PlugOn,
    /// Everything back to normal.
    Reset,
}

/// Raised when an incoming effect name does not match any known effect.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown effect: {0}")]
pub struct UnknownEffect(pub String);

impl Effect {
    /// Every effect in registry order.
    pub const ALL: [Effect; 4] = [
        Effect::Blackout,
        Effect::FlashRed,
        Effect::PlugOn,
        Effect::Reset,
    ];

    /// Canonical snake_case name used in responses, webhook event names and the IFTTT feed.
    pub fn as_str(self) -> &'static str {
        match self {
            Effect::Blackout => "blackout",
            Effect::FlashRed => "flash_red",
            Effect::PlugOn => "plug_on",
            Effect::Reset => "reset",
        }
    }

    /// Maker Webhooks event name fired for this effect.
    pub fn webhook_event(self) -> String {
        format!("haunted_{}", self.as_str())
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Effect {
    type Err = UnknownEffect;

    /// Accepts both the snake_case and the legacy hyphenated spellings, case-insensitively.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "blackout" => Ok(Effect::Blackout),
            "flash_red" => Ok(Effect::FlashRed),
            "plug_on" => Ok(Effect::PlugOn),
            "reset" => Ok(Effect::Reset),
            _ => Err(UnknownEffect(raw.to_string())),
        }
    }
}

impl Serialize for Effect {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Effect {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_spellings() {
        assert_eq!("flash_red".parse::<Effect>(), Ok(Effect::FlashRed));
        assert_eq!("flash-red".parse::<Effect>(), Ok(Effect::FlashRed));
        assert_eq!("Plug-On".parse::<Effect>(), Ok(Effect::PlugOn));
        assert_eq!(" blackout ".parse::<Effect>(), Ok(Effect::Blackout));
    }

    #[test]
    fn rejects_unknown_names() {
        let err = "explode".parse::<Effect>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown effect: explode");
        assert!("".parse::<Effect>().is_err());
        assert!("flash__red".parse::<Effect>().is_err());
    }

    #[test]
    fn webhook_event_uses_canonical_name() {
        assert_eq!(Effect::FlashRed.webhook_event(), "haunted_flash_red");
        assert_eq!(
            serde_json::to_string(&Effect::PlugOn).unwrap(),
            "\"plug_on\""
        );
    }
}
