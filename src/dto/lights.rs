use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::validation::validate_light_address,
    state::lights::{DiscoveredLight, LightKind},
};

/// Lights found by a discovery scan for one browser session.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RegisterLightsRequest {
    /// At most 32 lights.
    #[validate(length(max = 32), nested)]
    pub lights: Vec<LightInput>,
}

/// One light as reported by the browser's discovery scan.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LightInput {
    /// Device family.
    #[serde(rename = "type")]
    pub kind: LightKind,
    /// IP address for Tapo lights, cloud device id for Tuya lights.
    pub address: String,
    /// Display name, 1 to 64 characters.
    pub name: String,
}

impl Validate for LightInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_light_address(self.kind, &self.address) {
            errors.add("address", e);
        }

        if self.name.trim().is_empty() || self.name.len() > 64 {
            let mut err = validator::ValidationError::new("light_name_length");
            err.message = Some("Light name must be between 1 and 64 characters".into());
            errors.add("name", err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl From<LightInput> for DiscoveredLight {
    fn from(input: LightInput) -> Self {
        Self {
            kind: input.kind,
            address: input.address.trim().to_string(),
            name: input.name.trim().to_string(),
        }
    }
}

/// Lights known for a session.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LightsResponse {
    /// Session the lights belong to.
    pub session_id: String,
    /// Lights from the latest discovery.
    pub lights: Vec<DiscoveredLight>,
}
