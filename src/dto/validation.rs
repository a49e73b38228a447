//! Validation helpers for DTOs.

use std::net::IpAddr;

use validator::ValidationError;

use crate::state::lights::LightKind;

/// Validates a light address against its family.
///
/// # Examples
///
/// ```ignore
/// validate_light_address(LightKind::Tapo, "192.168.1.40") // Ok
/// validate_light_address(LightKind::Tapo, "porch-lamp")   // Err - not an IP
/// validate_light_address(LightKind::Tuya, "bf3e21a9c0")   // Ok
/// ```
pub fn validate_light_address(kind: LightKind, address: &str) -> Result<(), ValidationError> {
    let address = address.trim();
    match kind {
        LightKind::Tapo => {
            if address.parse::<IpAddr>().is_err() {
                let mut err = ValidationError::new("tapo_address");
                err.message = Some(format!("Tapo light address must be an IP (got `{address}`)").into());
                return Err(err);
            }
        }
        LightKind::Tuya => {
            if address.is_empty()
                || address.len() > 64
                || !address.chars().all(|c| c.is_ascii_alphanumeric())
            {
                let mut err = ValidationError::new("tuya_device_id");
                err.message =
                    Some("Tuya device id must be 1-64 alphanumeric characters".into());
                return Err(err);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_tapo_address() {
        assert!(validate_light_address(LightKind::Tapo, "192.168.1.40").is_ok());
        assert!(validate_light_address(LightKind::Tapo, " 10.0.0.2 ").is_ok());
        assert!(validate_light_address(LightKind::Tapo, "fe80::1").is_ok());
        assert!(validate_light_address(LightKind::Tapo, "porch-lamp").is_err());
        assert!(validate_light_address(LightKind::Tapo, "192.168.1.300").is_err());
    }

    #[test]
    fn test_validate_tuya_device_id() {
        assert!(validate_light_address(LightKind::Tuya, "bf3e21a9c0").is_ok());
        assert!(validate_light_address(LightKind::Tuya, "").is_err());
        assert!(validate_light_address(LightKind::Tuya, "bf3e 21").is_err());
        assert!(validate_light_address(LightKind::Tuya, &"a".repeat(65)).is_err());
    }
}
