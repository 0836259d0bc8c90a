use serde::{Deserialize, Serialize};

use crate::body::DEFAULT_TRUNCATION_SIZE;
use crate::error::BackendError;
use crate::policy::PolicyOverrides;

/// Construction-time backend configuration.
///
/// Every field is optional in the serialized form; missing fields take
/// their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Partial policy set merged onto the defaults.
    pub policies: PolicyOverrides,
    pub heartbeat: HeartbeatConfig,
    /// Applied to body preferences that name no size.
    pub default_truncation_size: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            policies: PolicyOverrides::default(),
            heartbeat: HeartbeatConfig::default(),
            default_truncation_size: DEFAULT_TRUNCATION_SIZE,
        }
    }
}

impl BackendConfig {
    /// Parse a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, BackendError> {
        serde_json::from_str(json)
            .map_err(|e| BackendError::InvalidArgument(format!("Invalid backend config: {}", e)))
    }
}

/// Ping heartbeat bounds (seconds) and wait interval (minutes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    pub heartbeat_min: u32,
    pub heartbeat_max: u32,
    pub heartbeat_default: u32,
    /// Whether devices may use long-lived ping requests at all.
    pub device_ping: bool,
    pub wait_interval: u32,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            heartbeat_min: 60,
            heartbeat_max: 2700,
            heartbeat_default: 480,
            device_ping: true,
            wait_interval: 10,
        }
    }
}

/// Result of validating a device-requested heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatCheck {
    Accepted(u32),
    /// Too short; carries the minimum the device should retry with.
    TooLow(u32),
    /// Too long; carries the maximum the device should retry with.
    TooHigh(u32),
}

impl HeartbeatConfig {
    /// Validate a requested heartbeat; `None` falls back to the default.
    pub fn check(&self, requested: Option<u32>) -> HeartbeatCheck {
        match requested {
            None => HeartbeatCheck::Accepted(self.heartbeat_default),
            Some(secs) if secs < self.heartbeat_min => HeartbeatCheck::TooLow(self.heartbeat_min),
            Some(secs) if secs > self.heartbeat_max => HeartbeatCheck::TooHigh(self.heartbeat_max),
            Some(secs) => HeartbeatCheck::Accepted(secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(BackendConfig::from_json("{}").unwrap(), BackendConfig::default());
    }

    #[test]
    fn test_partial_json() {
        let config = BackendConfig::from_json(
            r#"{"policies": {"pin": false}, "heartbeat": {"heartbeat_max": 900}}"#,
        )
        .unwrap();
        assert_eq!(config.policies.pin, Some(false));
        assert_eq!(config.policies.inactivity, None);
        assert_eq!(config.heartbeat.heartbeat_max, 900);
        assert_eq!(config.heartbeat.heartbeat_min, 60);
        assert_eq!(config.default_truncation_size, 1_048_576);
    }

    #[test]
    fn test_invalid_json() {
        let err = BackendConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, BackendError::InvalidArgument(_)));
    }

    #[test]
    fn test_heartbeat_bounds() {
        let hb = HeartbeatConfig::default();
        assert_eq!(hb.check(None), HeartbeatCheck::Accepted(480));
        assert_eq!(hb.check(Some(30)), HeartbeatCheck::TooLow(60));
        assert_eq!(hb.check(Some(60)), HeartbeatCheck::Accepted(60));
        assert_eq!(hb.check(Some(2700)), HeartbeatCheck::Accepted(2700));
        assert_eq!(hb.check(Some(3000)), HeartbeatCheck::TooHigh(2700));
    }
}
