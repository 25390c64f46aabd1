//! Dualclass Config - Pure configuration data structures
//!
//! This crate contains only data structures, no logic or global state.
//! It serves as the shared configuration vocabulary across all Dualclass crates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration for the class runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Mirror mechanism classes to the attached device when they are initialised
    pub mirror_to_device: bool,
    /// Initial capacity of the class arena
    pub initial_class_capacity: usize,
}

/// Configuration for the accelerator attached to a registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Attach a device at all; `false` makes every mirror request a no-op
    pub enabled: bool,
    /// Upper bound on bytes the emulated device will hand out
    pub memory_limit: usize,
}

/// Runtime subsystem, used to derive log targets
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Subsystem {
    Registry,
    Dispatch,
    Mirror,
    Device,
    Api,
}

impl Subsystem {
    /// All subsystems, in log-filter order
    pub const ALL: [Subsystem; 5] = [
        Subsystem::Registry,
        Subsystem::Dispatch,
        Subsystem::Mirror,
        Subsystem::Device,
        Subsystem::Api,
    ];

    /// Get the string name of the subsystem
    pub fn as_str(&self) -> &'static str {
        match self {
            Subsystem::Registry => "registry",
            Subsystem::Dispatch => "dispatch",
            Subsystem::Mirror => "mirror",
            Subsystem::Device => "device",
            Subsystem::Api => "api",
        }
    }

    /// Get the log target name for this subsystem
    pub fn target(&self) -> String {
        format!("dualclass::{}", self.as_str())
    }
}

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Malformed JSON or unexpected field types
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            mirror_to_device: false,
            initial_class_capacity: 16,
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            memory_limit: 1 << 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_runtime_config() {
        let cfg = RuntimeConfig::default();
        assert!(!cfg.mirror_to_device);
        assert_eq!(cfg.initial_class_capacity, 16);
    }

    #[test]
    fn test_default_device_config() {
        let cfg = DeviceConfig::default();
        assert!(!cfg.enabled);
        assert_eq!(cfg.memory_limit, 1 << 20);
    }

    #[test]
    fn test_subsystem_target() {
        assert_eq!(Subsystem::Registry.as_str(), "registry");
        assert_eq!(Subsystem::Mirror.target(), "dualclass::mirror");
    }

    #[test]
    fn test_runtime_config_partial_json_keeps_defaults() {
        let cfg: RuntimeConfig = serde_json::from_str(r#"{ "mirror_to_device": true }"#).unwrap();
        assert!(cfg.mirror_to_device);
        assert_eq!(cfg.initial_class_capacity, 16);
    }

    #[test]
    fn test_config_error_wraps_parse_error() {
        let parse = serde_json::from_str::<DeviceConfig>(r#"{ "enabled": "yes" }"#).unwrap_err();
        let err = ConfigError::from(parse);
        assert!(err.to_string().starts_with("invalid configuration"));
    }
}
