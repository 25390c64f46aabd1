//! API 层配置
//!
//! 包含会话配置 RunConfig

use dualclass_config::{ConfigError, DeviceConfig, RuntimeConfig};
use serde::{Deserialize, Serialize};

/// Session configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Class runtime configuration
    pub runtime: RuntimeConfig,
    /// Accelerator configuration
    pub device: DeviceConfig,
}

impl RunConfig {
    /// Parse from JSON; missing sections keep their defaults
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// 是否会真正产生设备镜像
    pub fn mirrors(&self) -> bool {
        self.runtime.mirror_to_device && self.device.enabled
    }
}
