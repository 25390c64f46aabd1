//! CLI 配置
//!
//! 包含 CLI 特有的配置：按子系统的日志级别

use dualclass_config::Subsystem;
use tracing::Level;

/// CLI 日志配置
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub global: Level,
    pub registry: Option<Level>,
    pub dispatch: Option<Level>,
    pub mirror: Option<Level>,
    pub device: Option<Level>,
    pub api: Option<Level>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            global: Level::INFO,
            registry: None,
            dispatch: None,
            mirror: None,
            device: None,
            api: None,
        }
    }
}

impl LogConfig {
    /// Get log level for a specific subsystem
    pub fn level_for(&self, subsystem: Subsystem) -> Level {
        let specific = match subsystem {
            Subsystem::Registry => self.registry,
            Subsystem::Dispatch => self.dispatch,
            Subsystem::Mirror => self.mirror,
            Subsystem::Device => self.device,
            Subsystem::Api => self.api,
        };
        specific.unwrap_or(self.global)
    }

    /// Set the level of one subsystem
    pub fn set(&mut self, subsystem: Subsystem, level: Level) {
        match subsystem {
            Subsystem::Registry => self.registry = Some(level),
            Subsystem::Dispatch => self.dispatch = Some(level),
            Subsystem::Mirror => self.mirror = Some(level),
            Subsystem::Device => self.device = Some(level),
            Subsystem::Api => self.api = Some(level),
        }
    }
}

/// Parse log level string
///
/// "silent" 只保留错误。
pub fn parse_level(s: &str) -> Option<Level> {
    match s.to_lowercase().as_str() {
        "silent" | "error" => Some(Level::ERROR),
        "warn" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

/// Parse subsystem name
pub fn parse_subsystem(s: &str) -> Option<Subsystem> {
    Subsystem::ALL.into_iter().find(|sub| sub.as_str() == s)
}
