//! Dualclass API - Session orchestration layer
//!
//! Provides a unified interface over the class runtime, including:
//! - Session boot (registry + optional emulated accelerator + Mechanism classes)
//! - Configuration abstraction (RunConfig)
//! - Unified error handling (DualclassError)
//!
//! For CLI convenience, this crate provides a global singleton session.
//! For library use, prefer the explicit `Session::boot(config)` API.

use dualclass_core::mechanism::{self, init_mechanism, Mechanism, MechanismClasses};
use dualclass_core::{ClassId, ClassRegistry, Device, EmulatedDevice, RegistryStats};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::info;

pub mod config;
pub use config::RunConfig;

// Re-export error and types
pub mod error;
pub mod types;
pub use error::{DualclassError, ErrorReport};
pub use types::{EvaluateOutput, EvaluateRequest, MirrorHandle};

// Re-export config and core crates
pub use dualclass_config;
pub use dualclass_core;

const LOG_TARGET: &str = "dualclass::api";

/// A booted class runtime
pub struct Session {
    config: RunConfig,
    registry: ClassRegistry,
    device: Option<Arc<EmulatedDevice>>,
    classes: MechanismClasses,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("classes", &self.classes)
            .field("stats", &self.registry.stats())
            .finish()
    }
}

impl Session {
    /// Boot with explicit configuration
    ///
    /// 设备启用时加载 Mechanism 的设备模块；`mirror_to_device` 开启时
    /// MechanismClass 与 Mechanism 在返回前完成镜像。
    pub fn boot(config: RunConfig) -> Result<Self, DualclassError> {
        let device = config.device.enabled.then(|| {
            let device = Arc::new(EmulatedDevice::new(&config.device));
            device.load_module(&mechanism::DEVICE_SYMBOLS);
            device
        });
        let attached = device.clone().map(|d| d as Arc<dyn Device>);
        let registry = ClassRegistry::new(config.runtime.clone(), attached);
        let classes = init_mechanism(&registry)?;

        info!(
            target: LOG_TARGET,
            device = config.device.enabled,
            mirrored = registry.stats().mirrored,
            "session booted"
        );
        Ok(Self {
            config,
            registry,
            device,
            classes,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    /// 模拟加速器（未启用时为 None）
    pub fn device(&self) -> Option<&Arc<EmulatedDevice>> {
        self.device.as_ref()
    }

    pub fn classes(&self) -> MechanismClasses {
        self.classes
    }

    /// 构造一个 Mechanism 并求值一次
    pub fn evaluate(&self, request: &EvaluateRequest) -> Result<EvaluateOutput, DualclassError> {
        let mech = Mechanism::new(&self.registry, request.source_id)?;
        let magnitude = mech.evaluate(
            &self.registry,
            None,
            None,
            request.dt,
            request.global_time,
            request.step,
        )?;

        Ok(EvaluateOutput {
            class: self.registry.descriptor(mech.class())?.name().to_string(),
            source_id: mech.source_id(),
            magnitude,
            mirrors: self.mirrors()?,
        })
    }

    /// MechanismClass 与 Mechanism 的镜像句柄
    pub fn mirrors(&self) -> Result<Vec<MirrorHandle>, DualclassError> {
        [self.classes.metaclass, self.classes.class]
            .into_iter()
            .map(|class| self.mirror_handle(class))
            .collect()
    }

    fn mirror_handle(&self, class: ClassId) -> Result<MirrorHandle, DualclassError> {
        let desc = self.registry.descriptor(class)?;
        Ok(MirrorHandle {
            class: desc.name().to_string(),
            symbol: desc.device_symbol().to_string(),
            address: desc.device_mirror().map(|ptr| ptr.addr()),
        })
    }

    /// 关闭会话
    pub fn shutdown(self) -> RegistryStats {
        self.registry.shutdown()
    }
}

// ==================== Global session (CLI convenience) ====================

static SESSION: OnceCell<Session> = OnceCell::new();

/// Boot the global session (must be called once before `session()`)
pub fn init(config: RunConfig) -> Result<&'static Session, DualclassError> {
    if SESSION.get().is_some() {
        return Err(DualclassError::AlreadyInitialized);
    }
    let booted = Session::boot(config)?;
    SESSION
        .set(booted)
        .map_err(|_| DualclassError::AlreadyInitialized)?;
    session()
}

/// Get the global session
pub fn session() -> Result<&'static Session, DualclassError> {
    SESSION.get().ok_or(DualclassError::NotInitialized)
}

/// Check if the global session is initialized
pub fn is_initialized() -> bool {
    SESSION.get().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dualclass_config::{DeviceConfig, RuntimeConfig};

    fn mirrored_config() -> RunConfig {
        RunConfig {
            runtime: RuntimeConfig {
                mirror_to_device: true,
                ..RuntimeConfig::default()
            },
            device: DeviceConfig {
                enabled: true,
                ..DeviceConfig::default()
            },
        }
    }

    #[test]
    fn test_log_target_matches_subsystem() {
        assert_eq!(dualclass_config::Subsystem::Api.target(), LOG_TARGET);
    }

    #[test]
    fn test_boot_host_only() {
        let session = Session::boot(RunConfig::default()).unwrap();
        let output = session
            .evaluate(&EvaluateRequest {
                source_id: 4,
                ..EvaluateRequest::default()
            })
            .unwrap();

        assert_eq!(output.class, "Mechanism");
        assert_eq!(output.source_id, 4);
        assert_eq!(output.magnitude, 0.0);
        assert!(output.mirrors.iter().all(|m| m.address.is_none()));
        assert!(session.device().is_none());
    }

    #[test]
    fn test_boot_with_mirroring() {
        let session = Session::boot(mirrored_config()).unwrap();
        let mirrors = session.mirrors().unwrap();

        assert_eq!(mirrors.len(), 2);
        assert_eq!(mirrors[0].symbol, "MechanismClass::device_class");
        assert_eq!(mirrors[1].symbol, "Mechanism::device_class");
        let device = session.device().unwrap();
        for handle in &mirrors {
            let published = device.read_symbol(&handle.symbol).unwrap();
            assert_eq!(handle.address, Some(published.addr()));
        }

        let stats = session.shutdown();
        assert_eq!(stats.mirrored, 4);
    }

    #[test]
    fn test_device_without_mirroring() {
        let mut config = mirrored_config();
        config.runtime.mirror_to_device = false;
        let session = Session::boot(config).unwrap();

        assert_eq!(session.device().unwrap().allocation_count(), 0);
        assert!(session.mirrors().unwrap().iter().all(|m| m.address.is_none()));
    }

    #[test]
    fn test_global_session() {
        // 全局状态：同一进程中只有第一次 init 成功
        if !is_initialized() {
            init(RunConfig::default()).unwrap();
        }
        assert!(is_initialized());
        assert!(session().is_ok());
        assert!(matches!(
            init(RunConfig::default()),
            Err(DualclassError::AlreadyInitialized)
        ));
    }
}
