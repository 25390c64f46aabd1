//! Dualclass Core - single-inheritance class runtime with device mirroring
//!
//! Contains class descriptors, dispatch tables, the constructor chain, and the
//! protocol that mirrors class metadata into accelerator memory.
//! Only operates on in-memory data structures; the accelerator is reached
//! through the [`Device`] trait.
//!
//! Configuration is passed explicitly via parameters, not via global state.

pub mod core;
pub mod runtime;

// Re-export common types
pub use crate::core::{
    ClassDescriptor, ClassId, ClassImage, ClassRegistry, ClassSpec, CtorArgs, Device,
    DeviceError, DevicePtr, Method, Object, Overrides, Receiver, RuntimeError, Selector,
    SlotEntry, Value,
};
pub use runtime::device::EmulatedDevice;
pub use runtime::mechanism::{self, Mechanism, MechanismClasses};
pub use runtime::registry::RegistryStats;

// Re-export config types from dualclass-config
pub use dualclass_config::{DeviceConfig, RuntimeConfig, Subsystem};
