//! Dualclass 运行时 (Runtime 层)
//!
//! 本模块为 core 层类型提供实现：
//! - `ClassRegistry` 的类定义、构造链、分派与镜像逻辑
//! - 根类 Object / 根元类 Class
//! - 模拟加速器
//! - MechanismClass / Mechanism

// ==================== 核心类型（从 core 层重新导出）====================

pub use crate::core::{
    ClassDescriptor, ClassId, ClassImage, ClassRegistry, ClassSpec, CtorArgs, Device,
    DevicePtr, Method, Object, Overrides, Receiver, RuntimeError, Selector, SlotEntry, Value,
};

// ==================== Runtime 实现模块 ====================

/// 注册表实现（包含构造与镜像逻辑）
pub mod registry;

/// 根类与根元类
pub mod root;

/// 模拟加速器
pub mod device;

/// MechanismClass / Mechanism
pub mod mechanism;
