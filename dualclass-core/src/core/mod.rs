//! Core 模块 - Dualclass 运行时核心类型定义
//!
//! 本模块包含所有核心类型的纯定义，不依赖实现细节。
//! 这是三层架构的中间层：
//! - Core 层：类型定义（本模块）
//! - Runtime 层：实现逻辑（runtime/ 目录）
//! - API 层：对外接口（dualclass-api）

// ==================== 基础类型 ====================

/// 句柄（ClassId / DevicePtr）
pub mod handle;
pub use handle::{ClassId, DevicePtr};

/// 构造参数与字段值
pub mod value;
pub use value::{CtorArgs, Value};

// ==================== 分派表 ====================

/// 选择子、方法槽与覆盖列表
pub mod slot;
pub use slot::{
    ClassInitFn, EvaluateFn, InitFn, Method, MirrorFn, Overrides, Receiver, Selector,
    SlotEntry, SlotTable,
};

// ==================== 类与对象 ====================

/// 类描述符
pub mod class;
pub use class::{ClassDescriptor, ClassSpec};

/// 对象实例
pub mod object;
pub use object::Object;

/// 设备端类镜像（字节布局）
pub mod image;
pub use image::{ClassImage, IMAGE_SIZE};

// ==================== 注册表与设备 ====================

/// 注册表定义
pub mod registry;
pub use registry::ClassRegistry;

/// 加速器接口
pub mod device;
pub use device::Device;

// ==================== 错误 ====================

/// 错误类型
pub mod error;
pub use error::{DeviceError, RuntimeError};

// ==================== 日志目标 ====================

/// tracing target 常量（与 `Subsystem::target()` 一致）
pub mod target {
    pub const REGISTRY: &str = "dualclass::registry";
    pub const DISPATCH: &str = "dualclass::dispatch";
    pub const MIRROR: &str = "dualclass::mirror";
    pub const DEVICE: &str = "dualclass::device";
}
