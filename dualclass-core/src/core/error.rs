//! 错误类型 (Core 层)
//!
//! 契约违反（如祖先槽位为空时的祖先委托）不走错误通道，直接 panic。

use super::handle::{ClassId, DevicePtr};
use super::slot::Selector;
use thiserror::Error;

/// 加速器错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// 设备模块中没有该符号
    #[error("unknown device symbol `{0}`")]
    UnknownSymbol(String),

    /// 拷贝到设备内存失败
    #[error("device copy of {bytes} bytes failed: {reason}")]
    CopyFailed { bytes: usize, reason: String },

    /// 地址不属于任何设备分配
    #[error("invalid device address {0}")]
    InvalidAddress(DevicePtr),
}

/// 统一的运行时错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// 句柄不在注册表中
    #[error("unknown class handle {0}")]
    UnknownClass(ClassId),

    /// 同名类已定义
    #[error("class `{0}` is already defined")]
    DuplicateClass(String),

    /// 作为元类使用，但构造槽不是类构造器
    #[error("class `{0}` is not a metaclass")]
    NotAMetaclass(String),

    /// 构造槽不是实例构造器（例如对元类调用 construct）
    #[error("class `{0}` cannot construct instances")]
    NotInstantiable(String),

    /// 对象的类不在期望的继承链上
    #[error("class `{class}` does not derive from `{expected}`")]
    WrongClass { class: String, expected: String },

    /// 该类没有对应的分派槽
    #[error("class `{class}` has no `{selector}` slot")]
    MissingSlot { class: String, selector: Selector },

    /// 构造参数不足
    #[error("missing constructor argument at position {position}")]
    MissingArgument { position: usize },

    /// 构造参数类型不符
    #[error("constructor argument {position}: expected {expected}, found {found}")]
    ArgumentType {
        position: usize,
        expected: &'static str,
        found: &'static str,
    },

    /// 构造链写入的字段数与类声明不一致
    #[error("class `{class}` declares {expected} fields but construction produced {actual}")]
    LayoutMismatch {
        class: String,
        expected: usize,
        actual: usize,
    },

    /// 实例字段数超出镜像布局的 u32 范围
    #[error("class `{class}` has {instance_size} fields, too many for a device image")]
    ImageOverflow { class: String, instance_size: usize },

    /// 设备镜像字节长度不对
    #[error("class image is {len} bytes, expected {expected}")]
    MalformedImage { len: usize, expected: usize },

    /// 加速器错误
    #[error("device error: {0}")]
    Device(#[from] DeviceError),
}
