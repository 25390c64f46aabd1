//! API 错误类型
//!
//! 提供统一的错误类型和结构化错误报告。

use dualclass_config::ConfigError;
use dualclass_core::{DeviceError, RuntimeError};
use serde::Serialize;
use thiserror::Error;

/// Dualclass 错误类型
#[derive(Error, Debug)]
pub enum DualclassError {
    /// 配置错误
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// 类运行时错误（含加速器错误）
    #[error("{0}")]
    Runtime(#[from] RuntimeError),

    /// 全局会话已初始化
    #[error("session already initialized")]
    AlreadyInitialized,

    /// 全局会话未初始化
    #[error("session not initialized")]
    NotInitialized,
}

impl DualclassError {
    /// 获取错误阶段名称
    pub fn phase(&self) -> &'static str {
        match self {
            DualclassError::Config(_) => "config",
            DualclassError::Runtime(RuntimeError::Device(_)) => "device",
            DualclassError::Runtime(_) => "runtime",
            DualclassError::AlreadyInitialized | DualclassError::NotInitialized => "session",
        }
    }

    /// 错误类型（可用于程序化处理）
    pub fn error_kind(&self) -> &'static str {
        match self {
            DualclassError::Config(_) => "InvalidConfig",
            DualclassError::Runtime(e) => runtime_kind(e),
            DualclassError::AlreadyInitialized => "AlreadyInitialized",
            DualclassError::NotInitialized => "NotInitialized",
        }
    }

    /// 转换为结构化错误报告
    ///
    /// CLI 可以直接打印，上层应用可以序列化为 JSON。
    pub fn to_report(&self) -> ErrorReport {
        ErrorReport {
            phase: self.phase(),
            error_kind: self.error_kind().to_string(),
            message: self.to_string(),
        }
    }
}

fn runtime_kind(err: &RuntimeError) -> &'static str {
    match err {
        RuntimeError::UnknownClass(_) => "UnknownClass",
        RuntimeError::DuplicateClass(_) => "DuplicateClass",
        RuntimeError::NotAMetaclass(_) => "NotAMetaclass",
        RuntimeError::NotInstantiable(_) => "NotInstantiable",
        RuntimeError::WrongClass { .. } => "WrongClass",
        RuntimeError::MissingSlot { .. } => "MissingSlot",
        RuntimeError::MissingArgument { .. } => "MissingArgument",
        RuntimeError::ArgumentType { .. } => "ArgumentType",
        RuntimeError::LayoutMismatch { .. } => "LayoutMismatch",
        RuntimeError::ImageOverflow { .. } => "ImageOverflow",
        RuntimeError::MalformedImage { .. } => "MalformedImage",
        RuntimeError::Device(DeviceError::UnknownSymbol(_)) => "UnknownSymbol",
        RuntimeError::Device(DeviceError::CopyFailed { .. }) => "CopyFailed",
        RuntimeError::Device(DeviceError::InvalidAddress(_)) => "InvalidAddress",
    }
}

/// 结构化错误报告
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    /// 错误阶段: config, runtime, device, session
    pub phase: &'static str,
    /// 错误类型
    pub error_kind: String,
    /// 人类可读的错误消息
    pub message: String,
}

impl std::fmt::Display for ErrorReport {
    /// 默认的 CLI 友好格式
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} error: {}", self.error_kind, self.phase, self.message)
    }
}

impl ErrorReport {
    /// 转换为 JSON 格式
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
