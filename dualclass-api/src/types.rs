//! API 类型定义
//!
//! 求值请求与输出。

use serde::{Deserialize, Serialize};

/// 一次求值请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluateRequest {
    /// 新建 Mechanism 的 source id
    pub source_id: u32,
    /// 步长
    pub dt: f64,
    /// 绝对时间
    pub global_time: f64,
    /// 步号
    pub step: u32,
}

impl Default for EvaluateRequest {
    fn default() -> Self {
        Self {
            source_id: 0,
            dt: 0.01,
            global_time: 0.0,
            step: 0,
        }
    }
}

/// 已发布的设备镜像
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirrorHandle {
    pub class: String,
    /// 设备符号名
    pub symbol: String,
    /// 镜像地址；None 表示未镜像
    pub address: Option<u64>,
}

/// 求值输出
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluateOutput {
    /// 被求值对象的类名
    pub class: String,
    pub source_id: u32,
    /// 求值结果
    pub magnitude: f64,
    pub mirrors: Vec<MirrorHandle>,
}
