//! 测试辅助工具
//!
//! 提供挂载模拟加速器的注册表与若干测试用覆盖函数

#![allow(dead_code)]

use dualclass_core::mechanism::{self, DEVICE_SYMBOLS};
use dualclass_core::{
    ClassRegistry, DeviceConfig, EmulatedDevice, Object, Receiver, RuntimeConfig,
};
use std::sync::Arc;

/// 带设备的测试环境
pub struct Harness {
    pub registry: ClassRegistry,
    pub device: Arc<EmulatedDevice>,
}

/// 创建挂有模拟加速器的注册表
///
/// `load_kernels` 为 false 时设备模块中没有求值内核，用于测试符号缺失。
pub fn harness(mirror_to_device: bool, load_kernels: bool) -> Harness {
    let device = Arc::new(EmulatedDevice::new(&DeviceConfig {
        enabled: true,
        ..DeviceConfig::default()
    }));
    if load_kernels {
        device.load_module(&DEVICE_SYMBOLS);
    }
    let config = RuntimeConfig {
        mirror_to_device,
        ..RuntimeConfig::default()
    };
    let registry = ClassRegistry::new(config, Some(device.clone()));
    Harness { registry, device }
}

/// dt * 2
pub fn doubled_dt(
    _: &Receiver<'_>,
    _: Option<&Object>,
    _: Option<&Object>,
    dt: f64,
    _: f64,
    _: u32,
) -> f64 {
    dt * 2.0
}

/// 祖先结果 + 1
pub fn ancestor_plus_one(
    receiver: &Receiver<'_>,
    pre: Option<&Object>,
    post: Option<&Object>,
    dt: f64,
    global_time: f64,
    step: u32,
) -> f64 {
    mechanism::evaluate_via_ancestor(receiver, pre, post, dt, global_time, step) + 1.0
}

/// 返回 source_id
pub fn echo_source_id(
    receiver: &Receiver<'_>,
    _: Option<&Object>,
    _: Option<&Object>,
    _: f64,
    _: f64,
    _: u32,
) -> f64 {
    receiver
        .field(mechanism::SOURCE_ID_FIELD)
        .and_then(|v| v.as_unsigned())
        .map_or(f64::NAN, |id| id as f64)
}
