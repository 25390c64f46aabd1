//! 模拟加速器
//!
//! 进程内的 `Device` 实现：线性 bump 分配器 + 符号表。设备端可调用
//! 地址（例如求值内核）通过 `load_module` 注册，布局与真实设备模块一致：
//! 代码地址与数据地址位于不同区间，且都不为 0。

use crate::core::target;
use crate::core::{ClassImage, Device, DeviceError, DevicePtr, RuntimeError, IMAGE_SIZE};
use dualclass_config::DeviceConfig;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace, warn};

/// 数据区起始地址
const DATA_BASE: u64 = 0x1000_0000;
/// 代码区起始地址
const CODE_BASE: u64 = 0x8000_0000;
/// 分配对齐
const ALIGNMENT: u64 = 256;
/// 每个内核占用的代码区跨度
const KERNEL_STRIDE: u64 = 0x100;

#[derive(Debug, Default)]
struct DeviceState {
    /// 起始地址 -> 内容
    allocations: BTreeMap<u64, Vec<u8>>,
    symbols: HashMap<String, DevicePtr>,
    next_data: u64,
    next_code: u64,
    bytes_in_use: usize,
    /// 下一次上传注入的失败原因
    injected_failure: Option<String>,
}

/// 模拟加速器
#[derive(Debug)]
pub struct EmulatedDevice {
    name: String,
    memory_limit: usize,
    state: Mutex<DeviceState>,
}

impl EmulatedDevice {
    pub fn new(config: &DeviceConfig) -> Self {
        debug!(
            target: target::DEVICE,
            memory_limit = config.memory_limit,
            "emulated device created"
        );
        Self {
            name: "emulated".to_string(),
            memory_limit: config.memory_limit,
            state: Mutex::new(DeviceState {
                next_data: DATA_BASE,
                next_code: CODE_BASE,
                ..DeviceState::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 直接定义符号
    pub fn define_symbol(&self, symbol: &str, value: DevicePtr) {
        self.state().symbols.insert(symbol.to_string(), value);
    }

    /// 加载设备模块：为每个内核符号分配代码地址
    pub fn load_module(&self, kernels: &[&str]) -> Vec<DevicePtr> {
        let mut state = self.state();
        kernels
            .iter()
            .map(|name| {
                let ptr = DevicePtr::new(state.next_code);
                state.next_code += KERNEL_STRIDE;
                state.symbols.insert((*name).to_string(), ptr);
                trace!(target: target::DEVICE, kernel = %name, addr = %ptr, "kernel loaded");
                ptr
            })
            .collect()
    }

    /// 让下一次上传失败（测试用的故障注入）
    pub fn fail_next_upload(&self, reason: impl Into<String>) {
        self.state().injected_failure = Some(reason.into());
    }

    /// 当前分配数
    pub fn allocation_count(&self) -> usize {
        self.state().allocations.len()
    }

    pub fn bytes_in_use(&self) -> usize {
        self.state().bytes_in_use
    }

    pub fn has_symbol(&self, symbol: &str) -> bool {
        self.state().symbols.contains_key(symbol)
    }

    /// 按符号读回并解码一个已发布的类镜像
    pub fn resolve_class(&self, symbol: &str) -> Result<ClassImage, RuntimeError> {
        let ptr = self.read_symbol(symbol)?;
        let bytes = self.read_memory(ptr, IMAGE_SIZE)?;
        ClassImage::from_bytes(&bytes)
    }
}

impl Device for EmulatedDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_symbol(&self, symbol: &str) -> Result<DevicePtr, DeviceError> {
        self.state()
            .symbols
            .get(symbol)
            .copied()
            .ok_or_else(|| DeviceError::UnknownSymbol(symbol.to_string()))
    }

    fn write_symbol(&self, symbol: &str, value: DevicePtr) -> Result<(), DeviceError> {
        trace!(target: target::DEVICE, symbol, value = %value, "symbol written");
        self.state().symbols.insert(symbol.to_string(), value);
        Ok(())
    }

    fn upload(&self, bytes: &[u8]) -> Result<DevicePtr, DeviceError> {
        let mut state = self.state();

        if let Some(reason) = state.injected_failure.take() {
            warn!(target: target::DEVICE, bytes = bytes.len(), %reason, "upload failed");
            return Err(DeviceError::CopyFailed {
                bytes: bytes.len(),
                reason,
            });
        }
        if state.bytes_in_use + bytes.len() > self.memory_limit {
            return Err(DeviceError::CopyFailed {
                bytes: bytes.len(),
                reason: format!(
                    "out of device memory ({} of {} bytes in use)",
                    state.bytes_in_use, self.memory_limit
                ),
            });
        }

        let addr = state.next_data;
        let span = (bytes.len() as u64).max(1).div_ceil(ALIGNMENT) * ALIGNMENT;
        state.next_data += span;
        state.bytes_in_use += bytes.len();
        state.allocations.insert(addr, bytes.to_vec());

        trace!(target: target::DEVICE, bytes = bytes.len(), addr = %DevicePtr::new(addr), "uploaded");
        Ok(DevicePtr::new(addr))
    }

    fn read_memory(&self, ptr: DevicePtr, len: usize) -> Result<Vec<u8>, DeviceError> {
        let state = self.state();
        let (start, data) = state
            .allocations
            .range(..=ptr.addr())
            .next_back()
            .ok_or(DeviceError::InvalidAddress(ptr))?;
        let offset = (ptr.addr() - start) as usize;
        data.get(offset..offset.saturating_add(len))
            .map(<[u8]>::to_vec)
            .ok_or(DeviceError::InvalidAddress(ptr))
    }
}
