//! 加速器接口 (Core 层)
//!
//! 镜像协议只依赖这四个操作：符号读写、阻塞上传、读回内存。
//! 具体实现见 runtime/device.rs。

use super::error::DeviceError;
use super::handle::DevicePtr;

/// 加速器
pub trait Device: Send + Sync {
    /// 设备名（用于日志）
    fn name(&self) -> &str;

    /// 读取设备符号的值（例如设备端函数地址）
    fn read_symbol(&self, symbol: &str) -> Result<DevicePtr, DeviceError>;

    /// 写入设备符号，设备端代码无需宿主参与即可读到
    fn write_symbol(&self, symbol: &str, value: DevicePtr) -> Result<(), DeviceError>;

    /// 分配设备内存并阻塞拷贝
    fn upload(&self, bytes: &[u8]) -> Result<DevicePtr, DeviceError>;

    /// 读回设备内存
    fn read_memory(&self, ptr: DevicePtr, len: usize) -> Result<Vec<u8>, DeviceError>;
}
