//! 句柄类型
//!
//! 类描述符通过 arena 索引引用，设备内存通过地址引用，二者都不是宿主指针。

use std::fmt;

/// 类句柄（注册表 arena 中的稳定索引）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub(crate) u32);

impl ClassId {
    /// 从原始索引创建句柄
    pub const fn from_raw(raw: u32) -> Self {
        ClassId(raw)
    }

    /// 原始索引
    pub const fn raw(self) -> u32 {
        self.0
    }

    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class#{}", self.0)
    }
}

/// 设备内存地址
///
/// 地址 0 保留给"空"，镜像中以 0 表示未填充的槽位或链接。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DevicePtr(pub u64);

impl DevicePtr {
    /// 创建设备地址
    pub const fn new(addr: u64) -> Self {
        DevicePtr(addr)
    }

    /// 获取地址值
    pub const fn addr(self) -> u64 {
        self.0
    }

    /// 编码为镜像字（None -> 0）
    pub(crate) fn to_word(ptr: Option<DevicePtr>) -> u64 {
        ptr.map_or(0, DevicePtr::addr)
    }

    /// 从镜像字解码（0 -> None）
    pub(crate) fn from_word(word: u64) -> Option<DevicePtr> {
        (word != 0).then_some(DevicePtr(word))
    }
}

impl fmt::Display for DevicePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dev:{:#x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_id_display() {
        assert_eq!(ClassId::from_raw(3).to_string(), "class#3");
        assert_eq!(ClassId::from_raw(3).raw(), 3);
    }

    #[test]
    fn test_device_ptr_word_zero_is_empty() {
        assert_eq!(DevicePtr::from_word(0), None);
        assert_eq!(DevicePtr::from_word(0x40), Some(DevicePtr(0x40)));
        assert_eq!(DevicePtr::to_word(None), 0);
        assert_eq!(DevicePtr::new(0x1000).to_string(), "dev:0x1000");
    }
}
