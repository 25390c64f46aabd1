//! 设备端类镜像
//!
//! 镜像是类描述符在设备内存中的字节拷贝。布局（小端，40 bytes）：
//!
//! ```text
//! +0   class id        u32
//! +4   instance size   u32
//! +8   ancestor        u64   祖先自己的镜像地址，0 表示无
//! +16  slot[Selector]  u64 × Selector::COUNT，设备端可调用地址，0 表示仅宿主
//! ```

use super::class::ClassDescriptor;
use super::error::RuntimeError;
use super::handle::{ClassId, DevicePtr};
use super::slot::Selector;

/// 镜像字节大小
pub const IMAGE_SIZE: usize = 16 + 8 * Selector::COUNT;

/// 宿主侧的影子镜像
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassImage {
    pub class: ClassId,
    pub instance_size: u32,
    pub ancestor: Option<DevicePtr>,
    pub slots: [Option<DevicePtr>; Selector::COUNT],
}

impl ClassImage {
    /// 从描述符创建影子镜像
    ///
    /// 宿主地址在设备上没有意义，因此槽位和祖先链接全部留空，
    /// 由镜像链上各层元类逐一填充。字段数超出 u32 时无法编码。
    pub fn shadow(desc: &ClassDescriptor) -> Result<Self, RuntimeError> {
        let instance_size =
            u32::try_from(desc.instance_size()).map_err(|_| RuntimeError::ImageOverflow {
                class: desc.name().to_string(),
                instance_size: desc.instance_size(),
            })?;
        Ok(Self {
            class: desc.id(),
            instance_size,
            ancestor: None,
            slots: [None; Selector::COUNT],
        })
    }

    #[inline]
    pub fn slot(&self, selector: Selector) -> Option<DevicePtr> {
        self.slots[selector.index()]
    }

    #[inline]
    pub fn set_slot(&mut self, selector: Selector, ptr: Option<DevicePtr>) {
        self.slots[selector.index()] = ptr;
    }

    /// 编码为设备字节布局
    pub fn to_bytes(&self) -> [u8; IMAGE_SIZE] {
        let mut buf = [0u8; IMAGE_SIZE];
        buf[0..4].copy_from_slice(&self.class.raw().to_le_bytes());
        buf[4..8].copy_from_slice(&self.instance_size.to_le_bytes());
        buf[8..16].copy_from_slice(&DevicePtr::to_word(self.ancestor).to_le_bytes());
        for (i, slot) in self.slots.iter().enumerate() {
            let offset = 16 + i * 8;
            buf[offset..offset + 8].copy_from_slice(&DevicePtr::to_word(*slot).to_le_bytes());
        }
        buf
    }

    /// 从设备字节解码
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RuntimeError> {
        if bytes.len() != IMAGE_SIZE {
            return Err(RuntimeError::MalformedImage {
                len: bytes.len(),
                expected: IMAGE_SIZE,
            });
        }

        let word = |offset: usize| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&bytes[offset..offset + 8]);
            u64::from_le_bytes(raw)
        };
        let mut half = [0u8; 4];
        half.copy_from_slice(&bytes[0..4]);
        let class = ClassId::from_raw(u32::from_le_bytes(half));
        half.copy_from_slice(&bytes[4..8]);
        let instance_size = u32::from_le_bytes(half);

        let mut slots = [None; Selector::COUNT];
        for (i, slot) in slots.iter_mut().enumerate() {
            *slot = DevicePtr::from_word(word(16 + i * 8));
        }

        Ok(Self {
            class,
            instance_size,
            ancestor: DevicePtr::from_word(word(8)),
            slots,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_layout_offsets() {
        let mut image = ClassImage {
            class: ClassId::from_raw(5),
            instance_size: 1,
            ancestor: Some(DevicePtr(0x1100)),
            slots: [None; Selector::COUNT],
        };
        image.set_slot(Selector::Evaluate, Some(DevicePtr(0xbeef)));

        let bytes = image.to_bytes();
        assert_eq!(bytes.len(), 40);
        assert_eq!(&bytes[0..4], &5u32.to_le_bytes());
        assert_eq!(&bytes[8..16], &0x1100u64.to_le_bytes());
        // construct 和 mirror 槽位为 0
        assert!(bytes[16..32].iter().all(|b| *b == 0));
        assert_eq!(&bytes[32..40], &0xbeefu64.to_le_bytes());

        assert_eq!(ClassImage::from_bytes(&bytes).unwrap(), image);
    }

    #[test]
    fn test_shadow_rejects_oversized_class() {
        let huge = u32::MAX as usize + 1;
        let desc = ClassDescriptor::new(
            ClassId::from_raw(7),
            "Huge".to_string(),
            ClassId::from_raw(1),
            None,
            huge,
        );
        assert_eq!(
            ClassImage::shadow(&desc).unwrap_err(),
            RuntimeError::ImageOverflow {
                class: "Huge".to_string(),
                instance_size: huge
            }
        );

        let desc = ClassDescriptor::new(
            ClassId::from_raw(8),
            "Small".to_string(),
            ClassId::from_raw(1),
            None,
            3,
        );
        let image = ClassImage::shadow(&desc).unwrap();
        assert_eq!(image.instance_size, 3);
        assert_eq!(image.ancestor, None);
    }

    #[test]
    fn test_malformed_image() {
        let err = ClassImage::from_bytes(&[0u8; 12]).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::MalformedImage {
                len: 12,
                expected: IMAGE_SIZE
            }
        );
    }
}
