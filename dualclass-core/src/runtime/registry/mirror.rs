//! 设备镜像
//!
//! 镜像由 class_of(class) 的 mirror 槽构建：每层元类修补自己负责的
//! 槽位，再交给祖先元类，最终由根元类 Class 上传。

use crate::core::target;
use crate::core::{
    ClassId, ClassImage, ClassRegistry, DevicePtr, Method, RuntimeError, Selector, SlotEntry,
};
use tracing::{debug, info, trace};

pub(super) fn mirror(
    registry: &ClassRegistry,
    class: ClassId,
    overwrite_ancestor_link: bool,
) -> Result<Option<DevicePtr>, RuntimeError> {
    if registry.device.is_none() {
        return Ok(None);
    }
    let desc = registry.descriptor(class)?;
    match registry.dispatch(desc.metaclass(), Selector::Mirror)? {
        Some(SlotEntry {
            method: Method::Mirror(f),
            owner,
            ..
        }) => f(registry, owner, ClassImage::shadow(&desc)?, overwrite_ancestor_link),
        _ => {
            trace!(target: target::MIRROR, class = %desc.name(), "metaclass has no mirror slot");
            Ok(None)
        }
    }
}

pub(super) fn mirror_via_ancestor(
    registry: &ClassRegistry,
    owner: ClassId,
    image: ClassImage,
    overwrite_ancestor_link: bool,
) -> Result<Option<DevicePtr>, RuntimeError> {
    let Some(ancestor) = registry.ancestor_of(owner)? else {
        return Ok(None);
    };
    match registry.dispatch(ancestor, Selector::Mirror)? {
        Some(SlotEntry {
            method: Method::Mirror(f),
            owner,
            ..
        }) => f(registry, owner, image, overwrite_ancestor_link),
        _ => Ok(None),
    }
}

pub(super) fn mirror_class(
    registry: &ClassRegistry,
    class: ClassId,
) -> Result<Option<DevicePtr>, RuntimeError> {
    let Some(device) = registry.device.as_ref() else {
        return Ok(None);
    };
    let desc = registry.descriptor(class)?;
    if let Some(ptr) = desc.device_mirror() {
        return Ok(Some(ptr));
    }

    let Some(ptr) = mirror(registry, class, true)? else {
        return Ok(None);
    };
    // 上传与符号发布都成功后才记忆
    device.write_symbol(desc.device_symbol(), ptr)?;
    if desc.device_mirror.set(ptr).is_err() {
        // 并发首次镜像：以先记忆者为准，重新发布它的地址
        let winner = desc.device_mirror().unwrap_or(ptr);
        device.write_symbol(desc.device_symbol(), winner)?;
        debug!(
            target: target::MIRROR,
            class = %desc.name(),
            orphan = %ptr,
            "lost mirror race, orphaned image"
        );
        return Ok(Some(winner));
    }

    info!(
        target: target::MIRROR,
        class = %desc.name(),
        symbol = %desc.device_symbol(),
        image = %ptr,
        "class mirrored to device"
    );
    Ok(Some(ptr))
}
