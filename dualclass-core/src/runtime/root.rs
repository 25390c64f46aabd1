//! 根类 Object 与根元类 Class
//!
//! ```text
//!   Object ──class_of──▶ Class ◀──┐
//!     ▲                    │      │ class_of
//!     └──── ancestor ──────┘──────┘
//! ```

use crate::core::target;
use crate::core::{
    ClassDescriptor, ClassId, ClassImage, ClassRegistry, CtorArgs, DevicePtr, Method, Object,
    Overrides, RuntimeError,
};
use tracing::{debug, trace};

pub const OBJECT_NAME: &str = "Object";
pub const CLASS_NAME: &str = "Class";

/// 创建两个根描述符（下标 0 与 1）
pub(crate) fn boot() -> (ClassDescriptor, ClassDescriptor) {
    let object_id = ClassId::from_raw(0);
    let class_id = ClassId::from_raw(1);

    let mut object = ClassDescriptor::new(object_id, OBJECT_NAME.to_string(), class_id, None, 0);
    object.install(Method::Init(object_init), None);

    let mut class = ClassDescriptor::new(class_id, CLASS_NAME.to_string(), class_id, Some(object_id), 0);
    class.inherit(object.slots());
    class.install(Method::ClassInit(class_init), None);
    class.install(Method::Mirror(class_mirror), None);

    (object, class)
}

/// Object 的构造器
///
/// 类引用在分配时已写入，根类没有字段。
fn object_init(
    _: &ClassRegistry,
    _: ClassId,
    _: &mut Object,
    _: &mut CtorArgs,
) -> Result<(), RuntimeError> {
    Ok(())
}

/// Class 的类构造器：继承祖先全部槽位，再安装 construct / mirror 覆盖
///
/// 其余选择子属于派生元类，这里静默忽略。
pub fn class_init(
    registry: &ClassRegistry,
    _: ClassId,
    desc: &mut ClassDescriptor,
    overrides: &Overrides,
) -> Result<(), RuntimeError> {
    if let Some(ancestor) = desc.ancestor() {
        let ancestor = registry.descriptor(ancestor)?;
        desc.inherit(ancestor.slots());
    }

    for item in overrides.iter() {
        match item.method {
            Method::Init(_) | Method::ClassInit(_) | Method::Mirror(_) => {
                desc.install(item.method, item.device_symbol)
            }
            Method::Evaluate(_) => trace!(
                target: target::REGISTRY,
                class = %desc.name(),
                selector = %item.method.selector(),
                "override ignored by Class"
            ),
        }
    }
    Ok(())
}

/// Class 的镜像函数：链接祖先镜像并上传
///
/// 只有 `overwrite_ancestor_link` 为 true 时才写祖先链接，派生元类交来的
/// 镜像如已由它们填好则保持不变。
pub fn class_mirror(
    registry: &ClassRegistry,
    _: ClassId,
    mut image: ClassImage,
    overwrite_ancestor_link: bool,
) -> Result<Option<DevicePtr>, RuntimeError> {
    let Some(device) = registry.device() else {
        return Ok(None);
    };

    if overwrite_ancestor_link {
        image.ancestor = match registry.ancestor_of(image.class)? {
            Some(ancestor) => registry.mirror_class(ancestor)?,
            None => None,
        };
    }

    let ptr = device.upload(&image.to_bytes())?;
    debug!(
        target: target::MIRROR,
        class = %image.class,
        ancestor = ?image.ancestor,
        image = %ptr,
        "class image uploaded"
    );
    Ok(Some(ptr))
}
