//! MechanismClass / Mechanism
//!
//! MechanismClass 是在 Class 之上增加求值槽的元类；Mechanism 是它的
//! 叶子实例类，携带一个 `source_id` 字段。
//!
//! ```text
//!   Mechanism ──class_of──▶ MechanismClass ──class_of──▶ MechanismClass
//!       │                          │
//!    ancestor                   ancestor
//!       ▼                          ▼
//!     Object                     Class
//! ```

use crate::core::target;
use crate::core::{
    ClassDescriptor, ClassId, ClassImage, ClassRegistry, ClassSpec, CtorArgs, DevicePtr, Method,
    Object, Overrides, Receiver, RuntimeError, Selector, SlotEntry,
};
use tracing::{debug, trace};

/// 元类名
pub const METACLASS_NAME: &str = "MechanismClass";
/// 实例类名
pub const CLASS_NAME: &str = "Mechanism";
/// 默认求值函数的设备端实现
pub const DEVICE_EVALUATE_SYMBOL: &str = "Mechanism::device_evaluate";
/// 设备模块需要导出的内核符号
pub const DEVICE_SYMBOLS: [&str; 1] = [DEVICE_EVALUATE_SYMBOL];
/// `source_id` 所在字段
pub const SOURCE_ID_FIELD: usize = 0;

/// MechanismClass 与 Mechanism 的句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MechanismClasses {
    pub metaclass: ClassId,
    pub class: ClassId,
}

/// 初始化 MechanismClass 与 Mechanism
///
/// 重复调用返回同一对句柄。注册表开启 `mirror_to_device` 且挂有设备时，
/// 返回前两个类各自镜像一次并发布到 `"{Name}::device_class"`。
pub fn init_mechanism(registry: &ClassRegistry) -> Result<MechanismClasses, RuntimeError> {
    let classes = mechanism_classes(registry)?;

    // 定义与镜像分开：镜像失败后再次调用只重试镜像
    if registry.config().mirror_to_device {
        registry.mirror_class(classes.metaclass)?;
        registry.mirror_class(classes.class)?;
    }

    Ok(classes)
}

/// 惰性定义 MechanismClass 与 Mechanism（先元类，后实例类），不做镜像
///
/// 对象构造路径只走这里，永远不触发设备上传。
pub fn mechanism_classes(registry: &ClassRegistry) -> Result<MechanismClasses, RuntimeError> {
    let metaclass = registry.get_or_define(METACLASS_NAME, |r| {
        r.define_metaclass(
            ClassSpec::new(METACLASS_NAME)
                .ancestor(r.class_class())
                .overrides(
                    Overrides::new()
                        .construct_class(mechanism_class_init)
                        .mirror(mechanism_class_mirror),
                ),
        )
    })?;

    let class = registry.get_or_define(CLASS_NAME, |r| {
        r.define_class(
            metaclass,
            ClassSpec::new(CLASS_NAME)
                .ancestor(r.object_class())
                .instance_size(1)
                .overrides(
                    Overrides::new()
                        .construct(mechanism_init)
                        .evaluate_on_device(default_evaluate, DEVICE_EVALUATE_SYMBOL),
                ),
        )
    })?;

    Ok(MechanismClasses { metaclass, class })
}

/// 以 MechanismClass 定义 Mechanism 的子类
///
/// 开启 `mirror_to_device` 时随即镜像；镜像失败时类已定义，可稍后
/// 通过 `mirror_class` 重试。
pub fn define_subclass(
    registry: &ClassRegistry,
    name: impl Into<String>,
    overrides: Overrides,
) -> Result<ClassId, RuntimeError> {
    let classes = init_mechanism(registry)?;
    let ancestor = registry.descriptor(classes.class)?;
    let id = registry.define_class(
        classes.metaclass,
        ClassSpec::new(name)
            .ancestor(classes.class)
            .instance_size(ancestor.instance_size())
            .overrides(overrides),
    )?;
    if registry.config().mirror_to_device {
        registry.mirror_class(id)?;
    }
    Ok(id)
}

// ==================== MechanismClass ====================

/// MechanismClass 的类构造器：先执行 Class 的类构造器，再安装求值覆盖
pub fn mechanism_class_init(
    registry: &ClassRegistry,
    owner: ClassId,
    desc: &mut ClassDescriptor,
    overrides: &Overrides,
) -> Result<(), RuntimeError> {
    registry.construct_class_via_ancestor(owner, desc, overrides)?;

    for item in overrides.iter() {
        if let Method::Evaluate(_) = item.method {
            desc.install(item.method, item.device_symbol);
        }
    }
    Ok(())
}

/// MechanismClass 的镜像函数
///
/// 把求值槽改写为设备端内核地址；需要时链接祖先镜像；随后交给祖先元类
/// 上传，并且不允许祖先再改写祖先链接。
pub fn mechanism_class_mirror(
    registry: &ClassRegistry,
    owner: ClassId,
    mut image: ClassImage,
    overwrite_ancestor_link: bool,
) -> Result<Option<DevicePtr>, RuntimeError> {
    let Some(device) = registry.device() else {
        return Ok(None);
    };
    let desc = registry.descriptor(image.class)?;

    if let Some(symbol) = device_evaluate_symbol(registry, image.class)? {
        let kernel = device.read_symbol(symbol)?;
        image.set_slot(Selector::Evaluate, Some(kernel));
        trace!(
            target: target::MIRROR,
            class = %desc.name(),
            symbol,
            kernel = %kernel,
            "evaluate slot resolved"
        );
    }

    if overwrite_ancestor_link {
        image.ancestor = match desc.ancestor() {
            Some(ancestor) => registry.mirror_class(ancestor)?,
            None => None,
        };
    }

    registry.mirror_via_ancestor(owner, image, false)
}

/// 求值槽在设备端的符号
///
/// 仅宿主实现的覆盖没有设备符号，此时取最近祖先的符号，最终落到
/// `DEVICE_EVALUATE_SYMBOL`。类没有求值槽时返回 None。
pub fn device_evaluate_symbol(
    registry: &ClassRegistry,
    class: ClassId,
) -> Result<Option<&'static str>, RuntimeError> {
    let mut current = Some(class);
    while let Some(id) = current {
        match registry.dispatch(id, Selector::Evaluate)? {
            Some(SlotEntry {
                device_symbol: Some(symbol),
                ..
            }) => return Ok(Some(symbol)),
            Some(entry) => current = registry.ancestor_of(entry.owner)?,
            None => return Ok(None),
        }
    }
    Ok(None)
}

// ==================== Mechanism ====================

/// Mechanism 的构造器：祖先构造后写入 `source_id`
pub fn mechanism_init(
    registry: &ClassRegistry,
    owner: ClassId,
    object: &mut Object,
    args: &mut CtorArgs,
) -> Result<(), RuntimeError> {
    registry.construct_via_ancestor(owner, object, args)?;
    let source_id = args.next_u32()?;
    object.push_field(source_id);
    Ok(())
}

/// 默认求值函数（占位），恒返回 0.0
pub fn default_evaluate(
    receiver: &Receiver<'_>,
    _: Option<&Object>,
    _: Option<&Object>,
    _: f64,
    _: f64,
    _: u32,
) -> f64 {
    let source_id = receiver
        .field(SOURCE_ID_FIELD)
        .and_then(|v| v.as_unsigned());
    debug!(target: target::DISPATCH, source_id = ?source_id, "mechanism evaluated");
    0.0
}

/// 经 class_of(object) 的求值槽分派
pub fn evaluate(
    registry: &ClassRegistry,
    object: &Object,
    pre: Option<&Object>,
    post: Option<&Object>,
    dt: f64,
    global_time: f64,
    step: u32,
) -> Result<f64, RuntimeError> {
    let class = registry.class_of(object);
    match registry.dispatch(class, Selector::Evaluate)? {
        Some(SlotEntry {
            method: Method::Evaluate(f),
            owner,
            ..
        }) => {
            #[cfg(feature = "trace_dispatch")]
            trace!(target: target::DISPATCH, class = %class, owner = %owner, step, "evaluate");
            Ok(f(&Receiver::new(registry, owner, object), pre, post, dt, global_time, step))
        }
        _ => Err(RuntimeError::MissingSlot {
            class: registry.descriptor(class)?.name().to_string(),
            selector: Selector::Evaluate,
        }),
    }
}

/// 执行 `receiver.owner()` 祖先的求值槽（super evaluate）
///
/// # Panics
///
/// 祖先不存在或祖先的求值槽为空时 panic：这是调用方违反了约定，
/// 只有继承自带求值槽的类的覆盖才能委托给祖先。
pub fn evaluate_via_ancestor(
    receiver: &Receiver<'_>,
    pre: Option<&Object>,
    post: Option<&Object>,
    dt: f64,
    global_time: f64,
    step: u32,
) -> f64 {
    let registry = receiver.registry();
    let entry = registry
        .ancestor_of(receiver.owner())
        .ok()
        .flatten()
        .and_then(|ancestor| registry.dispatch(ancestor, Selector::Evaluate).ok().flatten());

    match entry {
        Some(SlotEntry {
            method: Method::Evaluate(f),
            owner,
            ..
        }) => f(
            &Receiver::new(registry, owner, receiver.object()),
            pre,
            post,
            dt,
            global_time,
            step,
        ),
        _ => panic!(
            "evaluate_via_ancestor: ancestor of {} has no evaluate slot",
            receiver.owner()
        ),
    }
}

// ==================== 类型化视图 ====================

/// Mechanism（或其子类）实例的类型化视图
#[derive(Debug, Clone, PartialEq)]
pub struct Mechanism {
    object: Object,
    source_id: u32,
}

impl Mechanism {
    /// 构造一个 Mechanism
    pub fn new(registry: &ClassRegistry, source_id: u32) -> Result<Self, RuntimeError> {
        let classes = mechanism_classes(registry)?;
        Self::with_class(registry, classes.class, source_id)
    }

    /// 构造 Mechanism 子类的实例
    pub fn with_class(
        registry: &ClassRegistry,
        class: ClassId,
        source_id: u32,
    ) -> Result<Self, RuntimeError> {
        let object = registry.construct(class, CtorArgs::new([source_id]))?;
        Self::from_object(registry, object)
    }

    /// 把任意对象视为 Mechanism
    pub fn from_object(registry: &ClassRegistry, object: Object) -> Result<Self, RuntimeError> {
        let classes = mechanism_classes(registry)?;
        if !registry.is_subclass_of(object.class(), classes.class)? {
            return Err(RuntimeError::WrongClass {
                class: registry.descriptor(object.class())?.name().to_string(),
                expected: CLASS_NAME.to_string(),
            });
        }
        let found = object.field(SOURCE_ID_FIELD);
        let source_id = found
            .and_then(|v| v.as_unsigned())
            .and_then(|v| u32::try_from(v).ok())
            .ok_or(RuntimeError::ArgumentType {
                position: SOURCE_ID_FIELD,
                expected: "u32",
                found: found.map_or("nothing", |v| v.type_name()),
            })?;
        Ok(Self { object, source_id })
    }

    pub fn source_id(&self) -> u32 {
        self.source_id
    }

    pub fn class(&self) -> ClassId {
        self.object.class()
    }

    pub fn as_object(&self) -> &Object {
        &self.object
    }

    pub fn into_object(self) -> Object {
        self.object
    }

    /// 求值（经动态分派）
    pub fn evaluate(
        &self,
        registry: &ClassRegistry,
        pre: Option<&Object>,
        post: Option<&Object>,
        dt: f64,
        global_time: f64,
        step: u32,
    ) -> Result<f64, RuntimeError> {
        evaluate(registry, &self.object, pre, post, dt, global_time, step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doubled_dt(_: &Receiver<'_>, _: Option<&Object>, _: Option<&Object>, dt: f64, _: f64, _: u32) -> f64 {
        dt * 2.0
    }

    #[test]
    fn test_metaclass_is_self_describing() {
        let registry = ClassRegistry::host_only();
        let classes = init_mechanism(&registry).unwrap();

        assert_eq!(registry.metaclass_of(classes.metaclass).unwrap(), classes.metaclass);
        assert_eq!(
            registry.ancestor_of(classes.metaclass).unwrap(),
            Some(registry.class_class())
        );
        assert_eq!(registry.metaclass_of(classes.class).unwrap(), classes.metaclass);
        assert_eq!(
            registry.ancestor_of(classes.class).unwrap(),
            Some(registry.object_class())
        );
    }

    #[test]
    fn test_mechanism_slots() {
        let registry = ClassRegistry::host_only();
        let classes = init_mechanism(&registry).unwrap();
        let desc = registry.descriptor(classes.class).unwrap();

        let evaluate = desc.slot(Selector::Evaluate).unwrap();
        assert_eq!(evaluate.owner, classes.class);
        assert_eq!(evaluate.device_symbol, Some(DEVICE_EVALUATE_SYMBOL));
        assert_eq!(desc.instance_size(), 1);
        // 元类本身没有求值槽
        assert!(registry
            .dispatch(classes.metaclass, Selector::Evaluate)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_source_id_stored_verbatim() {
        let registry = ClassRegistry::host_only();
        let mech = Mechanism::new(&registry, u32::MAX).unwrap();
        assert_eq!(mech.source_id(), u32::MAX);
        assert_eq!(mech.as_object().field(SOURCE_ID_FIELD).unwrap().as_unsigned(), Some(u32::MAX as u64));
    }

    #[test]
    fn test_source_id_width_checked() {
        let registry = ClassRegistry::host_only();
        let classes = init_mechanism(&registry).unwrap();
        let err = registry
            .construct(classes.class, CtorArgs::new([u64::MAX]))
            .unwrap_err();
        assert!(matches!(err, RuntimeError::ArgumentType { expected: "u32", .. }));
    }

    #[test]
    fn test_subclass_evaluate_override() {
        let registry = ClassRegistry::host_only();
        let spike = define_subclass(&registry, "Spike", Overrides::new().evaluate(doubled_dt)).unwrap();
        let mech = Mechanism::with_class(&registry, spike, 3).unwrap();
        assert_eq!(mech.evaluate(&registry, None, None, 0.01, 0.0, 0).unwrap(), 0.02);

        let entry = registry.dispatch(spike, Selector::Evaluate).unwrap().unwrap();
        assert_eq!(entry.device_symbol, None);
    }

    #[test]
    fn test_device_symbol_falls_back_to_ancestor() {
        let registry = ClassRegistry::host_only();
        let classes = init_mechanism(&registry).unwrap();
        let fast = define_subclass(
            &registry,
            "Fast",
            Overrides::new().evaluate_on_device(doubled_dt, "Fast::device_evaluate"),
        )
        .unwrap();
        let slow = define_subclass(&registry, "Slow", Overrides::new().evaluate(doubled_dt)).unwrap();
        let slower = registry
            .define_class(
                classes.metaclass,
                ClassSpec::new("Slower")
                    .ancestor(fast)
                    .instance_size(1)
                    .overrides(Overrides::new().evaluate(doubled_dt)),
            )
            .unwrap();

        let symbol = |class| device_evaluate_symbol(&registry, class).unwrap();
        assert_eq!(symbol(classes.class), Some(DEVICE_EVALUATE_SYMBOL));
        assert_eq!(symbol(fast), Some("Fast::device_evaluate"));
        assert_eq!(symbol(slow), Some(DEVICE_EVALUATE_SYMBOL));
        assert_eq!(symbol(slower), Some("Fast::device_evaluate"));
        assert_eq!(symbol(classes.metaclass), None);
        assert_eq!(symbol(registry.object_class()), None);
    }

    #[test]
    fn test_from_object_rejects_foreign_class() {
        let registry = ClassRegistry::host_only();
        let plain = registry
            .define_class(
                registry.class_class(),
                ClassSpec::new("Plain").ancestor(registry.object_class()),
            )
            .unwrap();
        let object = registry.construct(plain, CtorArgs::empty()).unwrap();
        assert_eq!(
            Mechanism::from_object(&registry, object).unwrap_err(),
            RuntimeError::WrongClass {
                class: "Plain".into(),
                expected: CLASS_NAME.into()
            }
        );
    }

    #[test]
    #[should_panic(expected = "has no evaluate slot")]
    fn test_evaluate_via_ancestor_without_slot_panics() {
        let registry = ClassRegistry::host_only();
        let classes = init_mechanism(&registry).unwrap();
        let mech = Mechanism::new(&registry, 1).unwrap();
        // Mechanism 的祖先是 Object，没有求值槽
        let receiver = Receiver::new(&registry, classes.class, mech.as_object());
        evaluate_via_ancestor(&receiver, None, None, 0.1, 0.0, 0);
    }
}
