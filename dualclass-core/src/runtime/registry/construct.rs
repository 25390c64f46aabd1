//! 类定义与构造链

use crate::core::target;
use crate::core::{
    ClassDescriptor, ClassId, ClassRegistry, ClassSpec, CtorArgs, Method, Object, Overrides,
    RuntimeError, Selector, SlotEntry,
};
use std::sync::{Arc, PoisonError};
use tracing::{debug, trace};

/// 定义类
///
/// `self_describing` 为 true 时新类的 class_of 指向自身（元类）。
pub(super) fn define_class(
    registry: &ClassRegistry,
    metaclass: ClassId,
    spec: ClassSpec,
    self_describing: bool,
) -> Result<ClassId, RuntimeError> {
    let meta = registry.descriptor(metaclass)?;
    let (init, owner) = match meta.slot(Selector::Construct) {
        Some(SlotEntry {
            method: Method::ClassInit(init),
            owner,
            ..
        }) => (*init, *owner),
        _ => return Err(RuntimeError::NotAMetaclass(meta.name().to_string())),
    };

    if let Some(ancestor) = spec.ancestor {
        registry.descriptor(ancestor)?;
    }
    if registry.lookup(&spec.name).is_some() {
        return Err(RuntimeError::DuplicateClass(spec.name));
    }

    let id = reserve(registry);
    let class_of = if self_describing { id } else { metaclass };
    let mut desc = ClassDescriptor::new(id, spec.name, class_of, spec.ancestor, spec.instance_size);

    // 类构造器负责继承祖先槽位并应用覆盖
    init(registry, owner, &mut desc, &spec.overrides)?;

    let name = desc.name().to_string();
    publish(registry, desc)?;
    debug!(
        target: target::REGISTRY,
        class = %name,
        id = %id,
        metaclass = %meta.name(),
        "class defined"
    );

    Ok(id)
}

/// 预留一个 arena 下标
fn reserve(registry: &ClassRegistry) -> ClassId {
    let mut classes = registry
        .classes
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    classes.push(None);
    ClassId((classes.len() - 1) as u32)
}

/// 登记名字并填入 arena
fn publish(registry: &ClassRegistry, desc: ClassDescriptor) -> Result<(), RuntimeError> {
    let mut names = registry
        .names
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    // 并发定义同名类时后到者失败，预留的下标留作空洞
    if names.contains_key(desc.name()) {
        return Err(RuntimeError::DuplicateClass(desc.name().to_string()));
    }
    names.insert(desc.name().to_string(), desc.id());

    let index = desc.id().index();
    let mut classes = registry
        .classes
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    classes[index] = Some(Arc::new(desc));
    Ok(())
}

pub(super) fn get_or_define<F>(
    registry: &ClassRegistry,
    name: &'static str,
    define: F,
) -> Result<ClassId, RuntimeError>
where
    F: FnOnce(&ClassRegistry) -> Result<ClassId, RuntimeError>,
{
    let cell = registry
        .lazy
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(name)
        .or_default()
        .clone();
    cell.get_or_try_init(|| define(registry)).copied()
}

// ==================== 实例构造 ====================

pub(super) fn construct(
    registry: &ClassRegistry,
    class: ClassId,
    mut args: CtorArgs,
) -> Result<Object, RuntimeError> {
    let desc = registry.descriptor(class)?;
    let (init, owner) = match desc.slot(Selector::Construct) {
        Some(SlotEntry {
            method: Method::Init(init),
            owner,
            ..
        }) => (*init, *owner),
        _ => return Err(RuntimeError::NotInstantiable(desc.name().to_string())),
    };

    let mut object = Object::allocate(class, desc.instance_size());
    init(registry, owner, &mut object, &mut args)?;

    if object.field_count() != desc.instance_size() {
        return Err(RuntimeError::LayoutMismatch {
            class: desc.name().to_string(),
            expected: desc.instance_size(),
            actual: object.field_count(),
        });
    }
    if args.remaining() > 0 {
        trace!(
            target: target::DISPATCH,
            class = %desc.name(),
            unused = args.remaining(),
            "constructor left arguments unconsumed"
        );
    }
    Ok(object)
}

pub(super) fn construct_via_ancestor(
    registry: &ClassRegistry,
    owner: ClassId,
    object: &mut Object,
    args: &mut CtorArgs,
) -> Result<(), RuntimeError> {
    let Some(ancestor) = registry.ancestor_of(owner)? else {
        return Ok(());
    };
    match registry.dispatch(ancestor, Selector::Construct)? {
        Some(SlotEntry {
            method: Method::Init(init),
            owner,
            ..
        }) => init(registry, owner, object, args),
        Some(_) => Err(RuntimeError::NotInstantiable(
            registry.descriptor(ancestor)?.name().to_string(),
        )),
        None => Ok(()),
    }
}

pub(super) fn construct_class_via_ancestor(
    registry: &ClassRegistry,
    owner: ClassId,
    desc: &mut ClassDescriptor,
    overrides: &Overrides,
) -> Result<(), RuntimeError> {
    let Some(ancestor) = registry.ancestor_of(owner)? else {
        return Ok(());
    };
    match registry.dispatch(ancestor, Selector::Construct)? {
        Some(SlotEntry {
            method: Method::ClassInit(init),
            owner,
            ..
        }) => init(registry, owner, desc, overrides),
        Some(_) => Err(RuntimeError::NotAMetaclass(
            registry.descriptor(ancestor)?.name().to_string(),
        )),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;

    fn point_init(
        registry: &ClassRegistry,
        owner: ClassId,
        object: &mut Object,
        args: &mut CtorArgs,
    ) -> Result<(), RuntimeError> {
        registry.construct_via_ancestor(owner, object, args)?;
        object.push_field(args.next_unsigned()?);
        object.push_field(args.next_unsigned()?);
        Ok(())
    }

    fn labelled_init(
        registry: &ClassRegistry,
        owner: ClassId,
        object: &mut Object,
        args: &mut CtorArgs,
    ) -> Result<(), RuntimeError> {
        registry.construct_via_ancestor(owner, object, args)?;
        object.push_field(args.next_float()?);
        Ok(())
    }

    fn forgetful_init(
        _: &ClassRegistry,
        _: ClassId,
        _: &mut Object,
        _: &mut CtorArgs,
    ) -> Result<(), RuntimeError> {
        Ok(())
    }

    fn define_point(registry: &ClassRegistry) -> ClassId {
        registry
            .define_class(
                registry.class_class(),
                ClassSpec::new("Point")
                    .ancestor(registry.object_class())
                    .instance_size(2)
                    .overrides(Overrides::new().construct(point_init)),
            )
            .unwrap()
    }

    #[test]
    fn test_construct_runs_ancestor_first() {
        let registry = ClassRegistry::host_only();
        let point = define_point(&registry);
        let labelled = registry
            .define_class(
                registry.class_class(),
                ClassSpec::new("LabelledPoint")
                    .ancestor(point)
                    .instance_size(3)
                    .overrides(Overrides::new().construct(labelled_init)),
            )
            .unwrap();

        let object = registry
            .construct(labelled, CtorArgs::new([Value::from(1u64), 2u64.into(), 0.5f64.into()]))
            .unwrap();
        assert_eq!(object.class(), labelled);
        assert_eq!(
            object.fields(),
            &[Value::Unsigned(1), Value::Unsigned(2), Value::Float(0.5)]
        );
    }

    #[test]
    fn test_subclass_inherits_constructor() {
        let registry = ClassRegistry::host_only();
        let point = define_point(&registry);
        let alias = registry
            .define_class(
                registry.class_class(),
                ClassSpec::new("AliasPoint").ancestor(point).instance_size(2),
            )
            .unwrap();

        let entry = registry.dispatch(alias, Selector::Construct).unwrap().unwrap();
        assert_eq!(entry.owner, point);
        let object = registry.construct(alias, CtorArgs::new([3u64, 4u64])).unwrap();
        assert_eq!(object.class(), alias);
        assert_eq!(object.field_count(), 2);
    }

    #[test]
    fn test_layout_mismatch() {
        let registry = ClassRegistry::host_only();
        let broken = registry
            .define_class(
                registry.class_class(),
                ClassSpec::new("Broken")
                    .ancestor(registry.object_class())
                    .instance_size(1)
                    .overrides(Overrides::new().construct(forgetful_init)),
            )
            .unwrap();

        let err = registry.construct(broken, CtorArgs::empty()).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::LayoutMismatch {
                class: "Broken".to_string(),
                expected: 1,
                actual: 0
            }
        );
    }

    #[test]
    fn test_missing_argument_propagates() {
        let registry = ClassRegistry::host_only();
        let point = define_point(&registry);
        let err = registry.construct(point, CtorArgs::new([1u64])).unwrap_err();
        assert_eq!(err, RuntimeError::MissingArgument { position: 1 });
    }

    #[test]
    fn test_duplicate_and_not_a_metaclass() {
        let registry = ClassRegistry::host_only();
        let point = define_point(&registry);

        let dup = registry.define_class(registry.class_class(), ClassSpec::new("Point"));
        assert_eq!(dup.unwrap_err(), RuntimeError::DuplicateClass("Point".into()));

        // Point 的构造槽是实例构造器，不能当元类用
        let err = registry
            .define_class(point, ClassSpec::new("Nope"))
            .unwrap_err();
        assert_eq!(err, RuntimeError::NotAMetaclass("Point".into()));
        assert_eq!(registry.lookup("Nope"), None);
    }

    #[test]
    fn test_classes_are_not_instantiable() {
        let registry = ClassRegistry::host_only();
        let err = registry
            .construct(registry.class_class(), CtorArgs::empty())
            .unwrap_err();
        assert_eq!(err, RuntimeError::NotInstantiable("Class".into()));
    }

    #[test]
    fn test_get_or_define_runs_once() {
        let registry = ClassRegistry::host_only();
        let mut calls = 0;
        let first = registry
            .get_or_define("Point", |r| {
                calls += 1;
                Ok(define_point(r))
            })
            .unwrap();
        let second = registry
            .get_or_define("Point", |_| unreachable!("already defined"))
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(calls, 1);
    }
}
