//! 注册表实现

use crate::core::target;
use crate::core::{
    ClassDescriptor, ClassId, ClassImage, ClassRegistry, ClassSpec, CtorArgs, Device, DevicePtr,
    Object, Overrides, RuntimeError, Selector, SlotEntry,
};
use crate::runtime::root;
use dualclass_config::RuntimeConfig;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard};
use tracing::info;

// 子模块
mod construct;
mod mirror;

/// 注册表统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryStats {
    /// 已定义的类（含根类）
    pub classes: usize,
    /// 已发布设备镜像的类
    pub mirrored: usize,
}

impl ClassRegistry {
    /// 创建注册表并引导根类 Object 与根元类 Class
    pub fn new(config: RuntimeConfig, device: Option<Arc<dyn Device>>) -> Self {
        let (object, class) = root::boot();
        let object_class = object.id();
        let class_class = class.id();

        let mut classes = Vec::with_capacity(config.initial_class_capacity.max(2));
        let mut names = HashMap::with_capacity(config.initial_class_capacity.max(2));
        for desc in [object, class] {
            names.insert(desc.name().to_string(), desc.id());
            classes.push(Some(Arc::new(desc)));
        }

        info!(
            target: target::REGISTRY,
            mirror_to_device = config.mirror_to_device,
            device = device.as_ref().map(|d| d.name()).unwrap_or("none"),
            "class registry booted"
        );

        Self {
            config,
            classes: RwLock::new(classes),
            names: RwLock::new(names),
            lazy: Mutex::new(HashMap::new()),
            device,
            object_class,
            class_class,
        }
    }

    /// 无加速器、默认配置的注册表
    pub fn host_only() -> Self {
        Self::new(RuntimeConfig::default(), None)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn device(&self) -> Option<&Arc<dyn Device>> {
        self.device.as_ref()
    }

    /// 根类 Object
    pub fn object_class(&self) -> ClassId {
        self.object_class
    }

    /// 根元类 Class
    pub fn class_class(&self) -> ClassId {
        self.class_class
    }

    // ==================== 查询 ====================

    fn read_classes(&self) -> RwLockReadGuard<'_, Vec<Option<Arc<ClassDescriptor>>>> {
        self.classes.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// 获取描述符
    pub fn descriptor(&self, class: ClassId) -> Result<Arc<ClassDescriptor>, RuntimeError> {
        self.read_classes()
            .get(class.index())
            .and_then(Option::clone)
            .ok_or(RuntimeError::UnknownClass(class))
    }

    /// 按名字查找类
    pub fn lookup(&self, name: &str) -> Option<ClassId> {
        self.names
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied()
    }

    /// class_of(object)
    pub fn class_of(&self, object: &Object) -> ClassId {
        object.class()
    }

    /// class_of(class)
    pub fn metaclass_of(&self, class: ClassId) -> Result<ClassId, RuntimeError> {
        Ok(self.descriptor(class)?.metaclass())
    }

    /// ancestor_of(class)
    pub fn ancestor_of(&self, class: ClassId) -> Result<Option<ClassId>, RuntimeError> {
        Ok(self.descriptor(class)?.ancestor())
    }

    /// 沿祖先链判断 `class` 是否为 `ancestor` 或其后代
    pub fn is_subclass_of(&self, class: ClassId, ancestor: ClassId) -> Result<bool, RuntimeError> {
        let mut current = Some(class);
        while let Some(id) = current {
            if id == ancestor {
                return Ok(true);
            }
            current = self.ancestor_of(id)?;
        }
        Ok(false)
    }

    /// 直接查表取槽位（不沿继承链搜索）
    #[inline]
    pub fn dispatch(&self, class: ClassId, selector: Selector) -> Result<Option<SlotEntry>, RuntimeError> {
        let classes = self.read_classes();
        let desc = classes
            .get(class.index())
            .and_then(Option::as_ref)
            .ok_or(RuntimeError::UnknownClass(class))?;
        Ok(desc.slot(selector).copied())
    }

    // ==================== 类定义 ====================

    /// 以 `metaclass` 的类构造器定义新类
    pub fn define_class(&self, metaclass: ClassId, spec: ClassSpec) -> Result<ClassId, RuntimeError> {
        construct::define_class(self, metaclass, spec, false)
    }

    /// 定义元类：由 Class 构造，祖先默认为 Class，class_of 指向自身
    pub fn define_metaclass(&self, mut spec: ClassSpec) -> Result<ClassId, RuntimeError> {
        spec.ancestor.get_or_insert(self.class_class);
        construct::define_class(self, self.class_class, spec, true)
    }

    /// 按名字惰性定义类，同一注册表内每个名字只执行一次 `define`
    pub fn get_or_define<F>(&self, name: &'static str, define: F) -> Result<ClassId, RuntimeError>
    where
        F: FnOnce(&ClassRegistry) -> Result<ClassId, RuntimeError>,
    {
        construct::get_or_define(self, name, define)
    }

    // ==================== 构造链 ====================

    /// 构造实例：写入类引用，执行类的构造槽，校验字段数
    pub fn construct(&self, class: ClassId, args: CtorArgs) -> Result<Object, RuntimeError> {
        construct::construct(self, class, args)
    }

    /// 执行 `owner` 祖先的实例构造器（super ctor）
    pub fn construct_via_ancestor(
        &self,
        owner: ClassId,
        object: &mut Object,
        args: &mut CtorArgs,
    ) -> Result<(), RuntimeError> {
        construct::construct_via_ancestor(self, owner, object, args)
    }

    /// 执行 `owner` 祖先的类构造器（元类的 super ctor）
    pub fn construct_class_via_ancestor(
        &self,
        owner: ClassId,
        desc: &mut ClassDescriptor,
        overrides: &Overrides,
    ) -> Result<(), RuntimeError> {
        construct::construct_class_via_ancestor(self, owner, desc, overrides)
    }

    // ==================== 设备镜像 ====================

    /// 构建 `class` 的设备镜像（不记忆、不发布）
    ///
    /// 经由 class_of(class) 的 mirror 槽执行；无加速器时返回 `Ok(None)`。
    pub fn mirror(&self, class: ClassId, overwrite_ancestor_link: bool) -> Result<Option<DevicePtr>, RuntimeError> {
        mirror::mirror(self, class, overwrite_ancestor_link)
    }

    /// 把影子镜像交给 `owner` 祖先的 mirror 槽（元类的 super mirror）
    pub fn mirror_via_ancestor(
        &self,
        owner: ClassId,
        image: ClassImage,
        overwrite_ancestor_link: bool,
    ) -> Result<Option<DevicePtr>, RuntimeError> {
        mirror::mirror_via_ancestor(self, owner, image, overwrite_ancestor_link)
    }

    /// 记忆化的镜像入口：每个类至多构建一次，成功后发布到设备符号
    pub fn mirror_class(&self, class: ClassId) -> Result<Option<DevicePtr>, RuntimeError> {
        mirror::mirror_class(self, class)
    }

    // ==================== 生命周期 ====================

    /// 已定义的类数
    pub fn class_count(&self) -> usize {
        self.read_classes().iter().filter(|c| c.is_some()).count()
    }

    pub fn stats(&self) -> RegistryStats {
        let classes = self.read_classes();
        let defined = classes.iter().flatten();
        RegistryStats {
            classes: defined.clone().count(),
            mirrored: defined.filter(|d| d.device_mirror().is_some()).count(),
        }
    }

    /// 关闭注册表，释放全部宿主描述符
    ///
    /// 设备镜像归加速器所有，不在这里释放。
    pub fn shutdown(self) -> RegistryStats {
        let stats = self.stats();
        info!(
            target: target::REGISTRY,
            classes = stats.classes,
            mirrored = stats.mirrored,
            "class registry shut down"
        );
        stats
    }
}
