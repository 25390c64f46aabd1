//! 类描述符定义

use super::handle::{ClassId, DevicePtr};
use super::slot::{Method, Overrides, Selector, SlotEntry, SlotTable};
use once_cell::sync::OnceCell;

/// 类描述符
///
/// 由注册表持有，构造完成后除设备镜像句柄（只写一次）外不可变。
#[derive(Debug)]
pub struct ClassDescriptor {
    pub(crate) id: ClassId,
    pub(crate) name: String,
    /// class_of(本类)
    pub(crate) metaclass: ClassId,
    /// 祖先（非拥有）
    pub(crate) ancestor: Option<ClassId>,
    /// 实例字段数
    pub(crate) instance_size: usize,
    pub(crate) slots: SlotTable,
    /// 设备端发布镜像地址的符号名
    pub(crate) device_symbol: String,
    pub(crate) device_mirror: OnceCell<DevicePtr>,
}

impl ClassDescriptor {
    pub(crate) fn new(
        id: ClassId,
        name: String,
        metaclass: ClassId,
        ancestor: Option<ClassId>,
        instance_size: usize,
    ) -> Self {
        let device_symbol = format!("{name}::device_class");
        Self {
            id,
            name,
            metaclass,
            ancestor,
            instance_size,
            slots: SlotTable::new(),
            device_symbol,
            device_mirror: OnceCell::new(),
        }
    }

    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metaclass(&self) -> ClassId {
        self.metaclass
    }

    pub fn ancestor(&self) -> Option<ClassId> {
        self.ancestor
    }

    pub fn instance_size(&self) -> usize {
        self.instance_size
    }

    #[inline]
    pub fn slot(&self, selector: Selector) -> Option<&SlotEntry> {
        self.slots.get(selector)
    }

    pub fn slots(&self) -> &SlotTable {
        &self.slots
    }

    /// 继承祖先的整张槽位表（类构造器在应用覆盖之前调用）
    pub fn inherit(&mut self, ancestor_slots: &SlotTable) {
        self.slots = ancestor_slots.clone();
    }

    /// 安装一个槽位，owner 为本类
    pub fn install(&mut self, method: Method, device_symbol: Option<&'static str>) {
        self.slots.install(SlotEntry {
            owner: self.id,
            method,
            device_symbol,
        });
    }

    pub fn device_symbol(&self) -> &str {
        &self.device_symbol
    }

    /// 已发布的设备镜像
    pub fn device_mirror(&self) -> Option<DevicePtr> {
        self.device_mirror.get().copied()
    }
}

/// 定义类时提交给元类构造器的参数
#[derive(Debug, Clone)]
pub struct ClassSpec {
    pub name: String,
    pub ancestor: Option<ClassId>,
    pub instance_size: usize,
    pub overrides: Overrides,
}

impl ClassSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ancestor: None,
            instance_size: 0,
            overrides: Overrides::new(),
        }
    }

    pub fn ancestor(mut self, ancestor: ClassId) -> Self {
        self.ancestor = Some(ancestor);
        self
    }

    pub fn instance_size(mut self, fields: usize) -> Self {
        self.instance_size = fields;
        self
    }

    pub fn overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_device_symbol() {
        let desc = ClassDescriptor::new(
            ClassId::from_raw(2),
            "Mechanism".to_string(),
            ClassId::from_raw(1),
            Some(ClassId::from_raw(0)),
            1,
        );
        assert_eq!(desc.device_symbol(), "Mechanism::device_class");
        assert_eq!(desc.device_mirror(), None);
        assert!(desc.slots().is_empty());
    }

    #[test]
    fn test_class_spec_builder() {
        let spec = ClassSpec::new("Spike")
            .ancestor(ClassId::from_raw(3))
            .instance_size(1);
        assert_eq!(spec.name, "Spike");
        assert_eq!(spec.ancestor, Some(ClassId::from_raw(3)));
        assert_eq!(spec.instance_size, 1);
        assert!(spec.overrides.is_empty());
    }
}
