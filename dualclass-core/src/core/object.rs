//! 对象实例定义

use super::handle::ClassId;
use super::value::Value;

/// 对象实例
///
/// 类引用在分配时写入，早于构造链上的任何字段初始化；对象不拥有它的类。
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    class: ClassId,
    fields: Vec<Value>,
}

impl Object {
    pub(crate) fn allocate(class: ClassId, capacity: usize) -> Self {
        Self {
            class,
            fields: Vec::with_capacity(capacity),
        }
    }

    /// class_of(self)
    pub fn class(&self) -> ClassId {
        self.class
    }

    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<Value> {
        self.fields.get(index).copied()
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// 追加字段（构造器按祖先到子类的顺序调用）
    pub fn push_field(&mut self, value: impl Into<Value>) {
        self.fields.push(value.into());
    }
}
