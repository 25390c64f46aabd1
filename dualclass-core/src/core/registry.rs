//! 类注册表定义 (Core 层)
//!
//! 纯类型定义，构造、分派与镜像逻辑在 runtime/registry/ 中

use super::class::ClassDescriptor;
use super::device::Device;
use super::handle::ClassId;
use dualclass_config::RuntimeConfig;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// 类注册表
///
/// 持有进程内（或测试内）全部类描述符。描述符以 `ClassId` 为下标存放在
/// arena 中，预留后构造失败的下标保持为空洞。
///
/// 注意：执行逻辑在 runtime/registry/ 中通过 impl ClassRegistry 添加
pub struct ClassRegistry {
    /// 运行时配置
    pub(crate) config: RuntimeConfig,
    /// 描述符 arena
    pub(crate) classes: RwLock<Vec<Option<Arc<ClassDescriptor>>>>,
    /// 类名索引
    pub(crate) names: RwLock<HashMap<String, ClassId>>,
    /// 按名字惰性创建的类（每个名字一个 OnceCell）
    pub(crate) lazy: Mutex<HashMap<&'static str, Arc<OnceCell<ClassId>>>>,
    /// 加速器；None 时镜像请求全部是空操作
    pub(crate) device: Option<Arc<dyn Device>>,
    /// 根类 Object
    pub(crate) object_class: ClassId,
    /// 根元类 Class
    pub(crate) class_class: ClassId,
}
