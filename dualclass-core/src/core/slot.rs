//! 分派槽定义
//!
//! 每个类持有一张定长槽位表，以 `Selector` 为下标。继承在类构造时一次性
//! 复制完成，调用时只做下标查找，不沿继承链搜索。

use super::class::ClassDescriptor;
use super::error::RuntimeError;
use super::handle::{ClassId, DevicePtr};
use super::image::ClassImage;
use super::object::Object;
use super::registry::ClassRegistry;
use super::value::{CtorArgs, Value};
use std::fmt;

/// 选择子
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Selector {
    /// 构造（实例构造器或类构造器）
    Construct = 0,
    /// 设备镜像
    Mirror = 1,
    /// 求值（MechanismClass 扩展的槽位）
    Evaluate = 2,
}

impl Selector {
    /// 槽位总数
    pub const COUNT: usize = 3;

    pub const ALL: [Selector; Selector::COUNT] =
        [Selector::Construct, Selector::Mirror, Selector::Evaluate];

    /// 槽位下标
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Selector::Construct => "construct",
            Selector::Mirror => "mirror",
            Selector::Evaluate => "evaluate",
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==================== 调用约定 ====================

/// 实例构造器：`owner` 是定义该构造器的类，用于祖先委托
pub type InitFn = fn(&ClassRegistry, ClassId, &mut Object, &mut CtorArgs) -> Result<(), RuntimeError>;

/// 类构造器：只出现在元类的构造槽中
pub type ClassInitFn =
    fn(&ClassRegistry, ClassId, &mut ClassDescriptor, &Overrides) -> Result<(), RuntimeError>;

/// 镜像函数：修补影子镜像后交给祖先，最终由根上传
pub type MirrorFn =
    fn(&ClassRegistry, ClassId, ClassImage, bool) -> Result<Option<DevicePtr>, RuntimeError>;

/// 求值函数：(self, 前状态, 后状态, 步长, 绝对时间, 步号) -> 幅值
pub type EvaluateFn = fn(&Receiver<'_>, Option<&Object>, Option<&Object>, f64, f64, u32) -> f64;

/// 槽位中的可调用对象
#[derive(Clone, Copy)]
pub enum Method {
    Init(InitFn),
    ClassInit(ClassInitFn),
    Mirror(MirrorFn),
    Evaluate(EvaluateFn),
}

impl Method {
    /// 该方法填充的槽位
    pub fn selector(&self) -> Selector {
        match self {
            Method::Init(_) | Method::ClassInit(_) => Selector::Construct,
            Method::Mirror(_) => Selector::Mirror,
            Method::Evaluate(_) => Selector::Evaluate,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Method::Init(_) => "Init",
            Method::ClassInit(_) => "ClassInit",
            Method::Mirror(_) => "Mirror",
            Method::Evaluate(_) => "Evaluate",
        }
    }

    fn addr(&self) -> usize {
        match self {
            Method::Init(f) => *f as usize,
            Method::ClassInit(f) => *f as usize,
            Method::Mirror(f) => *f as usize,
            Method::Evaluate(f) => *f as usize,
        }
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:#x})", self.kind(), self.addr())
    }
}

/// 已安装的槽位
#[derive(Debug, Clone, Copy)]
pub struct SlotEntry {
    /// 安装该方法的类（继承时保持不变）
    pub owner: ClassId,
    pub method: Method,
    /// 设备端对应实现的符号名；None 表示仅宿主可用
    pub device_symbol: Option<&'static str>,
}

/// 定长槽位表
#[derive(Debug, Clone, Default)]
pub struct SlotTable([Option<SlotEntry>; Selector::COUNT]);

impl SlotTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, selector: Selector) -> Option<&SlotEntry> {
        self.0[selector.index()].as_ref()
    }

    /// 安装到方法对应的槽位，覆盖已有内容
    pub fn install(&mut self, entry: SlotEntry) {
        self.0[entry.method.selector().index()] = Some(entry);
    }

    /// 已填充的槽位
    pub fn iter(&self) -> impl Iterator<Item = (Selector, &SlotEntry)> {
        Selector::ALL
            .into_iter()
            .filter_map(move |s| self.get(s).map(|entry| (s, entry)))
    }

    pub fn len(&self) -> usize {
        self.0.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ==================== 覆盖列表 ====================

/// 单个覆盖项
#[derive(Debug, Clone, Copy)]
pub struct Override {
    pub method: Method,
    pub device_symbol: Option<&'static str>,
}

/// 类构造时提交的覆盖列表
///
/// 每个槽位默认继承祖先；元类只安装自己认识的选择子，其余静默忽略。
///
/// # Example
/// ```ignore
/// let overrides = Overrides::new()
///     .construct(my_init)
///     .evaluate_on_device(my_eval, "MyMech::device_evaluate");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    entries: Vec<Override>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加任意方法
    pub fn with(mut self, method: Method) -> Self {
        self.entries.push(Override {
            method,
            device_symbol: None,
        });
        self
    }

    /// 覆盖实例构造器
    pub fn construct(self, f: InitFn) -> Self {
        self.with(Method::Init(f))
    }

    /// 覆盖类构造器（定义元类时使用）
    pub fn construct_class(self, f: ClassInitFn) -> Self {
        self.with(Method::ClassInit(f))
    }

    /// 覆盖镜像函数
    pub fn mirror(self, f: MirrorFn) -> Self {
        self.with(Method::Mirror(f))
    }

    /// 覆盖求值函数（仅宿主实现）
    pub fn evaluate(self, f: EvaluateFn) -> Self {
        self.with(Method::Evaluate(f))
    }

    /// 覆盖求值函数，并给出设备端实现的符号名
    pub fn evaluate_on_device(mut self, f: EvaluateFn, device_symbol: &'static str) -> Self {
        self.entries.push(Override {
            method: Method::Evaluate(f),
            device_symbol: Some(device_symbol),
        });
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Override> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ==================== 接收者 ====================

/// 调用约定中的 self
///
/// 除对象本身外还带着注册表和槽位的 owner，覆盖实现据此委托给祖先。
#[derive(Clone, Copy)]
pub struct Receiver<'a> {
    registry: &'a ClassRegistry,
    owner: ClassId,
    object: &'a Object,
}

impl<'a> Receiver<'a> {
    pub fn new(registry: &'a ClassRegistry, owner: ClassId, object: &'a Object) -> Self {
        Self {
            registry,
            owner,
            object,
        }
    }

    pub fn registry(&self) -> &'a ClassRegistry {
        self.registry
    }

    /// 被调用方法所属的类（而非对象的动态类）
    pub fn owner(&self) -> ClassId {
        self.owner
    }

    pub fn object(&self) -> &'a Object {
        self.object
    }

    pub fn field(&self, index: usize) -> Option<Value> {
        self.object.field(index)
    }
}
