//! # Target 模块
//!
//! 动画目标接口。目标对象由外部持有，动画只通过 `Animatable`
//! 读写它声明过的数值属性。

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// 位置属性：X
pub const PROP_X: &str = "x";
/// 位置属性：Y
pub const PROP_Y: &str = "y";
/// 切片属性
pub const PROP_SLICE_X: &str = "slice_x";
pub const PROP_SLICE_Y: &str = "slice_y";
pub const PROP_SLICE_WIDTH: &str = "slice_width";
pub const PROP_SLICE_HEIGHT: &str = "slice_height";
/// 显示尺寸
pub const PROP_WIDTH: &str = "width";
pub const PROP_HEIGHT: &str = "height";

/// 可动画对象接口
///
/// 对象通过实现此 trait 声明自己有哪些属性可以被动画。
/// `property_list()` 中的属性会在每个 bundle 开始时被快照，作为插值起点；
/// 至少应包含 `"x"` 和 `"y"`。
///
/// 所有方法都接收 `&self`，对象自行使用内部可变性（`Cell` / `RefCell`）。
///
/// ## 实现示例
///
/// ```rust,ignore
/// struct Ball {
///     x: Cell<f32>,
///     y: Cell<f32>,
/// }
///
/// impl Animatable for Ball {
///     fn get_property(&self, property_id: &str) -> Option<f32> {
///         match property_id {
///             "x" => Some(self.x.get()),
///             "y" => Some(self.y.get()),
///             _ => None,
///         }
///     }
///
///     fn set_property(&self, property_id: &str, value: f32) -> bool {
///         match property_id {
///             "x" => { self.x.set(value); true }
///             "y" => { self.y.set(value); true }
///             _ => false,
///         }
///     }
///
///     fn property_list(&self) -> &'static [&'static str] {
///         &["x", "y"]
///     }
/// }
/// ```
pub trait Animatable {
    /// 获取属性的当前值
    ///
    /// # 返回
    /// - `Some(value)`: 属性存在
    /// - `None`: 属性不存在
    fn get_property(&self, property_id: &str) -> Option<f32>;

    /// 设置属性的新值
    ///
    /// # 返回
    /// - `true`: 设置成功
    /// - `false`: 属性不存在或设置失败
    fn set_property(&self, property_id: &str, value: f32) -> bool;

    /// 可插值属性列表
    fn property_list(&self) -> &'static [&'static str];

    /// 调试用名称
    fn label(&self) -> String {
        "target".to_string()
    }
}

/// 共享的动画目标
pub type TargetRef = Rc<dyn Animatable>;

/// 是否为同一个目标对象
pub fn same_target(a: &TargetRef, b: &TargetRef) -> bool {
    Rc::ptr_eq(a, b)
}

/// 快照目标的所有已声明属性
pub(crate) fn snapshot(target: &TargetRef) -> HashMap<&'static str, f32> {
    target
        .property_list()
        .iter()
        .filter_map(|&name| target.get_property(name).map(|v| (name, v)))
        .collect()
}

/// 基于哈希表的简单目标
///
/// 只接受构造时声明的属性，未声明的属性读写都会失败。
pub struct PropertyBag {
    name: String,
    declared: &'static [&'static str],
    values: RefCell<HashMap<&'static str, f32>>,
}

impl PropertyBag {
    /// 创建目标，所有声明的属性初始为 0
    pub fn new(name: impl Into<String>, declared: &'static [&'static str]) -> Self {
        Self {
            name: name.into(),
            declared,
            values: RefCell::new(declared.iter().map(|&k| (k, 0.0)).collect()),
        }
    }

    /// 设置初始值
    pub fn with(self, property_id: &str, value: f32) -> Self {
        self.set_property(property_id, value);
        self
    }

    /// 读取属性，不存在时返回 NaN
    pub fn get(&self, property_id: &str) -> f32 {
        self.get_property(property_id).unwrap_or(f32::NAN)
    }
}

impl Animatable for PropertyBag {
    fn get_property(&self, property_id: &str) -> Option<f32> {
        self.values.borrow().get(property_id).copied()
    }

    fn set_property(&self, property_id: &str, value: f32) -> bool {
        match self.declared.iter().find(|&&k| k == property_id) {
            Some(&key) => {
                self.values.borrow_mut().insert(key, value);
                true
            }
            None => false,
        }
    }

    fn property_list(&self) -> &'static [&'static str] {
        self.declared
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

impl fmt::Debug for PropertyBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyBag")
            .field("name", &self.name)
            .field("values", &self.values.borrow())
            .finish()
    }
}
