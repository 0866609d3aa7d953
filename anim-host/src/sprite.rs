//! # Sprite 模块
//!
//! 演示用的具体动画目标。

use std::cell::Cell;
use std::fmt;

use anim_runtime::Animatable;
use anim_runtime::animation::{
    PROP_HEIGHT, PROP_SLICE_HEIGHT, PROP_SLICE_WIDTH, PROP_SLICE_X, PROP_SLICE_Y, PROP_WIDTH,
    PROP_X, PROP_Y,
};

/// 透明度属性
pub const PROP_ALPHA: &str = "alpha";

const PROPERTIES: &[&str] = &[
    PROP_X,
    PROP_Y,
    PROP_ALPHA,
    PROP_SLICE_X,
    PROP_SLICE_Y,
    PROP_SLICE_WIDTH,
    PROP_SLICE_HEIGHT,
    PROP_WIDTH,
    PROP_HEIGHT,
];

/// 精灵
///
/// 位置、透明度、切片区域和显示尺寸都可以被动画。
pub struct Sprite {
    name: String,
    x: Cell<f32>,
    y: Cell<f32>,
    alpha: Cell<f32>,
    slice_x: Cell<f32>,
    slice_y: Cell<f32>,
    slice_width: Cell<f32>,
    slice_height: Cell<f32>,
    width: Cell<f32>,
    height: Cell<f32>,
}

impl Sprite {
    /// 在 (x, y) 创建精灵，完全不透明
    pub fn new(name: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            name: name.into(),
            x: Cell::new(x),
            y: Cell::new(y),
            alpha: Cell::new(1.0),
            slice_x: Cell::new(0.0),
            slice_y: Cell::new(0.0),
            slice_width: Cell::new(0.0),
            slice_height: Cell::new(0.0),
            width: Cell::new(0.0),
            height: Cell::new(0.0),
        }
    }

    /// 设置显示尺寸（同时作为整张切片）
    pub fn with_size(self, width: f32, height: f32) -> Self {
        self.width.set(width);
        self.height.set(height);
        self.slice_width.set(width);
        self.slice_height.set(height);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x.get(), self.y.get())
    }

    pub fn alpha(&self) -> f32 {
        self.alpha.get()
    }

    /// 切片区域 (x, y, width, height)
    pub fn slice(&self) -> (f32, f32, f32, f32) {
        (
            self.slice_x.get(),
            self.slice_y.get(),
            self.slice_width.get(),
            self.slice_height.get(),
        )
    }

    /// 是否与可见区域相交
    pub fn is_visible_in(&self, width: f32, height: f32) -> bool {
        let (x, y) = self.position();
        x + self.width.get() >= 0.0 && y + self.height.get() >= 0.0 && x <= width && y <= height
    }

    fn cell(&self, property_id: &str) -> Option<&Cell<f32>> {
        let cell = match property_id {
            PROP_X => &self.x,
            PROP_Y => &self.y,
            PROP_ALPHA => &self.alpha,
            PROP_SLICE_X => &self.slice_x,
            PROP_SLICE_Y => &self.slice_y,
            PROP_SLICE_WIDTH => &self.slice_width,
            PROP_SLICE_HEIGHT => &self.slice_height,
            PROP_WIDTH => &self.width,
            PROP_HEIGHT => &self.height,
            _ => return None,
        };
        Some(cell)
    }
}

impl Animatable for Sprite {
    fn get_property(&self, property_id: &str) -> Option<f32> {
        self.cell(property_id).map(Cell::get)
    }

    fn set_property(&self, property_id: &str, value: f32) -> bool {
        match self.cell(property_id) {
            Some(cell) => {
                // 透明度限制在 [0, 1]
                let value = if property_id == PROP_ALPHA {
                    value.clamp(0.0, 1.0)
                } else {
                    value
                };
                cell.set(value);
                true
            }
            None => false,
        }
    }

    fn property_list(&self) -> &'static [&'static str] {
        PROPERTIES
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

impl fmt::Display for Sprite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x, y) = self.position();
        let (sx, sy, sw, sh) = self.slice();
        write!(
            f,
            "{:<8} pos=({:>8.2}, {:>8.2}) alpha={:.2} slice=({}, {}, {}x{})",
            self.name,
            x,
            y,
            self.alpha(),
            sx,
            sy,
            sw,
            sh
        )
    }
}

impl fmt::Debug for Sprite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sprite")
            .field("name", &self.name)
            .field("position", &self.position())
            .field("alpha", &self.alpha())
            .field("slice", &self.slice())
            .finish()
    }
}
