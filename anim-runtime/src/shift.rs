//! # Shift 模块
//!
//! 位移路径：根据起点、终点和（已缓动的）进度计算中间位置。
//!
//! ## 圆弧路径
//!
//! 以起点→终点为直径作圆，由半弦几何求出初始角，再按
//! `progress * semi * 180°` 扫过角度，结果向下取整到整数坐标。
//!
//! `clockwise` 参数只参与真值判断，而两组变体传入的值都为真，
//! 因此 `Circle` 与 `SemiCircle`、`CircleReverse` 与 `SemiCircleReverse`
//! 两两输出相同。这是既有的运动轨迹，保持不变。

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// 二维坐标
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    /// 创建坐标
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// 线性插值
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            x: self.x + t * (other.x - self.x),
            y: self.y + t * (other.y - self.y),
        }
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// 位移路径类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shift {
    /// 直线
    #[default]
    Line,
    /// 圆弧
    Circle,
    /// 反向圆弧
    CircleReverse,
    /// 半圆
    SemiCircle,
    /// 反向半圆
    SemiCircleReverse,
}

impl Shift {
    /// 计算中间位置
    ///
    /// # 参数
    /// - `from`: 起点
    /// - `to`: 终点
    /// - `percent`: 已缓动的进度
    pub fn apply(&self, from: Point, to: Point, percent: f32) -> Point {
        match self {
            Shift::Line => from.lerp(to, percent),
            Shift::Circle => shift_circle(from, to, percent, 1.0, 2),
            Shift::CircleReverse => shift_circle(from, to, percent, -1.0, 2),
            Shift::SemiCircle => shift_circle(from, to, percent, 1.0, 1),
            Shift::SemiCircleReverse => shift_circle(from, to, percent, -1.0, 1),
        }
    }
}

/// 圆弧插值
///
/// 内部以 f64 计算，避免 f32 的 π 误差在取整时偏出一个像素。
fn shift_circle(from: Point, to: Point, percent: f32, semi: f64, clockwise: u8) -> Point {
    let (fx, fy) = (f64::from(from.x), f64::from(from.y));
    let (tx, ty) = (f64::from(to.x), f64::from(to.y));

    let center_x = (fx + tx) / 2.0;
    let center_y = (fy + ty) / 2.0;

    let h = center_y - fy;
    let w = fx - center_x;
    let dist = (h * h + w * w).sqrt();

    let init_angle = if w == 0.0 {
        if h > 0.0 { -PI / 2.0 } else { PI / 2.0 }
    } else {
        let atan = (h / w.abs()).atan();
        if w > 0.0 { atan } else { PI - atan }
    };

    let sweep = semi * f64::from(percent) * PI;
    let add_angle = if clockwise != 0 { sweep } else { -sweep };
    let angle = init_angle + add_angle;

    Point {
        x: (center_x + dist * angle.cos()).floor() as f32,
        y: (center_y + dist * angle.sin()).floor() as f32,
    }
}
