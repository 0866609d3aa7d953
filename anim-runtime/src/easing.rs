//! # Easing 模块
//!
//! 缓动函数，把线性进度映射为调整后的进度。

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

/// 缓动函数类型
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ease {
    /// 线性（匀速）
    #[default]
    None,
    /// 二次缓入（先慢后快）
    Parabolic,
    /// 二次缓出（先快后慢）
    ParabolicReverse,
    /// 三次缓入
    Cubic,
    /// 三次缓出
    CubicReverse,
    /// 正弦缓入缓出
    SineInOut,
    /// 自定义曲线
    #[serde(skip)]
    Custom(fn(f32) -> f32),
}

impl Ease {
    /// 计算缓动值
    ///
    /// # 参数
    /// - `p`: 时间进度，通常在 0.0 - 1.0 之间（不做截断）
    pub fn apply(&self, p: f32) -> f32 {
        match self {
            Ease::None => p,
            Ease::Parabolic => p * p,
            Ease::ParabolicReverse => 1.0 - (p - 1.0) * (p - 1.0),
            Ease::Cubic => p * p * p,
            Ease::CubicReverse => 1.0 - (1.0 - p).powi(3),
            Ease::SineInOut => -((PI * p).cos() - 1.0) / 2.0,
            Ease::Custom(f) => f(p),
        }
    }
}

impl PartialEq for Ease {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Ease::Custom(a), Ease::Custom(b)) => std::ptr::fn_addr_eq(*a, *b),
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_is_identity() {
        for p in [0.0, 0.25, 0.5, 1.0] {
            assert_eq!(Ease::None.apply(p), p);
        }
    }

    #[test]
    fn test_parabolic() {
        assert_eq!(Ease::Parabolic.apply(0.0), 0.0);
        assert_eq!(Ease::Parabolic.apply(0.5), 0.25);
        assert_eq!(Ease::Parabolic.apply(1.0), 1.0);
    }

    #[test]
    fn test_parabolic_reverse() {
        assert_eq!(Ease::ParabolicReverse.apply(0.0), 0.0);
        assert_eq!(Ease::ParabolicReverse.apply(0.5), 0.75);
        assert_eq!(Ease::ParabolicReverse.apply(1.0), 1.0);
    }

    #[test]
    fn test_endpoints() {
        for ease in [Ease::Cubic, Ease::CubicReverse, Ease::SineInOut] {
            assert!(ease.apply(0.0).abs() < 1e-6, "{ease:?}");
            assert!((ease.apply(1.0) - 1.0).abs() < 1e-6, "{ease:?}");
        }
    }

    #[test]
    fn test_no_clamp() {
        // 不截断超出范围的输入
        assert_eq!(Ease::None.apply(1.5), 1.5);
    }

    #[test]
    fn test_custom() {
        fn half(p: f32) -> f32 {
            p / 2.0
        }
        let f: fn(f32) -> f32 = half;
        let ease = Ease::Custom(f);
        assert_eq!(ease.apply(1.0), 0.5);
        assert_eq!(ease, Ease::Custom(f));
        assert_ne!(ease, Ease::None);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Ease::ParabolicReverse).unwrap();
        assert_eq!(json, "\"parabolic_reverse\"");
        let ease: Ease = serde_json::from_str("\"parabolic\"").unwrap();
        assert_eq!(ease, Ease::Parabolic);
    }
}
