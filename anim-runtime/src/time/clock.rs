//! # Clock 模块
//!
//! 毫秒时间源。计时器不直接读取系统时间，而是通过 `Clock` 获取，
//! 这样宿主可以用手动时钟驱动确定性的回放与测试。

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

/// 时间源接口
pub trait Clock {
    /// 当前时间（毫秒，单调递增的相对值）
    fn now(&self) -> f64;
}

/// 共享时间源
pub type ClockRef = Rc<dyn Clock>;

/// 系统时钟
///
/// 以创建时刻为零点，读取 `Instant` 的流逝时间。
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// 创建系统时钟
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// 手动时钟
///
/// 时间只在调用 [`ManualClock::advance`] / [`ManualClock::set`] 时前进。
/// 克隆得到的句柄共享同一个时间值。
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    /// 创建从 0 开始的手动时钟
    pub fn new() -> Self {
        Self::default()
    }

    /// 前进指定毫秒
    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }

    /// 直接设置当前时间
    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualClock")
            .field("now", &self.now.get())
            .finish()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared() {
        let clock = ManualClock::new();
        let other = clock.clone();

        clock.advance(16.0);
        assert_eq!(other.now(), 16.0);

        other.set(100.0);
        assert_eq!(clock.now(), 100.0);
    }

    #[test]
    fn test_system_clock_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
