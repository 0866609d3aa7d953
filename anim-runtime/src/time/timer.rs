//! # Timer 模块
//!
//! 可暂停的计时器。`elapsed_time()` 返回扣除暂停时长后的流逝时间。

use std::fmt;
use std::rc::Rc;

use super::clock::{ClockRef, SystemClock};

/// 计时器
///
/// 不变量：`pause_start.is_some()` 当且仅当处于暂停状态。
pub struct Timer {
    clock: ClockRef,
    start_time: f64,
    pause_start: Option<f64>,
    pause_duration: f64,
    /// 超时时长（毫秒），`None` 表示只作为时钟使用
    timeout: Option<f64>,
}

impl Timer {
    /// 基于指定时间源创建计时器
    pub fn new(clock: ClockRef) -> Self {
        let start_time = clock.now();
        Self {
            clock,
            start_time,
            pause_start: None,
            pause_duration: 0.0,
            timeout: None,
        }
    }

    /// 基于系统时钟创建计时器
    pub fn system() -> Self {
        Self::new(Rc::new(SystemClock::new()))
    }

    /// 设置超时时长（毫秒）
    ///
    /// 0 和 NaN 视为未配置；负数保留，计时器立即过期。
    pub fn with_timeout(mut self, timeout_ms: f64) -> Self {
        self.timeout = (timeout_ms != 0.0 && !timeout_ms.is_nan()).then_some(timeout_ms);
        self
    }

    /// 重置：起点设为当前时间，清除暂停状态
    pub fn reset(&mut self) {
        self.start_time = self.clock.now();
        self.pause_start = None;
        self.pause_duration = 0.0;
    }

    /// 流逝时间（毫秒）
    pub fn elapsed_time(&self) -> f64 {
        let now = self.pause_start.unwrap_or_else(|| self.clock.now());
        now - self.start_time - self.pause_duration
    }

    /// 暂停（已暂停时无效果）
    pub fn pause(&mut self) {
        if self.pause_start.is_none() {
            self.pause_start = Some(self.clock.now());
        }
    }

    /// 恢复（未暂停时无效果）
    pub fn unpause(&mut self) {
        if let Some(start) = self.pause_start.take() {
            self.pause_duration += self.clock.now() - start;
        }
    }

    /// 是否处于暂停状态
    pub fn paused(&self) -> bool {
        self.pause_start.is_some()
    }

    /// 是否已超时
    ///
    /// 未配置超时时长时永远返回 `false`。过期后需要 [`Timer::reset`] 才能复用。
    pub fn expired(&self) -> bool {
        match self.timeout {
            Some(timeout) => self.elapsed_time() > timeout,
            None => false,
        }
    }

    /// 获取时间源
    pub fn clock(&self) -> &ClockRef {
        &self.clock
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("elapsed", &self.elapsed_time())
            .field("paused", &self.paused())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualClock;

    fn manual_timer() -> (ManualClock, Timer) {
        let clock = ManualClock::new();
        let timer = Timer::new(Rc::new(clock.clone()));
        (clock, timer)
    }

    #[test]
    fn test_elapsed_time() {
        let (clock, timer) = manual_timer();
        assert_eq!(timer.elapsed_time(), 0.0);

        clock.advance(250.0);
        assert_eq!(timer.elapsed_time(), 250.0);
    }

    #[test]
    fn test_pause_freezes_elapsed() {
        let (clock, mut timer) = manual_timer();
        clock.advance(100.0);
        timer.pause();
        assert!(timer.paused());

        clock.advance(500.0);
        assert_eq!(timer.elapsed_time(), 100.0);
        clock.advance(500.0);
        assert_eq!(timer.elapsed_time(), 100.0);

        timer.unpause();
        assert!(!timer.paused());
        clock.advance(50.0);
        // 暂停时长被完全扣除
        assert_eq!(timer.elapsed_time(), 150.0);
    }

    #[test]
    fn test_pause_sequence_excludes_all_pauses() {
        let (clock, mut timer) = manual_timer();
        let steps = [(30.0, 70.0), (5.0, 0.0), (120.0, 1000.0), (45.0, 15.0)];
        let mut running = 0.0;

        for (run, paused) in steps {
            clock.advance(run);
            running += run;
            timer.pause();
            clock.advance(paused);
            assert_eq!(timer.elapsed_time(), running);
            timer.unpause();
        }
        assert_eq!(timer.elapsed_time(), running);
    }

    #[test]
    fn test_pause_is_idempotent() {
        let (clock, mut timer) = manual_timer();
        clock.advance(10.0);
        timer.pause();
        clock.advance(10.0);
        // 重复暂停不会改变暂停起点
        timer.pause();
        clock.advance(10.0);
        timer.unpause();
        // 重复恢复不会重复累计
        timer.unpause();
        assert_eq!(timer.elapsed_time(), 10.0);
    }

    #[test]
    fn test_pause_at_time_zero() {
        let (clock, mut timer) = manual_timer();
        timer.pause();
        assert!(timer.paused());
        clock.advance(40.0);
        timer.unpause();
        assert_eq!(timer.elapsed_time(), 0.0);
    }

    #[test]
    fn test_reset() {
        let (clock, mut timer) = manual_timer();
        clock.advance(100.0);
        timer.pause();
        timer.reset();
        assert!(!timer.paused());
        assert_eq!(timer.elapsed_time(), 0.0);
    }

    #[test]
    fn test_expired() {
        let (clock, timer) = manual_timer();
        let timer = timer.with_timeout(100.0);
        clock.advance(100.0);
        assert!(!timer.expired());
        clock.advance(1.0);
        assert!(timer.expired());
    }

    #[test]
    fn test_expired_without_timeout() {
        let (clock, timer) = manual_timer();
        clock.advance(1_000_000.0);
        assert!(!timer.expired());
        assert!(!timer.with_timeout(0.0).expired());
    }

    #[test]
    fn test_negative_timeout_expires_immediately() {
        let (clock, timer) = manual_timer();
        let timer = timer.with_timeout(-5.0);
        assert!(timer.expired());
        clock.advance(1.0);
        assert!(timer.expired());

        let (_, timer) = manual_timer();
        assert!(!timer.with_timeout(f64::NAN).expired());
    }
}
