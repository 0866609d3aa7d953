//! # Counter 模块
//!
//! 滑动窗口 FPS 统计。

use std::fmt;

use super::clock::ClockRef;

/// 每个统计桶的时长（秒）
const BUCKET_SECS: f64 = 0.1;

/// 帧计数器
///
/// 把时间切分为 100ms 的桶，统计每个桶内的 `tick()` 次数；
/// `get()` 对已填充且非当前的桶取平均，换算为每秒帧数。
pub struct FrameCounter {
    clock: ClockRef,
    /// 桶（环形缓冲）
    buckets: Vec<u32>,
    /// 已填充的最大下标
    filled: usize,
    /// 当前桶下标
    index: usize,
    /// 起始时间（毫秒）
    start_time: f64,
}

impl FrameCounter {
    /// 创建帧计数器
    ///
    /// # 参数
    /// - `window_secs`: 统计窗口长度（秒），非正数时使用 5 秒
    pub fn new(clock: ClockRef, window_secs: f64) -> Self {
        let window = if window_secs > 0.0 { window_secs } else { 5.0 };
        let size = (window / BUCKET_SECS).ceil() as usize + 1;
        let start_time = clock.now();
        Self {
            clock,
            buckets: vec![0; size],
            filled: 0,
            index: 0,
            start_time,
        }
    }

    /// 记录一帧
    pub fn tick(&mut self) {
        let delta_secs = (self.clock.now() - self.start_time) / 1000.0;
        let next = (delta_secs / BUCKET_SECS).floor().max(0.0) as usize % self.buckets.len();

        if next != self.index {
            self.buckets[next] = 0;
        }
        self.buckets[next] += 1;
        self.index = next;

        if next > self.filled {
            self.filled = next;
        }
    }

    /// 当前 FPS 估计值
    ///
    /// 只统计下标小于 `filled` 的桶，并跳过正在填充的桶；没有可用数据时返回 0。
    pub fn get(&self) -> f64 {
        let (sum, count) = self
            .buckets
            .iter()
            .enumerate()
            .take(self.filled)
            .filter(|(i, frames)| *i != self.index && **frames > 0)
            .fold((0u32, 0u32), |(sum, count), (_, frames)| {
                (sum + frames, count + 1)
            });

        if count == 0 {
            return 0.0;
        }
        f64::from(sum) / f64::from(count) / BUCKET_SECS
    }

    /// 重置
    pub fn reset(&mut self) {
        self.index = 0;
        self.filled = 0;
        self.start_time = self.clock.now();
        self.buckets.iter_mut().for_each(|b| *b = 0);
    }
}

impl fmt::Debug for FrameCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameCounter")
            .field("buckets", &self.buckets.len())
            .field("fps", &self.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualClock;
    use std::rc::Rc;

    #[test]
    fn test_empty_counter() {
        let counter = FrameCounter::new(Rc::new(ManualClock::new()), 5.0);
        assert_eq!(counter.get(), 0.0);
    }

    #[test]
    fn test_steady_60_fps() {
        let clock = ManualClock::new();
        let mut counter = FrameCounter::new(Rc::new(clock.clone()), 5.0);

        // 每 100ms 6 帧 = 60 FPS
        for _ in 0..30 {
            for _ in 0..6 {
                counter.tick();
                clock.advance(100.0 / 6.0);
            }
        }
        let fps = counter.get();
        assert!((fps - 60.0).abs() < 10.0, "fps = {fps}");
    }

    #[test]
    fn test_reset() {
        let clock = ManualClock::new();
        let mut counter = FrameCounter::new(Rc::new(clock.clone()), 1.0);
        for _ in 0..20 {
            counter.tick();
            clock.advance(50.0);
        }
        assert!(counter.get() > 0.0);

        counter.reset();
        assert_eq!(counter.get(), 0.0);
    }

    #[test]
    fn test_highest_filled_bucket_is_excluded() {
        let clock = ManualClock::new();
        let mut counter = FrameCounter::new(Rc::new(clock.clone()), 1.0);

        // 桶 0..=9 各 2 帧
        clock.advance(50.0);
        for _ in 0..10 {
            counter.tick();
            counter.tick();
            clock.advance(100.0);
        }
        // 桶 10：8 帧
        for _ in 0..8 {
            counter.tick();
        }
        assert_eq!(counter.get(), 20.0);

        // 回绕到桶 0 后，桶 10 仍不计入
        clock.advance(100.0);
        counter.tick();
        assert_eq!(counter.get(), 20.0);
    }
}
