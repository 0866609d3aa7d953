//! # Scheduler 模块
//!
//! 协作式任务调度器。宿主每帧调用一次 [`TimeScheduler::update`]，
//! 调度器在其中触发到期的一次性任务和周期任务。
//!
//! ## 设计说明
//!
//! - `TimeScheduler` 是共享句柄（`Rc<RefCell<..>>`），回调中可以继续调度新任务
//! - 回调执行期间不持有内部借用
//! - 每轮 `update()` 开始时对到期任务做快照，本轮回调新注册的任务推迟到下一轮

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::clock::ClockRef;
use super::timer::Timer;
use crate::error::{EngineResult, SchedulerError};

/// 任务 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// 创建任务 ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// 获取内部 ID 值
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskId({})", self.0)
    }
}

/// 任务回调
pub type TaskCallback = Box<dyn FnMut() -> EngineResult<()>>;

/// 一次性任务
struct Timeout {
    id: TaskId,
    /// 触发时刻（计时器流逝时间）
    fire_at: f64,
    callback: TaskCallback,
}

/// 周期任务
struct Interval {
    id: TaskId,
    /// 上次触发时刻
    last_fire: f64,
    /// 周期（毫秒）
    period: f64,
    /// 执行中为 `None`
    callback: Option<TaskCallback>,
}

struct SchedulerInner {
    timer: Timer,
    timeouts: Vec<Timeout>,
    intervals: Vec<Interval>,
    next_task_id: u64,
}

impl SchedulerInner {
    fn next_task_id(&mut self) -> TaskId {
        let id = TaskId::new(self.next_task_id);
        self.next_task_id += 1;
        id
    }
}

/// 时间调度器
///
/// 克隆得到的句柄共享同一组任务和计时器。
#[derive(Clone)]
pub struct TimeScheduler {
    inner: Rc<RefCell<SchedulerInner>>,
}

impl TimeScheduler {
    /// 基于指定时间源创建调度器
    pub fn new(clock: ClockRef) -> Self {
        Self::with_timer(Timer::new(clock))
    }

    /// 基于现有计时器创建调度器
    pub fn with_timer(timer: Timer) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SchedulerInner {
                timer,
                timeouts: Vec::new(),
                intervals: Vec::new(),
                next_task_id: 1,
            })),
        }
    }

    /// 流逝时间（毫秒，扣除暂停）
    pub fn elapsed(&self) -> f64 {
        self.inner.borrow().timer.elapsed_time()
    }

    /// 注册一次性任务，在 `delay_ms` 之后触发
    pub fn set_timeout(
        &self,
        delay_ms: f64,
        callback: impl FnMut() -> EngineResult<()> + 'static,
    ) -> TaskId {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_task_id();
        let fire_at = inner.timer.elapsed_time() + delay_ms;
        inner.timeouts.push(Timeout {
            id,
            fire_at,
            callback: Box::new(callback),
        });
        id
    }

    /// 取消一次性任务
    ///
    /// # 返回
    /// - `true`: 任务存在且已取消
    /// - `false`: 任务不存在（已触发或已取消）
    pub fn clear_timeout(&self, id: TaskId) -> bool {
        let mut inner = self.inner.borrow_mut();
        match inner.timeouts.iter().position(|t| t.id == id) {
            Some(index) => {
                inner.timeouts.remove(index);
                true
            }
            None => false,
        }
    }

    /// 注册周期任务，每 `period_ms` 触发一次
    pub fn set_interval(
        &self,
        period_ms: f64,
        callback: impl FnMut() -> EngineResult<()> + 'static,
    ) -> TaskId {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_task_id();
        let last_fire = inner.timer.elapsed_time();
        inner.intervals.push(Interval {
            id,
            last_fire,
            period: period_ms,
            callback: Some(Box::new(callback)),
        });
        id
    }

    /// 取消周期任务
    pub fn clear_interval(&self, id: TaskId) -> bool {
        let mut inner = self.inner.borrow_mut();
        match inner.intervals.iter().position(|t| t.id == id) {
            Some(index) => {
                inner.intervals.remove(index);
                true
            }
            None => false,
        }
    }

    /// 执行一轮调度
    ///
    /// 暂停时不做任何事。一次性任务按注册顺序触发，触发前先移除；
    /// 周期任务先推进 `last_fire` 再触发，不补偿错过的周期。
    ///
    /// 任一回调失败都会中止本轮剩余的任务，错误原样向上抛出。
    pub fn update(&self) -> Result<(), SchedulerError> {
        let (elapsed, due_timeouts, interval_ids) = {
            let inner = self.inner.borrow();
            if inner.timer.paused() {
                return Ok(());
            }
            let elapsed = inner.timer.elapsed_time();
            let due: Vec<TaskId> = inner
                .timeouts
                .iter()
                .filter(|t| t.fire_at <= elapsed)
                .map(|t| t.id)
                .collect();
            let intervals: Vec<TaskId> = inner.intervals.iter().map(|t| t.id).collect();
            (elapsed, due, intervals)
        };

        for id in due_timeouts {
            let task = {
                let mut inner = self.inner.borrow_mut();
                // 可能已被本轮之前的回调取消
                match inner.timeouts.iter().position(|t| t.id == id) {
                    Some(index) => inner.timeouts.remove(index),
                    None => continue,
                }
            };
            let mut callback = task.callback;
            callback().map_err(|source| SchedulerError::TimeoutFailed { task: id, source })?;
        }

        for id in interval_ids {
            let callback = {
                let mut inner = self.inner.borrow_mut();
                let Some(interval) = inner.intervals.iter_mut().find(|t| t.id == id) else {
                    continue;
                };
                if interval.last_fire + interval.period > elapsed {
                    continue;
                }
                interval.last_fire = elapsed;
                interval.callback.take()
            };
            let Some(mut callback) = callback else {
                continue;
            };

            let result = callback();

            // 回调可能取消了自身
            if let Some(interval) = self
                .inner
                .borrow_mut()
                .intervals
                .iter_mut()
                .find(|t| t.id == id)
            {
                interval.callback = Some(callback);
            }
            result.map_err(|source| SchedulerError::IntervalFailed { task: id, source })?;
        }

        Ok(())
    }

    /// 清空所有任务
    pub fn clear(&self) {
        let (timeouts, intervals) = {
            let mut inner = self.inner.borrow_mut();
            (
                std::mem::take(&mut inner.timeouts),
                std::mem::take(&mut inner.intervals),
            )
        };
        // 回调可能持有其他句柄，在借用之外释放
        drop(timeouts);
        drop(intervals);
    }

    /// 重置计时器
    pub fn reset(&self) {
        self.inner.borrow_mut().timer.reset();
    }

    /// 暂停
    pub fn pause(&self) {
        self.inner.borrow_mut().timer.pause();
    }

    /// 恢复
    pub fn unpause(&self) {
        self.inner.borrow_mut().timer.unpause();
    }

    /// 是否暂停
    pub fn paused(&self) -> bool {
        self.inner.borrow().timer.paused()
    }

    /// 待触发的一次性任务数量
    pub fn pending_timeouts(&self) -> usize {
        self.inner.borrow().timeouts.len()
    }

    /// 周期任务数量
    pub fn pending_intervals(&self) -> usize {
        self.inner.borrow().intervals.len()
    }

    /// 时间源
    pub fn clock(&self) -> ClockRef {
        self.inner.borrow().timer.clock().clone()
    }
}

impl fmt::Debug for TimeScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("TimeScheduler")
            .field("timer", &inner.timer)
            .field("timeouts", &inner.timeouts.len())
            .field("intervals", &inner.intervals.len())
            .finish()
    }
}
