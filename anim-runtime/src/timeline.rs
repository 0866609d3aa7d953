//! # TimeLine 模块
//!
//! 按相对时间启动一组可播放对象。
//!
//! `start()` 之后时间轴以零延迟任务的形式每帧检查一次，
//! 把到时的条目按时间顺序启动并移除。条目全部触发后仍然保持运行，
//! 直到 `stop()`。

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, warn};

use crate::clip::Playable;
use crate::error::EngineResult;
use crate::stage::{Stage, StageRef};
use crate::time::TaskId;

struct Entry {
    /// 相对时间轴启动的毫秒数
    offset: f64,
    item: Rc<dyn Playable>,
}

struct TimeLineInner {
    stage: Weak<dyn Stage>,
    /// 按 offset 升序
    entries: Vec<Entry>,
    /// 启动时刻（调度器流逝时间）
    start_time: Option<f64>,
    pending: Option<TaskId>,
}

/// 时间轴
#[derive(Clone)]
pub struct TimeLine {
    inner: Rc<RefCell<TimeLineInner>>,
}

impl TimeLine {
    pub fn new(stage: &StageRef) -> Self {
        Self {
            inner: Rc::new(RefCell::new(TimeLineInner {
                stage: Rc::downgrade(stage),
                entries: Vec::new(),
                start_time: None,
                pending: None,
            })),
        }
    }

    /// 在 `offset_ms` 时启动 `item`
    ///
    /// 相同时间的条目，后加入的排在前面。
    pub fn set(&self, offset_ms: f64, item: Rc<dyn Playable>) -> &Self {
        let mut inner = self.inner.borrow_mut();
        let index = inner
            .entries
            .iter()
            .position(|e| offset_ms <= e.offset)
            .unwrap_or(inner.entries.len());
        inner.entries.insert(
            index,
            Entry {
                offset: offset_ms,
                item,
            },
        );
        drop(inner);
        self
    }

    /// 启动时间轴（已启动时忽略）
    pub fn start(&self) -> EngineResult<()> {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.start_time.is_some() {
                return Ok(());
            }
            let Some(stage) = inner.stage.upgrade() else {
                warn!("舞台已释放，无法启动时间轴");
                return Ok(());
            };
            inner.start_time = Some(stage.scheduler().elapsed());
            debug!(entries = inner.entries.len(), "时间轴启动");
        }
        self.tick()
    }

    /// 停止时间轴
    ///
    /// 取消下一次检查。未触发的条目保留，再次 `start()` 时重新计时。
    pub fn stop(&self) {
        let (pending, stage) = {
            let mut inner = self.inner.borrow_mut();
            inner.start_time = None;
            (inner.pending.take(), inner.stage.upgrade())
        };
        if let (Some(task), Some(stage)) = (pending, stage) {
            stage.scheduler().clear_timeout(task);
        }
        debug!("时间轴停止");
    }

    /// 未触发的条目数量
    pub fn pending(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_running(&self) -> bool {
        self.inner.borrow().start_time.is_some()
    }

    fn tick(&self) -> EngineResult<()> {
        let (stage, start_time) = {
            let mut inner = self.inner.borrow_mut();
            inner.pending = None;
            let Some(start_time) = inner.start_time else {
                return Ok(());
            };
            let Some(stage) = inner.stage.upgrade() else {
                warn!("舞台已释放，时间轴停止");
                return Ok(());
            };
            (stage, start_time)
        };
        let scheduler = stage.scheduler();

        // 先挂下一次检查，条目启动失败不影响时间轴本身
        let this = self.clone();
        let task = scheduler.set_timeout(0.0, move || this.tick());
        self.inner.borrow_mut().pending = Some(task);

        let now = scheduler.elapsed() - start_time;
        loop {
            let entry = {
                let mut inner = self.inner.borrow_mut();
                if !inner.entries.first().is_some_and(|e| e.offset <= now) {
                    break;
                }
                inner.entries.remove(0)
            };
            debug!(offset = entry.offset, "时间轴触发条目");
            entry.item.start()?;
        }
        Ok(())
    }
}

impl fmt::Debug for TimeLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        let offsets: Vec<f64> = inner.entries.iter().map(|e| e.offset).collect();
        f.debug_struct("TimeLine")
            .field("entries", &offsets)
            .field("start_time", &inner.start_time)
            .finish()
    }
}
