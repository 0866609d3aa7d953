//! # Stage 模块
//!
//! 渲染协作接口与视图。
//!
//! 动画通过 [`Stage`] 注册/注销目标，并把自己的步进任务挂到舞台的调度器上。
//! [`View`] 是默认的舞台实现；[`Director`] 维护视图栈，每帧统一驱动。

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::animation::{TargetRef, same_target};
use crate::error::SchedulerError;
use crate::time::{ClockRef, FrameCounter, TimeScheduler};

/// 渲染协作接口
pub trait Stage {
    /// 注册目标（已注册时忽略）
    fn add(&self, target: TargetRef);

    /// 注销目标
    ///
    /// # 返回
    /// 目标是否曾经注册
    fn remove(&self, target: &TargetRef) -> bool;

    /// 舞台的调度器
    fn scheduler(&self) -> TimeScheduler;
}

/// 共享的舞台句柄
pub type StageRef = Rc<dyn Stage>;

/// 视图
///
/// 拥有一个调度器和一组已注册的目标。
///
/// ## 生命周期
///
/// - `start()`：激活（已激活时忽略）
/// - `pause()` / `unpause()`：暂停调度器，暂停期间 `update()` 不做任何事
/// - `stop()`：注销所有目标，清空并重置调度器
pub struct View {
    name: String,
    scheduler: TimeScheduler,
    targets: RefCell<Vec<TargetRef>>,
    active: Cell<bool>,
    paused: Cell<bool>,
}

impl View {
    /// 创建视图
    pub fn new(name: impl Into<String>, clock: ClockRef) -> Self {
        Self {
            name: name.into(),
            scheduler: TimeScheduler::new(clock),
            targets: RefCell::new(Vec::new()),
            active: Cell::new(false),
            paused: Cell::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 激活视图
    pub fn start(&self) {
        if self.active.get() || self.paused.get() {
            return;
        }
        self.active.set(true);
        debug!(view = %self.name, "视图启动");
    }

    /// 停止视图
    pub fn stop(&self) {
        if !self.active.get() && !self.paused.get() {
            return;
        }
        self.active.set(false);
        self.paused.set(false);

        let targets = std::mem::take(&mut *self.targets.borrow_mut());
        self.scheduler.clear();
        self.scheduler.reset();
        debug!(view = %self.name, targets = targets.len(), "视图停止");
    }

    /// 暂停视图
    pub fn pause(&self) {
        if self.paused.get() || !self.active.get() {
            return;
        }
        self.paused.set(true);
        self.active.set(false);
        self.scheduler.pause();
    }

    /// 恢复视图
    pub fn unpause(&self) {
        if !self.paused.get() {
            return;
        }
        self.paused.set(false);
        self.active.set(true);
        self.scheduler.unpause();
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.get()
    }

    /// 驱动一帧（仅在激活时）
    pub fn update(&self) -> Result<(), SchedulerError> {
        if !self.active.get() {
            return Ok(());
        }
        self.scheduler.update()
    }

    /// 目标是否已注册
    pub fn contains(&self, target: &TargetRef) -> bool {
        self.targets.borrow().iter().any(|t| same_target(t, target))
    }

    pub fn target_count(&self) -> usize {
        self.targets.borrow().len()
    }

    /// 已注册目标（注册顺序）
    pub fn targets(&self) -> Vec<TargetRef> {
        self.targets.borrow().clone()
    }
}

impl Stage for View {
    fn add(&self, target: TargetRef) {
        if self.contains(&target) {
            return;
        }
        debug!(view = %self.name, target = %target.label(), "注册目标");
        self.targets.borrow_mut().push(target);
    }

    fn remove(&self, target: &TargetRef) -> bool {
        let mut targets = self.targets.borrow_mut();
        match targets.iter().position(|t| same_target(t, target)) {
            Some(index) => {
                targets.remove(index);
                debug!(view = %self.name, target = %target.label(), "注销目标");
                true
            }
            None => false,
        }
    }

    fn scheduler(&self) -> TimeScheduler {
        self.scheduler.clone()
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("name", &self.name)
            .field("active", &self.active.get())
            .field("paused", &self.paused.get())
            .field("targets", &self.target_count())
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

/// 视图栈
///
/// 每帧调用一次 [`Director::update_all`]，按入栈顺序驱动所有激活的视图。
pub struct Director {
    views: Vec<Rc<View>>,
    counter: FrameCounter,
}

impl Director {
    /// 创建视图栈
    ///
    /// # 参数
    /// - `fps_window_secs`: FPS 统计窗口（秒）
    pub fn new(clock: ClockRef, fps_window_secs: f64) -> Self {
        Self {
            views: Vec::new(),
            counter: FrameCounter::new(clock, fps_window_secs),
        }
    }

    /// 启动视图并压入栈顶
    pub fn push(&mut self, view: Rc<View>) {
        view.start();
        if !self.views.iter().any(|v| Rc::ptr_eq(v, &view)) {
            self.views.push(view);
        }
    }

    /// 驱动所有视图
    ///
    /// 暂停或已停止的视图会被跳过。
    pub fn update_all(&mut self) -> Result<(), SchedulerError> {
        self.views.retain(|v| v.is_active() || v.is_paused());
        if self.views.is_empty() {
            return Ok(());
        }
        self.counter.tick();
        for view in &self.views {
            view.update()?;
        }
        Ok(())
    }

    /// 自底向上停止所有视图并清空栈
    pub fn clear_views(&mut self) {
        for view in self.views.drain(..) {
            view.stop();
        }
    }

    pub fn views(&self) -> &[Rc<View>] {
        &self.views
    }

    /// 实际 FPS
    pub fn fps(&self) -> f64 {
        self.counter.get()
    }
}

impl fmt::Debug for Director {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Director")
            .field("views", &self.views)
            .field("fps", &self.fps())
            .finish()
    }
}
