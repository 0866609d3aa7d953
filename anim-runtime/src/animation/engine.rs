//! # Engine 模块
//!
//! 动画状态机。
//!
//! ## 步进流程
//!
//! 1. 进入新的 bundle 时快照目标属性，记录进入时刻和步数
//! 2. 按插入顺序执行 bundle 中未完成的效果
//! 3. 全部完成或任一效果要求推进时，移动到下一个 bundle
//! 4. 在同一步内继续执行下一个 bundle，直到遇到未完成的效果、
//!    bundle 用完，或 Repeat 回绕
//! 5. 仍在运行时，在调度器上挂一个零延迟任务执行下一步
//!
//! ## 借用规则
//!
//! 读写目标属性、回调、启动其他动画、播放音效、从舞台注销这些外部调用
//! 都在释放内部借用后执行，因此它们可以查询或再次操作同一个动画。
//! 外部调用中途 `clean()` 会使 epoch 变化，被打断的这一步直接结束，不再挂任务。

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace, warn};

use super::effect::{Bundle, DurationKind, EffectKind, EffectSpec, ExecuteFn, PropertySet};
use super::target::{
    PROP_HEIGHT, PROP_SLICE_HEIGHT, PROP_SLICE_WIDTH, PROP_SLICE_X, PROP_SLICE_Y, PROP_WIDTH,
    PROP_X, PROP_Y, TargetRef, snapshot,
};
use super::{AnimationId, AnimationState};
use crate::error::{EngineError, EngineResult};
use crate::shift::Point;
use crate::sound::{Sound, SoundBank};
use crate::stage::{Stage, StageRef};
use crate::time::{TaskId, TimeScheduler};

/// Remove 效果把目标停放到的位置（可见区域之外）
const PARKED_POSITION: f32 = -1000.0;

static NEXT_ANIMATION_ID: AtomicU64 = AtomicU64::new(1);

fn next_animation_id() -> AnimationId {
    AnimationId::new(NEXT_ANIMATION_ID.fetch_add(1, Ordering::Relaxed))
}

/// 需要在借用之外执行的外部调用
enum Callout {
    Write {
        target: TargetRef,
        writes: Vec<(String, f32)>,
    },
    Execute(ExecuteFn),
    Start(Animation),
    Sound {
        bank: Option<Rc<dyn SoundBank>>,
        id: String,
        pause: bool,
    },
    Remove(TargetRef),
    /// Clear 丢弃的 bundle，可能持有回调和其他动画
    Discard(Vec<Bundle>),
}

/// 单个 bundle 执行后的走向
enum Flow {
    /// 继续执行下一个 bundle
    Continue,
    /// 本步结束
    Stop,
    /// 动画在外部调用中被重置
    Aborted,
}

struct AnimationInner {
    target: TargetRef,
    stage: Weak<dyn Stage>,
    sounds: Option<Rc<dyn SoundBank>>,
    bundles: Vec<Bundle>,
    /// 当前 bundle 下标，Repeat 回绕时短暂为 -1
    current: isize,
    last: isize,
    /// 进入当前 bundle 时的目标属性
    origin: HashMap<&'static str, f32>,
    /// 进入当前 bundle 的时刻（调度器流逝时间）
    start_time: f64,
    /// 已执行的步数
    frame_count: u64,
    /// 进入当前 bundle 时的步数
    entry_frame: u64,
    state: AnimationState,
    /// 目标是否已注册到舞台
    registered: bool,
    pending: Option<TaskId>,
    /// 每次 `clean()` 递增
    epoch: u64,
}

impl AnimationInner {
    fn new(
        target: TargetRef,
        stage: Weak<dyn Stage>,
        sounds: Option<Rc<dyn SoundBank>>,
        bundles: Vec<Bundle>,
    ) -> Self {
        Self {
            target,
            stage,
            sounds,
            bundles,
            current: 0,
            last: -1,
            origin: HashMap::new(),
            start_time: 0.0,
            frame_count: 0,
            entry_frame: 0,
            state: AnimationState::Idle,
            registered: false,
            pending: None,
            epoch: 0,
        }
    }

    fn reset(&mut self) {
        self.current = 0;
        self.last = -1;
        self.origin.clear();
        self.start_time = 0.0;
        self.frame_count = 0;
        self.entry_frame = 0;
        self.state = AnimationState::Idle;
    }

    /// 执行 bundle `index` 中的第 `slot` 个效果
    ///
    /// Clear 会改变 bundle 下标，`index` 随之更新。
    fn step_effect(
        &mut self,
        id: AnimationId,
        index: &mut usize,
        slot: usize,
        elapsed: f64,
        rewound: &mut bool,
    ) -> EngineResult<Option<Callout>> {
        let effect = &self.bundles[*index].effects[slot];
        if effect.complete {
            return Ok(None);
        }
        if matches!(effect.kind, EffectKind::Clear) {
            let dropped = self.clear_before(id, index, slot);
            return Ok((!dropped.is_empty()).then_some(Callout::Discard(dropped)));
        }
        if matches!(effect.kind, EffectKind::Repeat { .. }) {
            self.repeat(id, *index, slot, rewound);
            return Ok(None);
        }

        let frame_delta = (self.frame_count - self.entry_frame) as f64;
        let time_delta = elapsed - self.start_time;

        let effect = &mut self.bundles[*index].effects[slot];
        let callout = match &effect.kind {
            EffectKind::PropertySet(set) => {
                let delta = match set.duration {
                    DurationKind::Frames(_) => frame_delta,
                    DurationKind::Time(_) => time_delta,
                    DurationKind::None => 0.0,
                };
                let (percent, finished) = set.progress(delta);
                let writes = plan_properties(&self.origin, set, percent);
                effect.complete = finished;
                (!writes.is_empty()).then(|| Callout::Write {
                    target: self.target.clone(),
                    writes,
                })
            }
            EffectKind::Execute(f) => {
                let f = f.clone();
                effect.complete = true;
                Some(Callout::Execute(f))
            }
            EffectKind::StartAnimation(other) => {
                let other = other.clone();
                effect.complete = true;
                debug!(id = %id, other = %other.id(), "启动关联动画");
                Some(Callout::Start(other))
            }
            EffectKind::Sound(sound_id) | EffectKind::PauseSound(sound_id) => {
                let pause = matches!(effect.kind, EffectKind::PauseSound(_));
                let sound = sound_id.clone();
                effect.complete = true;
                Some(Callout::Sound {
                    bank: self.sounds.clone(),
                    id: sound,
                    pause,
                })
            }
            EffectKind::Remove => {
                effect.complete = true;
                self.registered = false;
                Some(Callout::Remove(self.target.clone()))
            }
            EffectKind::Clear | EffectKind::Repeat { .. } => None,
        };
        Ok(callout)
    }

    /// 取出当前 bundle 之前的所有 bundle，下标整体前移
    ///
    /// 取出的 bundle 由调用方在借用之外释放。
    fn clear_before(&mut self, id: AnimationId, index: &mut usize, slot: usize) -> Vec<Bundle> {
        let dropped = *index;
        self.bundles[dropped].effects[slot].complete = true;
        if dropped == 0 {
            return Vec::new();
        }
        let removed: Vec<Bundle> = self.bundles.drain(..dropped).collect();
        let shift = dropped as isize;
        self.current -= shift;
        self.last -= shift;
        *index = 0;
        debug!(id = %id, dropped, "清除已执行的 bundle");
        removed
    }

    fn repeat(&mut self, id: AnimationId, index: usize, slot: usize, rewound: &mut bool) {
        let EffectKind::Repeat { remaining, .. } = self.bundles[index].effects[slot].kind else {
            return;
        };

        if remaining != 0 {
            self.bundles
                .iter_mut()
                .flat_map(|b| b.effects.iter_mut())
                .for_each(|e| e.reset_flags());
        }

        let remaining = match remaining {
            0 => 0,
            n => {
                self.current = -1;
                *rewound = true;
                if n > 0 { n - 1 } else { n }
            }
        };
        if *rewound {
            debug!(id = %id, remaining, "重复播放");
        }

        let effect = &mut self.bundles[index].effects[slot];
        if let EffectKind::Repeat { remaining: r, .. } = &mut effect.kind {
            *r = remaining;
        }
        effect.complete = remaining == 0;
        effect.next = true;
    }
}

fn lookup_sound(sounds: Option<&dyn SoundBank>, id: &str) -> EngineResult<Rc<dyn Sound>> {
    sounds
        .and_then(|bank| bank.get(id))
        .ok_or_else(|| EngineError::SoundNotFound { id: id.to_string() })
}

/// 两个值是否不同（两者都缺失时视为相同）
fn differs(a: f32, b: f32) -> bool {
    !(a == b || (a.is_nan() && b.is_nan()))
}

/// 按进度计算要写入的属性
///
/// x/y 以外的属性线性插值；x/y 只要有一个与起点不同，就整体交给 Shift 计算。
/// 起点中没有的属性按 NaN 处理。
fn plan_properties(
    origin: &HashMap<&'static str, f32>,
    set: &PropertySet,
    percent: f32,
) -> Vec<(String, f32)> {
    let origin_of = |name: &str| origin.get(name).copied().unwrap_or(f32::NAN);
    let mut writes = Vec::with_capacity(set.targets.len());

    for (name, value) in &set.targets {
        if name == PROP_X || name == PROP_Y {
            continue;
        }
        let from = origin_of(name);
        writes.push((name.clone(), from + percent * (value - from)));
    }

    let from = Point::new(origin_of(PROP_X), origin_of(PROP_Y));
    let to = Point::new(
        set.get(PROP_X).unwrap_or(from.x),
        set.get(PROP_Y).unwrap_or(from.y),
    );
    if differs(to.x, from.x) || differs(to.y, from.y) {
        let position = set.shift.apply(from, to, percent);
        writes.push((PROP_X.to_string(), position.x));
        writes.push((PROP_Y.to_string(), position.y));
    }
    writes
}

/// 动画句柄
///
/// 克隆得到的句柄共享同一份状态。构建方法返回 `&Self` 以便链式调用：
///
/// ```rust,ignore
/// let anim = Animation::new(target, &stage);
/// anim.move_to(100.0, 0.0).wait(30).repeat_forever();
/// anim.start()?;
/// ```
#[derive(Clone)]
pub struct Animation {
    id: AnimationId,
    inner: Rc<RefCell<AnimationInner>>,
}

impl Animation {
    /// 创建绑定 `target` 的空动画
    ///
    /// 动画只持有舞台的弱引用。
    pub fn new(target: TargetRef, stage: &StageRef) -> Self {
        Self::from_inner(AnimationInner::new(
            target,
            Rc::downgrade(stage),
            None,
            Vec::new(),
        ))
    }

    fn from_inner(inner: AnimationInner) -> Self {
        Self {
            id: next_animation_id(),
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    /// 挂载音效库
    pub fn with_sounds(self, sounds: Rc<dyn SoundBank>) -> Self {
        let previous = match self.inner.try_borrow_mut() {
            Ok(mut inner) => inner.sounds.replace(sounds),
            Err(_) => None,
        };
        drop(previous);
        self
    }

    pub fn id(&self) -> AnimationId {
        self.id
    }

    fn try_inner(&self) -> EngineResult<RefMut<'_, AnimationInner>> {
        self.inner
            .try_borrow_mut()
            .map_err(|_| EngineError::Reentrant { id: self.id })
    }

    fn try_inner_ref(&self) -> EngineResult<Ref<'_, AnimationInner>> {
        self.inner
            .try_borrow()
            .map_err(|_| EngineError::Reentrant { id: self.id })
    }

    // ========== 构建 ==========

    /// 添加一个 bundle，每个描述对应一个效果
    ///
    /// 没有描述时不添加。
    pub fn animate(&self, specs: impl IntoIterator<Item = EffectSpec>) -> &Self {
        let bundle = Bundle::from_specs(specs);
        if bundle.effects.is_empty() {
            return self;
        }
        self.push_bundle(bundle)
    }

    fn single(&self, spec: EffectSpec) -> &Self {
        self.push_bundle(Bundle::from_specs([spec]))
    }

    /// 追加 bundle，已完成的动画会被重新唤醒
    fn push_bundle(&self, bundle: Bundle) -> &Self {
        let wake = match self.inner.try_borrow_mut() {
            Ok(mut inner) => {
                inner.bundles.push(bundle);
                if inner.state == AnimationState::Completed {
                    inner.state = AnimationState::Running;
                    true
                } else {
                    false
                }
            }
            Err(_) => {
                warn!(id = %self.id, "动画正在执行，忽略追加的 bundle");
                return self;
            }
        };
        if wake {
            debug!(id = %self.id, "已完成的动画追加 bundle，重新运行");
            self.arm();
        }
        self
    }

    /// 立即移动到 (x, y)
    pub fn move_to(&self, x: f32, y: f32) -> &Self {
        self.single(EffectSpec::new().position(x, y))
    }

    /// 设置切片区域，同时更新显示尺寸
    pub fn set_slice(&self, x: f32, y: f32, width: f32, height: f32) -> &Self {
        self.single(
            EffectSpec::new()
                .prop(PROP_SLICE_X, x)
                .prop(PROP_SLICE_Y, y)
                .prop(PROP_WIDTH, width)
                .prop(PROP_HEIGHT, height)
                .prop(PROP_SLICE_WIDTH, width)
                .prop(PROP_SLICE_HEIGHT, height),
        )
    }

    /// 等待若干步
    pub fn wait(&self, frames: u32) -> &Self {
        self.single(EffectSpec::new().with_frames(f64::from(frames)))
    }

    /// 等待若干毫秒
    pub fn wait_time(&self, ms: f64) -> &Self {
        self.single(EffectSpec::new().with_time(ms))
    }

    /// 移出可见区域并从舞台注销
    pub fn remove(&self) -> &Self {
        self.single(EffectSpec::remove())
    }

    /// 从头重复 `times` 次，负数表示无限
    pub fn repeat(&self, times: i32) -> &Self {
        self.single(EffectSpec::repeat(times))
    }

    pub fn repeat_forever(&self) -> &Self {
        self.repeat(-1)
    }

    /// 启动另一个动画（不等待它完成）
    pub fn start_animation(&self, other: &Animation) -> &Self {
        self.single(EffectSpec::start(other))
    }

    pub fn execute(&self, f: impl Fn() -> EngineResult<()> + 'static) -> &Self {
        self.single(EffectSpec::execute(f))
    }

    pub fn sound(&self, id: impl Into<String>) -> &Self {
        self.single(EffectSpec::sound(id))
    }

    pub fn pause_sound(&self, id: impl Into<String>) -> &Self {
        self.single(EffectSpec::pause_sound(id))
    }

    /// 丢弃已经执行过的 bundle
    pub fn clear(&self) -> &Self {
        self.single(EffectSpec::clear())
    }

    // ========== 运行 ==========

    /// 启动动画
    ///
    /// 只对未启动且有 bundle 的动画生效。首次启动时把目标注册到舞台，
    /// 然后立即执行第一步。
    pub fn start(&self) -> EngineResult<()> {
        let stage = {
            let inner = self.try_inner()?;
            if inner.state != AnimationState::Idle || inner.bundles.is_empty() {
                return Ok(());
            }
            inner.stage.upgrade()
        };
        let Some(stage) = stage else {
            warn!(id = %self.id, "舞台已释放，无法启动动画");
            return Ok(());
        };
        let now = stage.scheduler().elapsed();

        let register = {
            let mut inner = self.try_inner()?;
            if inner.state != AnimationState::Idle || inner.bundles.is_empty() {
                return Ok(());
            }
            inner.state = AnimationState::Running;
            inner.start_time = now;
            let register = !inner.registered;
            inner.registered = true;
            register.then(|| inner.target.clone())
        };

        if let Some(target) = register {
            stage.add(target);
        }
        debug!(id = %self.id, bundles = self.bundle_count(), "动画开始");
        self.step()
    }

    /// 执行一步
    ///
    /// 通常由调度器调用。空动画或非运行状态时直接返回，不再挂任务。
    pub fn step(&self) -> EngineResult<()> {
        let (epoch, stage) = {
            let mut inner = self.try_inner()?;
            if inner.state != AnimationState::Running || inner.bundles.is_empty() {
                return Ok(());
            }
            let Some(stage) = inner.stage.upgrade() else {
                warn!(id = %self.id, "舞台已释放，动画停止步进");
                return Ok(());
            };
            inner.frame_count += 1;
            (inner.epoch, stage)
        };
        let scheduler = stage.scheduler();

        loop {
            match self.step_bundle(epoch, &stage, &scheduler)? {
                Flow::Continue => {}
                Flow::Stop => break,
                Flow::Aborted => return Ok(()),
            }
        }
        self.arm();
        Ok(())
    }

    fn step_bundle(
        &self,
        epoch: u64,
        stage: &StageRef,
        scheduler: &TimeScheduler,
    ) -> EngineResult<Flow> {
        let (mut index, effect_count, entering) = {
            let inner = self.try_inner()?;
            if inner.epoch != epoch {
                return Ok(Flow::Aborted);
            }
            let index = match usize::try_from(inner.current) {
                Ok(index) if index < inner.bundles.len() => index,
                _ => return Ok(Flow::Stop),
            };
            let entering = (inner.current != inner.last).then(|| inner.target.clone());
            (index, inner.bundles[index].effects.len(), entering)
        };

        if let Some(target) = entering {
            let origin = snapshot(&target);
            let mut inner = self.try_inner()?;
            if inner.epoch != epoch {
                return Ok(Flow::Aborted);
            }
            inner.origin = origin;
            inner.start_time = scheduler.elapsed();
            inner.entry_frame = inner.frame_count;
            inner.last = inner.current;
            debug!(id = %self.id, bundle = index, "进入 bundle");
        }

        let mut rewound = false;
        for slot in 0..effect_count {
            let callout = {
                let mut inner = self.try_inner()?;
                if inner.epoch != epoch {
                    return Ok(Flow::Aborted);
                }
                let elapsed = scheduler.elapsed();
                inner.step_effect(self.id, &mut index, slot, elapsed, &mut rewound)?
            };
            if let Some(callout) = callout {
                run_callout(self.id, callout, stage)?;
            }
        }

        let mut inner = self.try_inner()?;
        if inner.epoch != epoch {
            return Ok(Flow::Aborted);
        }
        if !inner.bundles.get(index).is_none_or(Bundle::can_advance) {
            return Ok(Flow::Stop);
        }

        inner.current += 1;
        if inner.current >= inner.bundles.len() as isize {
            inner.state = AnimationState::Completed;
            debug!(id = %self.id, "动画完成");
            return Ok(Flow::Stop);
        }
        if rewound {
            return Ok(Flow::Stop);
        }
        Ok(Flow::Continue)
    }

    /// 在调度器上挂下一步
    fn arm(&self) {
        let stage = {
            let inner = self.inner.borrow();
            if inner.state != AnimationState::Running || inner.pending.is_some() {
                return;
            }
            inner.stage.upgrade()
        };
        let Some(stage) = stage else {
            warn!(id = %self.id, "舞台已释放，动画无法继续");
            return;
        };

        let this = self.clone();
        let task = stage.scheduler().set_timeout(0.0, move || this.fire());
        self.inner.borrow_mut().pending = Some(task);
    }

    /// 调度任务入口
    fn fire(&self) -> EngineResult<()> {
        self.try_inner()?.pending = None;
        self.step()
    }

    /// 完全重置
    ///
    /// 取消待执行的步进任务，清空 bundle，回到未启动状态。
    /// 目标的注册状态保持不变。
    pub fn clean(&self) -> EngineResult<()> {
        let (pending, stage, bundles) = {
            let mut inner = self.try_inner()?;
            inner.epoch += 1;
            inner.reset();
            (
                inner.pending.take(),
                inner.stage.upgrade(),
                std::mem::take(&mut inner.bundles),
            )
        };
        // 效果可能持有其他动画，在借用之外释放
        drop(bundles);

        if let (Some(task), Some(stage)) = (pending, stage) {
            stage.scheduler().clear_timeout(task);
        }
        debug!(id = %self.id, "动画已重置");
        Ok(())
    }

    /// 复制动画
    ///
    /// 新动画绑定 `target`（为 `None` 时沿用当前目标），拥有独立的完成标记，
    /// 从未启动状态开始。新目标会立即注册到舞台。
    pub fn duplicate(&self, target: Option<TargetRef>) -> EngineResult<Animation> {
        let (target, stage, sounds, bundles) = {
            let inner = self.try_inner_ref()?;
            (
                target.unwrap_or_else(|| inner.target.clone()),
                inner.stage.clone(),
                inner.sounds.clone(),
                inner.bundles.iter().map(Bundle::fresh).collect(),
            )
        };

        let copy = Self::from_inner(AnimationInner::new(
            target.clone(),
            stage.clone(),
            sounds,
            bundles,
        ));
        match stage.upgrade() {
            Some(stage) => {
                stage.add(target);
                copy.inner.borrow_mut().registered = true;
            }
            None => warn!(id = %self.id, "舞台已释放，复制的目标未注册"),
        }
        debug!(id = %self.id, copy = %copy.id, "复制动画");
        Ok(copy)
    }

    /// 平移
    ///
    /// 同时作用于目标当前位置、所有声明了 x/y 的效果，以及当前 bundle 的起点快照。
    pub fn offset(&self, dx: f32, dy: f32) -> EngineResult<()> {
        let target = self.try_inner()?.target.clone();
        for (name, delta) in [(PROP_X, dx), (PROP_Y, dy)] {
            if let Some(value) = target.get_property(name) {
                target.set_property(name, value + delta);
            }
        }

        let mut inner = self.try_inner()?;
        let inner = &mut *inner;
        for (name, delta) in [(PROP_X, dx), (PROP_Y, dy)] {
            for effect in inner.bundles.iter_mut().flat_map(|b| b.effects.iter_mut()) {
                if let EffectKind::PropertySet(set) = &mut effect.kind {
                    set.offset_field(name, delta);
                }
            }
            if let Some(origin) = inner.origin.get_mut(name) {
                *origin += delta;
            }
        }
        Ok(())
    }

    // ========== 查询 ==========

    pub fn state(&self) -> AnimationState {
        self.inner.borrow().state
    }

    /// 当前 bundle 下标
    pub fn current_index(&self) -> isize {
        self.inner.borrow().current
    }

    pub fn bundle_count(&self) -> usize {
        self.inner.borrow().bundles.len()
    }

    pub fn target(&self) -> TargetRef {
        self.inner.borrow().target.clone()
    }

    /// 目标是否已注册到舞台
    pub fn is_registered(&self) -> bool {
        self.inner.borrow().registered
    }

    /// 是否有待执行的步进任务
    pub fn has_pending_step(&self) -> bool {
        self.inner.borrow().pending.is_some()
    }
}

fn run_callout(id: AnimationId, callout: Callout, stage: &StageRef) -> EngineResult<()> {
    match callout {
        Callout::Write { target, writes } => {
            for (name, value) in &writes {
                if !target.set_property(name, *value) {
                    trace!(id = %id, property = %name, "目标拒绝写入属性");
                }
            }
            Ok(())
        }
        Callout::Execute(f) => f(),
        Callout::Start(other) => other.start(),
        Callout::Sound {
            bank,
            id: sound_id,
            pause,
        } => {
            let sound = lookup_sound(bank.as_deref(), &sound_id)?;
            if pause {
                debug!(id = %id, sound = %sound_id, "暂停音效");
                sound.pause();
            } else {
                debug!(id = %id, sound = %sound_id, "播放音效");
                sound.play();
            }
            Ok(())
        }
        Callout::Remove(target) => {
            target.set_property(PROP_X, PARKED_POSITION);
            target.set_property(PROP_Y, PARKED_POSITION);
            debug!(id = %id, target = %target.label(), "移除目标");
            stage.remove(&target);
            Ok(())
        }
        Callout::Discard(bundles) => {
            drop(bundles);
            Ok(())
        }
    }
}

impl fmt::Debug for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Animation");
        s.field("id", &self.id);
        match self.inner.try_borrow() {
            Ok(inner) => s
                .field("state", &inner.state)
                .field("current", &inner.current)
                .field("bundles", &inner.bundles.len())
                .field("target", &inner.target.label()),
            Err(_) => s.field("state", &"<borrowed>"),
        };
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{Animatable, PropertyBag};
    use crate::sound::SoundLibrary;
    use crate::stage::View;
    use crate::time::ManualClock;
    use std::cell::Cell;

    const FIELDS: &[&str] = &["x", "y", "alpha"];

    struct Harness {
        clock: ManualClock,
        view: Rc<View>,
        stage: StageRef,
    }

    impl Harness {
        fn new() -> Self {
            let clock = ManualClock::new();
            let view = Rc::new(View::new("test", Rc::new(clock.clone())));
            view.start();
            let stage: StageRef = view.clone();
            Self { clock, view, stage }
        }

        fn tick(&self, ms: f64) {
            self.clock.advance(ms);
            self.view.update().unwrap();
        }
    }

    fn bag() -> Rc<PropertyBag> {
        Rc::new(PropertyBag::new("ball", FIELDS))
    }

    fn counter() -> (Rc<Cell<u32>>, impl Fn() -> EngineResult<()> + 'static) {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        (count, move || {
            c.set(c.get() + 1);
            Ok(())
        })
    }

    #[test]
    fn test_start_without_bundles_is_noop() {
        let h = Harness::new();
        let target = bag();
        let anim = Animation::new(target.clone(), &h.stage);

        anim.start().unwrap();
        assert_eq!(anim.state(), AnimationState::Idle);
        assert!(!anim.is_registered());
        assert_eq!(h.view.target_count(), 0);
        assert!(!anim.has_pending_step());
    }

    #[test]
    fn test_start_registers_and_runs() {
        let h = Harness::new();
        let target = bag();
        let target_ref: TargetRef = target.clone();
        let anim = Animation::new(target.clone(), &h.stage);
        anim.wait_time(100.0);

        anim.start().unwrap();
        assert_eq!(anim.state(), AnimationState::Running);
        assert!(h.view.contains(&target_ref));
        assert!(anim.has_pending_step());

        // 第二次 start 无效
        anim.start().unwrap();
        assert_eq!(h.view.scheduler().pending_timeouts(), 1);
    }

    #[test]
    fn test_time_interpolation() {
        let h = Harness::new();
        let target = bag();
        let anim = Animation::new(target.clone(), &h.stage);
        anim.animate([EffectSpec::to([("x", 100.0), ("alpha", 1.0)]).with_time(1000.0)]);

        anim.start().unwrap();
        assert_eq!(target.get("x"), 0.0);

        h.tick(250.0);
        assert_eq!(target.get("x"), 25.0);
        assert_eq!(target.get("alpha"), 0.25);

        h.tick(750.0);
        assert_eq!(target.get("x"), 100.0);
        assert_eq!(anim.state(), AnimationState::Running);

        h.tick(1.0);
        assert_eq!(anim.state(), AnimationState::Completed);
        assert!(!anim.has_pending_step());
        assert_eq!(h.view.scheduler().pending_timeouts(), 0);
    }

    #[test]
    fn test_frames_wait_counts_steps_in_bundle() {
        let h = Harness::new();
        let (count, cb) = counter();
        let anim = Animation::new(bag(), &h.stage);
        anim.wait(2).execute(cb);

        anim.start().unwrap();
        h.tick(0.0);
        h.tick(0.0);
        assert_eq!(count.get(), 0);

        h.tick(0.0);
        assert_eq!(count.get(), 1);
        assert_eq!(anim.state(), AnimationState::Completed);
    }

    #[test]
    fn test_control_effects_cascade_in_one_step() {
        let h = Harness::new();
        let (count, first) = counter();
        let c = count.clone();
        let anim = Animation::new(bag(), &h.stage);
        anim.execute(first)
            .execute(move || {
                c.set(c.get() + 1);
                Ok(())
            })
            .move_to(5.0, 6.0);

        anim.start().unwrap();
        assert_eq!(count.get(), 2);
        assert_eq!(anim.state(), AnimationState::Completed);
        assert_eq!(anim.target().get_property("y"), Some(6.0));
    }

    #[test]
    fn test_repeat_counts_down() {
        let h = Harness::new();
        let (count, cb) = counter();
        let anim = Animation::new(bag(), &h.stage);
        anim.execute(cb).repeat(2);

        anim.start().unwrap();
        assert_eq!(count.get(), 1);
        assert_eq!(anim.current_index(), 0);

        h.tick(0.0);
        assert_eq!(count.get(), 2);
        assert_eq!(anim.state(), AnimationState::Running);

        h.tick(0.0);
        assert_eq!(count.get(), 3);
        assert_eq!(anim.state(), AnimationState::Completed);

        h.tick(0.0);
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn test_repeat_forever() {
        let h = Harness::new();
        let (count, cb) = counter();
        let anim = Animation::new(bag(), &h.stage);
        anim.execute(cb).repeat_forever();

        anim.start().unwrap();
        for _ in 0..10 {
            h.tick(16.0);
        }
        assert_eq!(count.get(), 11);
        assert_eq!(anim.state(), AnimationState::Running);
        assert_eq!(anim.current_index(), 0);
    }

    #[test]
    fn test_clear_shifts_indices_and_resnapshots() {
        let h = Harness::new();
        let target = bag();
        let anim = Animation::new(target.clone(), &h.stage);
        let t = target.clone();
        anim.execute(move || {
            t.set_property("x", 40.0);
            Ok(())
        })
        .clear()
        .animate([EffectSpec::to([("x", 100.0)]).with_time(100.0)]);

        anim.start().unwrap();
        assert_eq!(anim.bundle_count(), 2);
        assert_eq!(anim.current_index(), 1);
        assert_eq!(target.get("x"), 40.0);

        h.tick(50.0);
        assert_eq!(target.get("x"), 70.0);
    }

    #[test]
    fn test_append_wakes_completed_animation() {
        let h = Harness::new();
        let (count, cb) = counter();
        let anim = Animation::new(bag(), &h.stage);
        anim.move_to(1.0, 1.0);
        anim.start().unwrap();
        assert_eq!(anim.state(), AnimationState::Completed);

        anim.execute(cb);
        assert_eq!(anim.state(), AnimationState::Running);
        assert!(anim.has_pending_step());

        h.tick(0.0);
        assert_eq!(count.get(), 1);
        assert_eq!(anim.state(), AnimationState::Completed);
    }

    #[test]
    fn test_clean_inside_execute_aborts_step() {
        let h = Harness::new();
        let (count, cb) = counter();
        let anim = Animation::new(bag(), &h.stage);
        let this = anim.clone();
        anim.execute(move || this.clean()).execute(cb);

        anim.start().unwrap();
        assert_eq!(count.get(), 0);
        assert_eq!(anim.state(), AnimationState::Idle);
        assert_eq!(anim.bundle_count(), 0);
        assert!(!anim.has_pending_step());
        assert_eq!(h.view.scheduler().pending_timeouts(), 0);
    }

    #[test]
    fn test_clean_cancels_pending_step() {
        let h = Harness::new();
        let anim = Animation::new(bag(), &h.stage);
        anim.wait_time(100.0);
        anim.start().unwrap();
        assert_eq!(h.view.scheduler().pending_timeouts(), 1);

        anim.clean().unwrap();
        assert_eq!(h.view.scheduler().pending_timeouts(), 0);
        assert_eq!(anim.current_index(), 0);
        // 重置后可以重新编排并启动
        anim.wait_time(10.0);
        anim.start().unwrap();
        assert_eq!(anim.state(), AnimationState::Running);
    }

    /// 读写属性时回头查询并操作自己所属动画的目标
    #[derive(Default)]
    struct Spy {
        x: Cell<f32>,
        y: Cell<f32>,
        anim: RefCell<Option<Animation>>,
        reads: Cell<u32>,
        seen: RefCell<Vec<(isize, AnimationState)>>,
        result: RefCell<Option<EngineResult<()>>>,
    }

    impl Animatable for Spy {
        fn get_property(&self, property_id: &str) -> Option<f32> {
            if let Some(anim) = self.anim.borrow().as_ref() {
                assert_eq!(anim.bundle_count(), 1);
                assert!(anim.is_registered());
                self.reads.set(self.reads.get() + 1);
            }
            match property_id {
                "x" => Some(self.x.get()),
                "y" => Some(self.y.get()),
                _ => None,
            }
        }

        fn set_property(&self, property_id: &str, value: f32) -> bool {
            if let Some(anim) = self.anim.borrow().as_ref() {
                self.seen
                    .borrow_mut()
                    .push((anim.current_index(), anim.state()));
                assert!(!anim.has_pending_step());
                *self.result.borrow_mut() = Some(anim.start());
            }
            match property_id {
                "x" => self.x.set(value),
                "y" => self.y.set(value),
                _ => return false,
            }
            true
        }

        fn property_list(&self) -> &'static [&'static str] {
            &["x", "y"]
        }
    }

    #[test]
    fn test_target_can_query_its_animation() {
        let h = Harness::new();
        let spy = Rc::new(Spy::default());
        let anim = Animation::new(spy.clone(), &h.stage);
        anim.move_to(10.0, 10.0);
        *spy.anim.borrow_mut() = Some(anim.clone());

        anim.start().unwrap();
        // 进入 bundle 时快照 x、y
        assert_eq!(spy.reads.get(), 2);
        assert_eq!(
            *spy.seen.borrow(),
            vec![(0, AnimationState::Running), (0, AnimationState::Running)]
        );
        // 运行中再次 start 不生效
        assert_eq!(spy.result.borrow_mut().take(), Some(Ok(())));
        assert_eq!((spy.x.get(), spy.y.get()), (10.0, 10.0));
        assert_eq!(anim.state(), AnimationState::Completed);
        spy.anim.borrow_mut().take();
    }

    #[test]
    fn test_target_can_clean_animation_during_write() {
        let h = Harness::new();
        let target = Rc::new(CleaningTarget {
            anim: RefCell::new(None),
            x: Cell::new(0.0),
        });
        let anim = Animation::new(target.clone(), &h.stage);
        anim.animate([EffectSpec::new().prop("x", 5.0).with_time(10.0)]);
        *target.anim.borrow_mut() = Some(anim.clone());

        // 写入属性时重置动画，这一步中止且不再挂任务
        anim.start().unwrap();
        assert!(target.anim.borrow().is_none());
        assert_eq!(anim.state(), AnimationState::Idle);
        assert_eq!(anim.bundle_count(), 0);
        assert!(!anim.has_pending_step());
    }

    /// 第一次写入属性时重置所属动画
    struct CleaningTarget {
        anim: RefCell<Option<Animation>>,
        x: Cell<f32>,
    }

    impl Animatable for CleaningTarget {
        fn get_property(&self, property_id: &str) -> Option<f32> {
            (property_id == "x").then(|| self.x.get())
        }

        fn set_property(&self, property_id: &str, value: f32) -> bool {
            if let Some(anim) = self.anim.borrow_mut().take() {
                assert_eq!(anim.clean(), Ok(()));
            }
            if property_id != "x" {
                return false;
            }
            self.x.set(value);
            true
        }

        fn property_list(&self) -> &'static [&'static str] {
            &["x"]
        }
    }

    #[test]
    fn test_clear_releases_bundles_outside_borrow() {
        let h = Harness::new();
        let anim = Animation::new(bag(), &h.stage);
        let watched = Rc::new(RefCell::new(None::<Animation>));
        let states = Rc::new(RefCell::new(Vec::new()));
        let guard = QueryOnDrop {
            anim: watched.clone(),
            states: states.clone(),
        };
        anim.execute(move || {
            let _held = &guard;
            Ok(())
        })
        .clear();
        *watched.borrow_mut() = Some(anim.clone());

        anim.start().unwrap();
        assert_eq!(anim.bundle_count(), 1);
        assert_eq!(*states.borrow(), vec![AnimationState::Running]);
        watched.borrow_mut().take();
    }

    /// 被释放时查询动画状态
    struct QueryOnDrop {
        anim: Rc<RefCell<Option<Animation>>>,
        states: Rc<RefCell<Vec<AnimationState>>>,
    }

    impl Drop for QueryOnDrop {
        fn drop(&mut self) {
            if let Some(anim) = self.anim.borrow().as_ref() {
                self.states.borrow_mut().push(anim.state());
            }
        }
    }

    #[test]
    fn test_remove_parks_and_unregisters() {
        let h = Harness::new();
        let target = Rc::new(PropertyBag::new("ball", FIELDS).with("x", 3.0).with("y", 4.0));
        let target_ref: TargetRef = target.clone();
        let anim = Animation::new(target.clone(), &h.stage);
        anim.remove();

        anim.start().unwrap();
        assert_eq!(target.get("x"), -1000.0);
        assert_eq!(target.get("y"), -1000.0);
        assert!(!h.view.contains(&target_ref));
        assert!(!anim.is_registered());
    }

    #[derive(Default)]
    struct Recorder {
        log: RefCell<Vec<&'static str>>,
    }

    impl Sound for Recorder {
        fn play(&self) {
            self.log.borrow_mut().push("play");
        }

        fn pause(&self) {
            self.log.borrow_mut().push("pause");
        }
    }

    #[test]
    fn test_sound_and_pause_sound() {
        let h = Harness::new();
        let recorder = Rc::new(Recorder::default());
        let library = Rc::new(SoundLibrary::new());
        library.insert("bell", recorder.clone());

        let anim = Animation::new(bag(), &h.stage).with_sounds(library);
        anim.sound("bell").wait(0).pause_sound("bell");
        anim.start().unwrap();

        assert_eq!(*recorder.log.borrow(), vec!["play", "pause"]);
    }

    #[test]
    fn test_missing_sound_stops_animation() {
        let h = Harness::new();
        let anim = Animation::new(bag(), &h.stage);
        anim.sound("missing");

        assert_eq!(
            anim.start(),
            Err(EngineError::SoundNotFound {
                id: "missing".to_string()
            })
        );
        assert!(!anim.has_pending_step());
    }

    #[test]
    fn test_duplicate_starts_fresh_on_new_target() {
        let h = Harness::new();
        let first = bag();
        let anim = Animation::new(first.clone(), &h.stage);
        anim.animate([EffectSpec::to([("x", 100.0)]).with_time(100.0)])
            .repeat(1);
        anim.start().unwrap();
        h.tick(50.0);

        let second = bag();
        let second_ref: TargetRef = second.clone();
        let copy = anim.duplicate(Some(second.clone())).unwrap();
        assert_ne!(copy.id(), anim.id());
        assert_eq!(copy.state(), AnimationState::Idle);
        assert_eq!(copy.current_index(), 0);
        assert_eq!(copy.bundle_count(), 2);
        assert!(h.view.contains(&second_ref));

        copy.start().unwrap();
        h.tick(50.0);
        assert_eq!(second.get("x"), 50.0);
        assert_eq!(first.get("x"), 100.0);
    }

    #[test]
    fn test_duplicate_without_target_reuses_it() {
        let h = Harness::new();
        let target = bag();
        let anim = Animation::new(target.clone(), &h.stage);
        anim.move_to(1.0, 2.0);

        let copy = anim.duplicate(None).unwrap();
        assert!(Rc::ptr_eq(&copy.target(), &anim.target()));
        assert_eq!(h.view.target_count(), 1);
    }

    #[test]
    fn test_offset_moves_target_effects_and_origin() {
        let h = Harness::new();
        let target = bag();
        let anim = Animation::new(target.clone(), &h.stage);
        anim.animate([EffectSpec::to([("x", 100.0)]).with_time(100.0)]);
        anim.start().unwrap();
        h.tick(50.0);
        assert_eq!(target.get("x"), 50.0);

        anim.offset(10.0, 5.0).unwrap();
        assert_eq!(target.get("x"), 60.0);
        assert_eq!(target.get("y"), 5.0);

        h.tick(50.0);
        assert_eq!(target.get("x"), 110.0);
        assert_eq!(target.get("y"), 5.0);
    }

    #[test]
    fn test_undeclared_property_degrades_to_nan() {
        let h = Harness::new();
        let target = Rc::new(PropertyBag::new("p", &["x", "y", "alpha"]));
        // 目标只声明 x/y 的快照，alpha 不在起点中
        struct Narrow(Rc<PropertyBag>);
        impl Animatable for Narrow {
            fn get_property(&self, id: &str) -> Option<f32> {
                self.0.get_property(id)
            }
            fn set_property(&self, id: &str, value: f32) -> bool {
                self.0.set_property(id, value)
            }
            fn property_list(&self) -> &'static [&'static str] {
                &["x", "y"]
            }
        }

        let anim = Animation::new(Rc::new(Narrow(target.clone())), &h.stage);
        anim.animate([EffectSpec::to([("alpha", 1.0)]).with_time(100.0)]);
        anim.start().unwrap();

        assert!(target.get("alpha").is_nan());
        assert_eq!(target.get("x"), 0.0);
    }

    #[test]
    fn test_dropped_stage_prevents_start() {
        let clock = ManualClock::new();
        let stage: StageRef = Rc::new(View::new("gone", Rc::new(clock)));
        let anim = Animation::new(bag(), &stage);
        anim.wait(1);
        drop(stage);

        anim.start().unwrap();
        assert_eq!(anim.state(), AnimationState::Idle);
    }
}
