//! # Effect 模块
//!
//! 效果与 bundle 的数据定义。
//!
//! 调用方通过 [`EffectSpec`] 描述效果，构造 bundle 时一次性解析为
//! [`EffectKind`]，之后引擎只和封闭的枚举打交道。

use std::fmt;
use std::rc::Rc;

use super::engine::Animation;
use super::target::{PROP_X, PROP_Y};
use crate::easing::Ease;
use crate::error::EngineResult;
use crate::shift::Shift;

/// Execute 效果的回调
pub type ExecuteFn = Rc<dyn Fn() -> EngineResult<()>>;

/// 时长类型
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DurationKind {
    /// 未指定时长，首次步进即完成
    #[default]
    None,
    /// 以步数计
    Frames(f64),
    /// 以毫秒计
    Time(f64),
}

impl DurationKind {
    /// 时长数值（`None` 时为 0）
    pub fn value(&self) -> f64 {
        match self {
            DurationKind::None => 0.0,
            DurationKind::Frames(v) | DurationKind::Time(v) => *v,
        }
    }
}

/// 属性插值效果
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySet {
    /// 目标值（保持声明顺序）
    pub targets: Vec<(String, f32)>,
    pub duration: DurationKind,
    pub ease: Ease,
    pub shift: Shift,
}

impl PropertySet {
    /// 目标值中的某个属性
    pub fn get(&self, name: &str) -> Option<f32> {
        self.targets
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| *v)
    }

    /// 给已声明的属性加上偏移
    pub(crate) fn offset_field(&mut self, name: &str, delta: f32) {
        if let Some((_, v)) = self.targets.iter_mut().find(|(k, _)| k == name) {
            *v += delta;
        }
    }

    /// 计算进度
    ///
    /// `delta` 为进入 bundle 以来的毫秒数或步数。返回 `(percent, finished)`，
    /// 超过时长（严格大于）才算结束。
    pub fn progress(&self, delta: f64) -> (f32, bool) {
        let duration = self.duration.value();
        if matches!(self.duration, DurationKind::None) || duration <= 0.0 {
            return (1.0, true);
        }
        if delta > duration {
            (1.0, true)
        } else {
            (self.ease.apply((delta / duration) as f32), false)
        }
    }
}

/// 效果类型
#[derive(Clone)]
pub enum EffectKind {
    /// 属性插值
    PropertySet(PropertySet),
    /// 移出可见区域并从舞台注销
    Remove,
    /// 执行回调
    Execute(ExecuteFn),
    /// 播放音效
    Sound(String),
    /// 暂停音效
    PauseSound(String),
    /// 丢弃当前 bundle 之前的所有 bundle
    Clear,
    /// 重复播放
    ///
    /// `count` 为初始次数（负数表示无限），`remaining` 为剩余次数。
    Repeat { count: i32, remaining: i32 },
    /// 启动另一个动画
    StartAnimation(Animation),
}

impl EffectKind {
    /// 调试用名称
    pub fn name(&self) -> &'static str {
        match self {
            EffectKind::PropertySet(_) => "property_set",
            EffectKind::Remove => "remove",
            EffectKind::Execute(_) => "execute",
            EffectKind::Sound(_) => "sound",
            EffectKind::PauseSound(_) => "pause_sound",
            EffectKind::Clear => "clear",
            EffectKind::Repeat { .. } => "repeat",
            EffectKind::StartAnimation(_) => "start_animation",
        }
    }
}

impl fmt::Debug for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectKind::PropertySet(p) => f.debug_tuple("PropertySet").field(p).finish(),
            EffectKind::Sound(id) => f.debug_tuple("Sound").field(id).finish(),
            EffectKind::PauseSound(id) => f.debug_tuple("PauseSound").field(id).finish(),
            EffectKind::Repeat { count, remaining } => f
                .debug_struct("Repeat")
                .field("count", count)
                .field("remaining", remaining)
                .finish(),
            EffectKind::StartAnimation(a) => f.debug_tuple("StartAnimation").field(&a.id()).finish(),
            other => f.write_str(other.name()),
        }
    }
}

/// 单个效果：类型 + 完成标记
#[derive(Debug, Clone)]
pub struct Effect {
    pub kind: EffectKind,
    pub complete: bool,
    /// 强制推进到下一个 bundle
    pub next: bool,
}

impl Effect {
    pub fn new(kind: EffectKind) -> Self {
        Self {
            kind,
            complete: false,
            next: false,
        }
    }

    /// 复制为未执行的新效果
    pub(crate) fn fresh(&self) -> Self {
        let kind = match &self.kind {
            EffectKind::Repeat { count, .. } => EffectKind::Repeat {
                count: *count,
                remaining: *count,
            },
            other => other.clone(),
        };
        Self::new(kind)
    }

    /// 清除标记，用于 Repeat
    pub(crate) fn reset_flags(&mut self) {
        self.complete = false;
        self.next = false;
    }
}

/// 同时执行的一组效果
#[derive(Debug, Clone, Default)]
pub struct Bundle {
    pub effects: Vec<Effect>,
}

impl Bundle {
    /// 从效果描述构造
    pub fn from_specs(specs: impl IntoIterator<Item = EffectSpec>) -> Self {
        Self {
            effects: specs.into_iter().map(|s| Effect::new(s.resolve())).collect(),
        }
    }

    /// 是否可以推进：全部完成，或任一效果要求推进
    pub fn can_advance(&self) -> bool {
        self.effects.iter().all(|e| e.complete) || self.effects.iter().any(|e| e.next)
    }

    pub(crate) fn fresh(&self) -> Self {
        Self {
            effects: self.effects.iter().map(Effect::fresh).collect(),
        }
    }
}

/// 效果描述（构建器）
///
/// ```rust,ignore
/// let spec = EffectSpec::to([("x", 100.0), ("alpha", 0.0)])
///     .with_time(1000.0)
///     .with_ease(Ease::Parabolic);
/// ```
///
/// 同时指定帧数和时间时以帧数为准。
#[derive(Debug, Clone, Default)]
pub struct EffectSpec {
    control: Option<EffectKind>,
    targets: Vec<(String, f32)>,
    frames: Option<f64>,
    time: Option<f64>,
    ease: Ease,
    shift: Shift,
}

impl EffectSpec {
    /// 空的属性效果
    pub fn new() -> Self {
        Self::default()
    }

    /// 属性效果，设置一组目标值
    pub fn to<I, K>(props: I) -> Self
    where
        I: IntoIterator<Item = (K, f32)>,
        K: Into<String>,
    {
        props
            .into_iter()
            .fold(Self::default(), |spec, (k, v)| spec.prop(k, v))
    }

    /// 追加一个目标值（同名覆盖）
    pub fn prop(mut self, name: impl Into<String>, value: f32) -> Self {
        let name = name.into();
        match self.targets.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = value,
            None => self.targets.push((name, value)),
        }
        self
    }

    /// 目标位置
    pub fn position(self, x: f32, y: f32) -> Self {
        self.prop(PROP_X, x).prop(PROP_Y, y)
    }

    pub fn with_time(mut self, ms: f64) -> Self {
        self.time = Some(ms);
        self
    }

    pub fn with_frames(mut self, frames: f64) -> Self {
        self.frames = Some(frames);
        self
    }

    pub fn with_ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }

    pub fn with_shift(mut self, shift: Shift) -> Self {
        self.shift = shift;
        self
    }

    fn control(kind: EffectKind) -> Self {
        Self {
            control: Some(kind),
            ..Self::default()
        }
    }

    pub fn remove() -> Self {
        Self::control(EffectKind::Remove)
    }

    pub fn execute(f: impl Fn() -> EngineResult<()> + 'static) -> Self {
        Self::control(EffectKind::Execute(Rc::new(f)))
    }

    pub fn sound(id: impl Into<String>) -> Self {
        Self::control(EffectKind::Sound(id.into()))
    }

    pub fn pause_sound(id: impl Into<String>) -> Self {
        Self::control(EffectKind::PauseSound(id.into()))
    }

    pub fn clear() -> Self {
        Self::control(EffectKind::Clear)
    }

    /// 重复 `times` 次，负数表示无限
    pub fn repeat(times: i32) -> Self {
        Self::control(EffectKind::Repeat {
            count: times,
            remaining: times,
        })
    }

    pub fn start(animation: &Animation) -> Self {
        Self::control(EffectKind::StartAnimation(animation.clone()))
    }

    /// 解析为效果类型
    pub fn resolve(self) -> EffectKind {
        if let Some(kind) = self.control {
            return kind;
        }
        let duration = match (self.frames, self.time) {
            (Some(frames), _) => DurationKind::Frames(frames),
            (None, Some(ms)) => DurationKind::Time(ms),
            (None, None) => DurationKind::None,
        };
        EffectKind::PropertySet(PropertySet {
            targets: self.targets,
            duration,
            ease: self.ease,
            shift: self.shift,
        })
    }
}
