//! # Anim Runtime
//!
//! 协作式调度的多阶段动画引擎。
//!
//! ## 架构概述
//!
//! `anim-runtime` 不自己驱动时间，也不做任何绘制。宿主每帧调用一次
//! [`View::update`]（或 [`Director::update_all`]），调度器在其中触发到期任务；
//! 动画的每一步都是挂在调度器上的零延迟任务：
//!
//! ```text
//! Host                 View / TimeScheduler            Animation
//!   │                          │                           │
//!   │──── update() ──────────►│                           │
//!   │                          │──── step() ─────────────►│
//!   │                          │                           │ 执行当前 bundle
//!   │                          │◄─── set_timeout(0) ──────│ （仍在运行时）
//!   │◄─── Ok / SchedulerError ─│                           │
//! ```
//!
//! ## 核心类型
//!
//! - [`TimeScheduler`]：一次性/周期任务调度器
//! - [`Animation`]：绑定单个目标的多阶段动画
//! - [`Clip`]：同时启动的一组动画
//! - [`TimeLine`]：按相对时间启动的一组动画
//! - [`Animatable`]：目标对象接口
//! - [`Stage`]：渲染协作接口，[`View`] 是默认实现
//!
//! ## 使用示例
//!
//! ```ignore
//! use anim_runtime::{Animation, EffectSpec, ManualClock, StageRef, View};
//!
//! let clock = ManualClock::new();
//! let view = Rc::new(View::new("main", Rc::new(clock.clone())));
//! view.start();
//! let stage: StageRef = view.clone();
//!
//! let anim = Animation::new(ball.clone(), &stage);
//! anim.animate([EffectSpec::to([("x", 100.0)]).with_time(1000.0)])
//!     .remove();
//! anim.start()?;
//!
//! loop {
//!     clock.advance(16.0);
//!     view.update()?;
//! }
//! ```
//!
//! ## 模块结构
//!
//! - [`time`]：时间源、计时器、调度器、FPS 统计
//! - [`easing`] / [`shift`]：进度缓动与位移路径
//! - [`animation`]：动画引擎
//! - [`clip`] / [`timeline`]：组合与编排
//! - [`stage`]：舞台、视图与视图栈
//! - [`sound`]：音效协作接口
//! - [`sequence`]：精灵切片序列
//! - [`error`]：错误类型定义

pub mod animation;
pub mod clip;
pub mod easing;
pub mod error;
pub mod sequence;
pub mod shift;
pub mod sound;
pub mod stage;
pub mod time;
pub mod timeline;

// 重导出核心类型
pub use animation::{
    Animatable, Animation, AnimationId, AnimationState, Bundle, DurationKind, Effect, EffectKind,
    EffectSpec, PropertyBag, PropertySet, TargetRef,
};
pub use clip::{Clip, Playable};
pub use easing::Ease;
pub use error::{AnimError, AnimResult, EngineError, EngineResult, SchedulerError};
pub use sequence::{FrameRate, SliceRect, SliceSequence, SpriteAnimator};
pub use shift::{Point, Shift};
pub use sound::{Sound, SoundBank, SoundLibrary};
pub use stage::{Director, Stage, StageRef, View};
pub use time::{
    Clock, ClockRef, FrameCounter, ManualClock, SystemClock, TaskId, TimeScheduler, Timer,
};
pub use timeline::TimeLine;
