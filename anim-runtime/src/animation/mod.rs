//! # Animation 模块
//!
//! 多阶段动画引擎。
//!
//! ## 核心概念
//!
//! - `Animation`: 绑定一个目标的动画句柄，持有按顺序执行的 bundle 列表
//! - `Bundle`: 一组同时执行的效果，是顺序推进的最小单位
//! - `EffectSpec`: 效果描述，添加 bundle 时解析为 `EffectKind`
//! - `Animatable`: 目标对象接口
//!
//! ## 执行模型
//!
//! 动画不自己驱动时间：`start()` 后每一步都以零延迟任务的形式挂在舞台的
//! 调度器上，宿主每帧调用 `update()` 时推进一步，直到 bundle 全部执行完。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! let anim = Animation::new(sprite.clone(), &stage);
//! anim.animate([EffectSpec::to([("x", 100.0)]).with_time(1000.0)])
//!     .wait(10)
//!     .remove();
//! anim.start()?;
//! ```

mod effect;
mod engine;
mod target;

use std::fmt;

pub use effect::{Bundle, DurationKind, Effect, EffectKind, EffectSpec, ExecuteFn, PropertySet};
pub use engine::Animation;
pub use target::{
    Animatable, PROP_HEIGHT, PROP_SLICE_HEIGHT, PROP_SLICE_WIDTH, PROP_SLICE_X, PROP_SLICE_Y,
    PROP_WIDTH, PROP_X, PROP_Y, PropertyBag, TargetRef, same_target,
};

/// 动画 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimationId(pub u64);

impl AnimationId {
    /// 创建新的动画 ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for AnimationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 动画状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationState {
    /// 未启动
    #[default]
    Idle,
    /// 正在执行
    Running,
    /// bundle 已全部执行完
    Completed,
}

impl AnimationState {
    /// 是否需要继续步进
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running)
    }
}
