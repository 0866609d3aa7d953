//! # Error 模块
//!
//! 定义 anim-runtime 中使用的错误类型。

use thiserror::Error;

use crate::animation::AnimationId;
use crate::time::TaskId;

/// 动画引擎错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// 声音未注册（或动画没有挂载声音库）
    #[error("声音 '{id}' 不存在")]
    SoundNotFound { id: String },

    /// 动画状态正在被借用，无法重入
    #[error("动画 {id} 正在执行，无法重入")]
    Reentrant { id: AnimationId },

    /// 用户回调失败
    #[error("回调执行失败: {message}")]
    Callback { message: String },
}

impl EngineError {
    /// 创建回调错误
    pub fn callback(message: impl Into<String>) -> Self {
        Self::Callback {
            message: message.into(),
        }
    }
}

/// 调度器错误
///
/// 一次性任务与周期任务的失败语义不同：
/// - 一次性任务：先从队列中移除，再把错误抛出
/// - 周期任务：`last_fire` 已经推进，任务保持注册，错误立即抛出
///
/// 两种情况都会中止本次 `update()` 的剩余部分。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulerError {
    /// 一次性任务回调失败（任务已被移除）
    #[error("定时任务 {task} 执行失败: {source}")]
    TimeoutFailed { task: TaskId, source: EngineError },

    /// 周期任务回调失败（任务仍然保留）
    #[error("周期任务 {task} 执行失败: {source}")]
    IntervalFailed { task: TaskId, source: EngineError },
}

impl SchedulerError {
    /// 失败的任务 ID
    pub fn task(&self) -> TaskId {
        match self {
            Self::TimeoutFailed { task, .. } | Self::IntervalFailed { task, .. } => *task,
        }
    }

    /// 底层的引擎错误
    pub fn engine_error(&self) -> &EngineError {
        match self {
            Self::TimeoutFailed { source, .. } | Self::IntervalFailed { source, .. } => source,
        }
    }
}

/// anim-runtime 统一错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimError {
    /// 引擎错误
    #[error("引擎错误: {0}")]
    Engine(#[from] EngineError),

    /// 调度错误
    #[error("调度错误: {0}")]
    Scheduler(#[from] SchedulerError),
}

/// 引擎 Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;

/// Result 类型别名
pub type AnimResult<T> = Result<T, AnimError>;
