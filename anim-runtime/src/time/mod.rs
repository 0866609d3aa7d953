//! # Time 模块
//!
//! 时间相关的基础设施：
//!
//! - [`Clock`]：毫秒时间源（系统时钟 / 手动时钟）
//! - [`Timer`]：可暂停的计时器
//! - [`TimeScheduler`]：协作式的定时/周期任务调度器
//! - [`FrameCounter`]：滑动窗口 FPS 统计

mod clock;
mod counter;
mod scheduler;
mod timer;

pub use clock::{Clock, ClockRef, ManualClock, SystemClock};
pub use counter::FrameCounter;
pub use scheduler::{TaskCallback, TaskId, TimeScheduler};
pub use timer::Timer;
