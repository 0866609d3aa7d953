//! # Anim Host
//!
//! anim-runtime 的 headless 宿主。
//!
//! ## 架构说明
//!
//! Host 层负责：
//! - 加载配置
//! - 提供具体的动画目标（[`Sprite`]）和音效（[`LoggedSound`]）
//! - 搭建演示场景
//! - 用手动时钟驱动视图栈并输出状态
//!
//! Host 层不包含动画逻辑，只负责驱动 Runtime 并观察结果。

pub mod audio;
pub mod config;
pub mod player;
pub mod scenes;
pub mod sprite;

pub use audio::{LoggedSound, logged_library};
pub use config::{AppConfig, ConfigError, LogConfig, PlaybackConfig, SceneKind, StageConfig};
pub use player::{Player, PlayerError, RunSummary};
pub use scenes::{Scene, duplicate_onto};
pub use sprite::{PROP_ALPHA, Sprite};
