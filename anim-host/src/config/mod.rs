//! # Config 模块
//!
//! 演示宿主的运行配置。
//!
//! ## 配置优先级
//!
//! 1. 命令行参数（最高）
//! 2. 配置文件 (config.json)
//! 3. 默认值（最低）

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// 演示场景
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SceneKind {
    /// 直线移动后移除
    #[default]
    Slide,
    /// 圆弧往返，无限重复
    Orbit,
    /// 精灵切片序列
    Sequence,
    /// 时间轴编排
    Timeline,
}

impl SceneKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Slide => "slide",
            Self::Orbit => "orbit",
            Self::Sequence => "sequence",
            Self::Timeline => "timeline",
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 舞台配置
    #[serde(default)]
    pub stage: StageConfig,

    /// 播放配置
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,

    /// 要运行的场景
    #[serde(default)]
    pub scene: SceneKind,
}

/// 舞台配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    /// 可见区域宽度
    #[serde(default = "default_stage_width")]
    pub width: u32,

    /// 可见区域高度
    #[serde(default = "default_stage_height")]
    pub height: u32,
}

/// 播放配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// 模拟的帧长（毫秒）
    #[serde(default = "default_frame_ms")]
    pub frame_ms: f64,

    /// 运行的帧数
    #[serde(default = "default_frames")]
    pub frames: u32,

    /// FPS 统计窗口（秒）
    #[serde(default = "default_fps_window_secs")]
    pub fps_window_secs: f64,

    /// 每隔多少帧输出一次目标状态，0 表示只在结束时输出
    #[serde(default = "default_report_every")]
    pub report_every: u32,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别（error/warn/info/debug/trace）
    #[serde(default = "default_log_level")]
    pub level: String,
}

// 默认值函数
fn default_stage_width() -> u32 {
    1280
}

fn default_stage_height() -> u32 {
    720
}

fn default_frame_ms() -> f64 {
    1000.0 / 60.0
}

fn default_frames() -> u32 {
    180
}

fn default_fps_window_secs() -> f64 {
    1.0
}

fn default_report_every() -> u32 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            width: default_stage_width(),
            height: default_stage_height(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            frame_ms: default_frame_ms(),
            frames: default_frames(),
            fps_window_secs: default_fps_window_secs(),
            report_every: default_report_every(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

impl AppConfig {
    /// 加载配置文件
    ///
    /// 如果文件不存在或解析失败，返回默认配置并记录警告。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            warn!(path = %path.display(), "配置文件不存在，使用默认配置");
            return Self::default();
        }

        match Self::try_load(path) {
            Ok(config) => {
                info!(path = %path.display(), "配置文件加载成功");
                config
            }
            Err(e) => {
                warn!(error = %e, "使用默认配置");
                Self::default()
            }
        }
    }

    /// 严格加载配置文件，读取或解析失败时返回错误
    pub fn try_load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializationFailed(e.to_string()))?;

        fs::write(path, json).map_err(|e| ConfigError::Io(e.to_string()))?;

        Ok(())
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stage.width == 0 || self.stage.height == 0 {
            return Err(ConfigError::ValidationFailed(
                "舞台宽高必须大于 0".to_string(),
            ));
        }

        if !(self.playback.frame_ms.is_finite() && self.playback.frame_ms > 0.0) {
            return Err(ConfigError::ValidationFailed(
                "帧长必须是大于 0 的有限值".to_string(),
            ));
        }

        if !(self.playback.fps_window_secs.is_finite() && self.playback.fps_window_secs > 0.0) {
            return Err(ConfigError::ValidationFailed(
                "FPS 统计窗口必须大于 0".to_string(),
            ));
        }

        if !LOG_LEVELS.contains(&self.log.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "未知的日志级别: {}",
                self.log.level
            )));
        }

        Ok(())
    }

    /// 日志级别
    ///
    /// 无法识别时退回 INFO。
    pub fn log_level(&self) -> tracing::Level {
        self.log.level.parse().unwrap_or(tracing::Level::INFO)
    }
}

/// 配置错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// 序列化失败
    #[error("配置序列化失败: {0}")]
    SerializationFailed(String),
    /// 解析失败
    #[error("配置解析失败: {0}")]
    Parse(String),
    /// IO 错误
    #[error("配置 IO 错误: {0}")]
    Io(String),
    /// 验证失败
    #[error("配置验证失败: {0}")]
    ValidationFailed(String),
}
