//! # Sequence 模块
//!
//! 精灵的切片序列动画。
//!
//! 每个序列是一组切片区域加一个帧率。播放时重新编排精灵的 [`Animation`]：
//! 每个切片对应一个 `set_slice` bundle 和一个等待 bundle。
//!
//! - 指定次数：播放 `times` 遍后执行结束回调，再回到主序列循环（如果有）
//! - 不指定次数：无限循环，并记为主序列

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::animation::{Animation, EffectSpec};
use crate::error::EngineResult;

/// 切片区域
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SliceRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl SliceRect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// 每个切片停留的时长
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameRate {
    /// 步数
    Frames(u32),
    /// 毫秒
    Time(f64),
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::Frames(1)
    }
}

/// 切片序列
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SliceSequence {
    pub slices: Vec<SliceRect>,
    #[serde(default)]
    pub rate: FrameRate,
}

impl SliceSequence {
    pub fn new(slices: Vec<SliceRect>, rate: FrameRate) -> Self {
        Self { slices, rate }
    }
}

/// 精灵序列播放器
#[derive(Debug)]
pub struct SpriteAnimator {
    animation: Animation,
    sequences: HashMap<String, SliceSequence>,
    /// 当前循环播放的主序列
    main: Option<String>,
}

impl SpriteAnimator {
    pub fn new(animation: Animation) -> Self {
        Self {
            animation,
            sequences: HashMap::new(),
            main: None,
        }
    }

    /// 定义序列（同名覆盖）
    pub fn define(&mut self, name: impl Into<String>, sequence: SliceSequence) -> &mut Self {
        self.sequences.insert(name.into(), sequence);
        self
    }

    pub fn animation(&self) -> &Animation {
        &self.animation
    }

    /// 主序列名
    pub fn main(&self) -> Option<&str> {
        self.main.as_deref()
    }

    /// 播放序列
    ///
    /// # 参数
    /// - `times`: 播放次数，`None` 表示无限循环并设为主序列
    /// - `on_finish`: 播放完 `times` 次后执行
    ///
    /// # 返回
    /// 序列不存在时返回 `false`，动画保持不变。
    pub fn play(
        &mut self,
        name: &str,
        times: Option<u32>,
        on_finish: Option<Box<dyn Fn() -> EngineResult<()>>>,
    ) -> EngineResult<bool> {
        let Some(sequence) = self.sequences.get(name) else {
            debug!(sequence = %name, "序列不存在，忽略");
            return Ok(false);
        };

        self.animation.clean()?;
        append_sequence(&self.animation, sequence);

        match times {
            Some(times) => {
                let repeats = i32::try_from(times.saturating_sub(1)).unwrap_or(i32::MAX);
                self.animation.repeat(repeats).clear();
                if let Some(f) = on_finish {
                    self.animation.execute(f).clear();
                }
                if let Some(main) = self.main.as_ref().and_then(|m| self.sequences.get(m)) {
                    append_sequence(&self.animation, main);
                    self.animation.repeat_forever();
                }
            }
            None => {
                self.animation.repeat_forever();
                self.main = Some(name.to_string());
            }
        }

        debug!(sequence = %name, ?times, "播放序列");
        self.animation.start()?;
        Ok(true)
    }
}

fn append_sequence(animation: &Animation, sequence: &SliceSequence) {
    for slice in &sequence.slices {
        animation.set_slice(slice.x, slice.y, slice.width, slice.height);
        match sequence.rate {
            FrameRate::Frames(n) => animation.wait(n),
            FrameRate::Time(ms) => animation.animate([EffectSpec::new().with_time(ms)]),
        };
    }
}
