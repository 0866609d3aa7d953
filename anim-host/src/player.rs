//! # Player 模块
//!
//! headless 播放循环：手动时钟每帧推进固定时长，驱动视图栈，
//! 按配置定期输出精灵状态。

use std::io::Write;
use std::rc::Rc;

use anim_runtime::{AnimError, Director, ManualClock, View};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::scenes::Scene;

/// 播放错误
#[derive(Debug, Error)]
pub enum PlayerError {
    /// 动画运行时错误
    #[error(transparent)]
    Anim(#[from] AnimError),

    /// 状态输出失败
    #[error("状态输出失败: {0}")]
    Output(#[from] std::io::Error),
}

/// 播放结束时的汇总
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// 实际执行的帧数
    pub frames: u32,
    /// 模拟的总时长（毫秒）
    pub elapsed_ms: f64,
    /// 结束时仍注册在舞台上的精灵数
    pub visible_targets: usize,
    /// 场景中的动画是否都已执行完
    pub finished: bool,
    /// 结束时的 FPS 估计
    pub fps: f64,
}

/// 播放器
pub struct Player {
    config: AppConfig,
    clock: ManualClock,
    director: Director,
    view: Rc<View>,
    scene: Scene,
    frame: u32,
}

impl Player {
    /// 按配置搭建场景
    pub fn new(config: AppConfig) -> Result<Self, PlayerError> {
        let clock = ManualClock::new();
        let mut director = Director::new(Rc::new(clock.clone()), config.playback.fps_window_secs);
        let view = Rc::new(View::new(config.scene.name(), Rc::new(clock.clone())));
        director.push(view.clone());

        let scene = Scene::build(config.scene, &config.stage, &view).map_err(AnimError::from)?;
        Ok(Self {
            config,
            clock,
            director,
            view,
            scene,
            frame: 0,
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn view(&self) -> &Rc<View> {
        &self.view
    }

    /// 已执行的帧数
    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// 推进一帧
    pub fn step(&mut self) -> Result<(), PlayerError> {
        self.clock.advance(self.config.playback.frame_ms);
        self.director.update_all().map_err(AnimError::from)?;
        self.frame += 1;
        Ok(())
    }

    /// 运行配置的帧数，状态写入 `out`
    pub fn run(&mut self, out: &mut impl Write) -> Result<RunSummary, PlayerError> {
        let total = self.config.playback.frames;
        let every = self.config.playback.report_every;
        info!(
            scene = self.config.scene.name(),
            frames = total,
            frame_ms = self.config.playback.frame_ms,
            "开始播放"
        );

        self.report(out)?;
        while self.frame < total {
            self.step()?;
            if every > 0 && self.frame % every == 0 {
                self.report(out)?;
            }
        }
        if every == 0 || self.frame % every != 0 {
            self.report(out)?;
        }

        let summary = self.summary();
        info!(
            frames = summary.frames,
            finished = summary.finished,
            fps = summary.fps,
            "播放结束"
        );
        Ok(summary)
    }

    /// 输出当前帧所有精灵的状态
    pub fn report(&self, out: &mut impl Write) -> Result<(), PlayerError> {
        let elapsed = self.clock_ms();
        writeln!(out, "[frame {:>4} | {:>8.1} ms]", self.frame, elapsed)?;
        let (width, height) = (
            self.config.stage.width as f32,
            self.config.stage.height as f32,
        );
        for sprite in self.scene.sprites() {
            let mark = if sprite.is_visible_in(width, height) {
                ' '
            } else {
                '-'
            };
            writeln!(out, "  {mark} {sprite}")?;
        }
        debug!(frame = self.frame, targets = self.view.target_count(), "输出状态");
        Ok(())
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            frames: self.frame,
            elapsed_ms: self.clock_ms(),
            visible_targets: self.view.target_count(),
            finished: self.scene.is_finished(),
            fps: self.director.fps(),
        }
    }

    fn clock_ms(&self) -> f64 {
        f64::from(self.frame) * self.config.playback.frame_ms
    }
}
