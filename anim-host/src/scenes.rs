//! # Scenes 模块
//!
//! 演示场景。每个场景在给定视图上创建精灵并启动动画。
//!
//! - `slide`：缓动移动、淡出后移除
//! - `orbit`：圆弧往返，无限重复
//! - `sequence`：精灵切片序列，播放一次性序列后回到主序列
//! - `timeline`：按时间启动 Clip、复制动画和平移

use std::rc::Rc;

use anim_runtime::{
    Animation, Clip, Ease, EffectSpec, EngineResult, FrameRate, Playable, Shift, SliceRect,
    SliceSequence, SpriteAnimator, StageRef, TargetRef, TimeLine, View,
};
use tracing::info;

use crate::audio::{LoggedSound, logged_library};
use crate::config::{SceneKind, StageConfig};
use crate::sprite::{PROP_ALPHA, Sprite};

/// 已搭建的场景
///
/// 持有场景中的精灵、音效和编排对象，供宿主输出状态。
pub struct Scene {
    kind: SceneKind,
    sprites: Vec<Rc<Sprite>>,
    sounds: Vec<Rc<LoggedSound>>,
    animations: Vec<Animation>,
    timeline: Option<TimeLine>,
    animator: Option<SpriteAnimator>,
}

impl Scene {
    /// 在 `view` 上搭建场景并启动
    pub fn build(kind: SceneKind, stage: &StageConfig, view: &Rc<View>) -> EngineResult<Self> {
        let stage_ref: StageRef = view.clone();
        let width = stage.width as f32;
        let height = stage.height as f32;

        let scene = match kind {
            SceneKind::Slide => slide(&stage_ref, width, height)?,
            SceneKind::Orbit => orbit(&stage_ref, width, height)?,
            SceneKind::Sequence => sequence(&stage_ref, width, height)?,
            SceneKind::Timeline => timeline(&stage_ref, width, height)?,
        };
        info!(
            scene = kind.name(),
            sprites = scene.sprites.len(),
            "场景已启动"
        );
        Ok(scene)
    }

    fn new(kind: SceneKind) -> Self {
        Self {
            kind,
            sprites: Vec::new(),
            sounds: Vec::new(),
            animations: Vec::new(),
            timeline: None,
            animator: None,
        }
    }

    pub fn kind(&self) -> SceneKind {
        self.kind
    }

    pub fn sprites(&self) -> &[Rc<Sprite>] {
        &self.sprites
    }

    pub fn sounds(&self) -> &[Rc<LoggedSound>] {
        &self.sounds
    }

    pub fn animations(&self) -> &[Animation] {
        &self.animations
    }

    pub fn timeline(&self) -> Option<&TimeLine> {
        self.timeline.as_ref()
    }

    /// 精灵序列播放器（仅 `sequence` 场景）
    pub fn animator(&self) -> Option<&SpriteAnimator> {
        self.animator.as_ref()
    }

    /// 所有动画都已执行完
    pub fn is_finished(&self) -> bool {
        let timeline_done = self.timeline.as_ref().is_none_or(|t| t.pending() == 0);
        let animator_done = self
            .animator
            .as_ref()
            .is_none_or(|a| !a.animation().state().is_active());
        timeline_done
            && animator_done
            && self.animations.iter().all(|a| !a.state().is_active())
    }
}

fn slide(stage: &StageRef, width: f32, height: f32) -> EngineResult<Scene> {
    let mut scene = Scene::new(SceneKind::Slide);
    let (library, sounds) = logged_library(["whoosh"]);
    let hero = Rc::new(Sprite::new("hero", 0.0, height / 2.0).with_size(64.0, 64.0));

    let anim = Animation::new(hero.clone(), stage).with_sounds(library);
    anim.sound("whoosh")
        .animate([EffectSpec::new()
            .prop("x", width - 64.0)
            .with_time(1000.0)
            .with_ease(Ease::ParabolicReverse)])
        .wait(30)
        .animate([EffectSpec::to([(PROP_ALPHA, 0.0)]).with_time(500.0)])
        .remove();
    anim.start()?;

    scene.sprites.push(hero);
    scene.sounds = sounds;
    scene.animations.push(anim);
    Ok(scene)
}

fn orbit(stage: &StageRef, width: f32, height: f32) -> EngineResult<Scene> {
    let mut scene = Scene::new(SceneKind::Orbit);
    let (library, sounds) = logged_library(["chime"]);
    let (cx, cy) = (width / 2.0, height / 2.0);
    let moon = Rc::new(Sprite::new("moon", cx - 100.0, cy).with_size(16.0, 16.0));

    let anim = Animation::new(moon.clone(), stage).with_sounds(library);
    anim.sound("chime")
        .animate([EffectSpec::new()
            .position(cx + 100.0, cy)
            .with_time(1500.0)
            .with_ease(Ease::SineInOut)
            .with_shift(Shift::SemiCircle)])
        .pause_sound("chime")
        .animate([EffectSpec::new()
            .position(cx - 100.0, cy)
            .with_time(1500.0)
            .with_ease(Ease::SineInOut)
            .with_shift(Shift::SemiCircleReverse)])
        .repeat_forever();
    anim.start()?;

    scene.sprites.push(moon);
    scene.sounds = sounds;
    scene.animations.push(anim);
    Ok(scene)
}

fn walker_sequences() -> [(&'static str, SliceSequence); 2] {
    let frame = |i: f32, row: f32| SliceRect::new(i * 32.0, row * 48.0, 32.0, 48.0);
    [
        (
            "idle",
            SliceSequence::new(vec![frame(0.0, 0.0), frame(1.0, 0.0)], FrameRate::Frames(8)),
        ),
        (
            "wave",
            SliceSequence::new(
                vec![frame(0.0, 1.0), frame(1.0, 1.0), frame(2.0, 1.0)],
                FrameRate::Time(120.0),
            ),
        ),
    ]
}

fn sequence(stage: &StageRef, width: f32, height: f32) -> EngineResult<Scene> {
    let mut scene = Scene::new(SceneKind::Sequence);
    let walker = Rc::new(Sprite::new("walker", 0.0, height - 48.0).with_size(32.0, 48.0));

    let mut animator = SpriteAnimator::new(Animation::new(walker.clone(), stage));
    for (name, seq) in walker_sequences() {
        animator.define(name, seq);
    }
    animator.play("idle", None, None)?;
    animator.play(
        "wave",
        Some(2),
        Some(Box::new(|| -> EngineResult<()> {
            info!("挥手结束，回到待机");
            Ok(())
        })),
    )?;

    // 切片动画和位移动画同时作用于同一个精灵
    let walk = Animation::new(walker.clone(), stage);
    walk.animate([EffectSpec::new().prop("x", width - 32.0).with_time(3000.0)]);
    walk.start()?;

    scene.sprites.push(walker);
    scene.animations.push(walk);
    scene.animator = Some(animator);
    Ok(scene)
}

fn timeline(stage: &StageRef, width: f32, height: f32) -> EngineResult<Scene> {
    let mut scene = Scene::new(SceneKind::Timeline);
    let row = |i: f32| height / 4.0 * i;
    let a = Rc::new(Sprite::new("a", 0.0, row(1.0)).with_size(32.0, 32.0));
    let b = Rc::new(Sprite::new("b", 0.0, row(2.0)).with_size(32.0, 32.0));
    let c = Rc::new(Sprite::new("c", 0.0, row(3.0)).with_size(32.0, 32.0));

    let slide_right = |sprite: &Rc<Sprite>| {
        let anim = Animation::new(sprite.clone(), stage);
        anim.animate([EffectSpec::new().prop("x", width / 2.0).with_time(800.0)]);
        anim
    };
    let first = slide_right(&a);
    let second = slide_right(&b);
    let pair = Clip::new()
        .with(Rc::new(first.clone()))
        .with(Rc::new(second.clone()));

    // 复制 a 的动画给 c，整体下移后稍晚出发
    let third = first.duplicate(Some(c.clone() as TargetRef))?;
    third.offset(0.0, 20.0)?;

    let fade = Animation::new(b.clone(), stage);
    fade.animate([EffectSpec::to([(PROP_ALPHA, 0.0)]).with_time(400.0)])
        .remove();

    let line = TimeLine::new(stage);
    line.set(0.0, Rc::new(pair))
        .set(300.0, Rc::new(third.clone()))
        .set(1200.0, Rc::new(fade.clone()));
    line.start()?;

    scene.sprites.extend([a, b, c]);
    scene.animations.extend([first, second, third, fade]);
    scene.timeline = Some(line);
    Ok(scene)
}

/// 把场景动画当作一个整体复制到新精灵上
///
/// 返回的 Clip 尚未启动。
pub fn duplicate_onto(scene: &Scene, sprites: &[Rc<Sprite>]) -> EngineResult<Rc<dyn Playable>> {
    let members = scene
        .animations
        .iter()
        .map(|a| Rc::new(a.clone()) as Rc<dyn Playable>);
    let mut clip = Clip::new();
    clip.add(members);
    let targets: Vec<TargetRef> = sprites.iter().map(|s| s.clone() as TargetRef).collect();
    Playable::duplicate(&clip, &targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anim_runtime::{ManualClock, Stage};

    fn view() -> (ManualClock, Rc<View>) {
        let clock = ManualClock::new();
        let view = Rc::new(View::new("scene", Rc::new(clock.clone())));
        view.start();
        (clock, view)
    }

    fn run(clock: &ManualClock, view: &View, frames: u32) {
        for _ in 0..frames {
            clock.advance(20.0);
            view.update().unwrap();
        }
    }

    #[test]
    fn test_every_scene_builds() {
        for kind in [
            SceneKind::Slide,
            SceneKind::Orbit,
            SceneKind::Sequence,
            SceneKind::Timeline,
        ] {
            let (_, view) = view();
            let scene = Scene::build(kind, &StageConfig::default(), &view).unwrap();
            assert_eq!(scene.kind(), kind);
            assert!(!scene.sprites().is_empty());
        }
    }

    #[test]
    fn test_slide_finishes_off_stage() {
        let (clock, view) = view();
        let scene = Scene::build(SceneKind::Slide, &StageConfig::default(), &view).unwrap();
        assert_eq!(scene.sounds()[0].plays(), 1);

        run(&clock, &view, 150);
        assert!(scene.is_finished());
        assert_eq!(view.target_count(), 0);
        assert_eq!(scene.sprites()[0].position(), (-1000.0, -1000.0));
        assert_eq!(scene.sprites()[0].alpha(), 0.0);
    }

    #[test]
    fn test_orbit_never_finishes() {
        let (clock, view) = view();
        let scene = Scene::build(SceneKind::Orbit, &StageConfig::default(), &view).unwrap();
        run(&clock, &view, 400);
        assert!(!scene.is_finished());
        assert!(scene.sounds()[0].plays() >= 2);
        assert_eq!(view.scheduler().pending_timeouts(), 1);
    }

    #[test]
    fn test_timeline_scene_removes_faded_sprite() {
        let (clock, view) = view();
        let scene = Scene::build(SceneKind::Timeline, &StageConfig::default(), &view).unwrap();
        assert_eq!(scene.timeline().map(TimeLine::pending), Some(2));

        run(&clock, &view, 100);
        assert_eq!(scene.timeline().map(TimeLine::pending), Some(0));
        assert!(scene.is_finished());
        // b 淡出后被移除
        assert_eq!(view.target_count(), 2);
        let c = &scene.sprites()[2];
        assert_eq!(c.position(), (640.0, 560.0));
    }

    #[test]
    fn test_duplicate_onto_new_sprites() {
        let (clock, view) = view();
        let scene = Scene::build(SceneKind::Slide, &StageConfig::default(), &view).unwrap();
        let twin = Rc::new(Sprite::new("twin", 0.0, 0.0).with_size(64.0, 64.0));
        let copy = duplicate_onto(&scene, std::slice::from_ref(&twin)).unwrap();
        assert_eq!(view.target_count(), 2);

        copy.start().unwrap();
        run(&clock, &view, 25);
        assert!(twin.position().0 > 0.0);
    }
}
