//! # Clip 模块
//!
//! 把多个动画（或嵌套的 Clip）组合起来，统一启动、平移和复制。

use std::fmt;
use std::rc::Rc;

use crate::animation::{Animation, TargetRef};
use crate::error::EngineResult;

/// 可播放对象
pub trait Playable {
    /// 启动
    fn start(&self) -> EngineResult<()>;

    /// 复制
    ///
    /// `targets` 是替换目标，按成员顺序一一对应；缺少时沿用原目标。
    fn duplicate(&self, targets: &[TargetRef]) -> EngineResult<Rc<dyn Playable>>;

    /// 平移
    fn offset(&self, dx: f32, dy: f32) -> EngineResult<()>;
}

impl Playable for Animation {
    fn start(&self) -> EngineResult<()> {
        Animation::start(self)
    }

    fn duplicate(&self, targets: &[TargetRef]) -> EngineResult<Rc<dyn Playable>> {
        Ok(Rc::new(Animation::duplicate(self, targets.first().cloned())?))
    }

    fn offset(&self, dx: f32, dy: f32) -> EngineResult<()> {
        Animation::offset(self, dx, dy)
    }
}

/// 动画组合
#[derive(Clone, Default)]
pub struct Clip {
    members: Vec<Rc<dyn Playable>>,
}

impl Clip {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加成员
    pub fn add(&mut self, members: impl IntoIterator<Item = Rc<dyn Playable>>) -> &mut Self {
        self.members.extend(members);
        self
    }

    /// 追加单个成员
    pub fn push(&mut self, member: Rc<dyn Playable>) -> &mut Self {
        self.members.push(member);
        self
    }

    /// 追加成员（构建器形式）
    pub fn with(mut self, member: Rc<dyn Playable>) -> Self {
        self.members.push(member);
        self
    }

    /// 在同一帧内依次启动所有成员
    pub fn start(&self) -> EngineResult<()> {
        self.members.iter().try_for_each(|m| m.start())
    }

    /// 复制
    ///
    /// 第 i 个成员使用 `targets[i]` 作为新目标；嵌套的 Clip 把它交给自己的第一个成员。
    pub fn duplicate(&self, targets: &[TargetRef]) -> EngineResult<Clip> {
        let members = self
            .members
            .iter()
            .enumerate()
            .map(|(i, member)| {
                let replacement = targets.get(i).map(std::slice::from_ref).unwrap_or(&[]);
                member.duplicate(replacement)
            })
            .collect::<EngineResult<Vec<_>>>()?;
        Ok(Self { members })
    }

    pub fn offset(&self, dx: f32, dy: f32) -> EngineResult<()> {
        self.members.iter().try_for_each(|m| m.offset(dx, dy))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl Playable for Clip {
    fn start(&self) -> EngineResult<()> {
        Clip::start(self)
    }

    fn duplicate(&self, targets: &[TargetRef]) -> EngineResult<Rc<dyn Playable>> {
        Ok(Rc::new(Clip::duplicate(self, targets)?))
    }

    fn offset(&self, dx: f32, dy: f32) -> EngineResult<()> {
        Clip::offset(self, dx, dy)
    }
}

impl fmt::Debug for Clip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clip")
            .field("members", &self.members.len())
            .finish()
    }
}
