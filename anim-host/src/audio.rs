//! # Audio 模块
//!
//! headless 宿主没有音频输出，音效只记录日志和播放状态。

use std::cell::Cell;
use std::rc::Rc;

use anim_runtime::{Sound, SoundLibrary};
use tracing::info;

/// 只记录日志的音效
#[derive(Debug)]
pub struct LoggedSound {
    id: String,
    playing: Cell<bool>,
    plays: Cell<u32>,
}

impl LoggedSound {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            playing: Cell::new(false),
            plays: Cell::new(0),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing.get()
    }

    /// 累计播放次数
    pub fn plays(&self) -> u32 {
        self.plays.get()
    }
}

impl Sound for LoggedSound {
    fn play(&self) {
        self.playing.set(true);
        self.plays.set(self.plays.get() + 1);
        info!(sound = %self.id, count = self.plays.get(), "播放音效");
    }

    fn pause(&self) {
        if self.playing.replace(false) {
            info!(sound = %self.id, "暂停音效");
        }
    }
}

/// 按 ID 列表创建音效库
///
/// 返回音效库和每个音效的句柄（顺序同 `ids`）。
pub fn logged_library<'a>(
    ids: impl IntoIterator<Item = &'a str>,
) -> (Rc<SoundLibrary>, Vec<Rc<LoggedSound>>) {
    let library = Rc::new(SoundLibrary::new());
    let sounds = ids
        .into_iter()
        .map(|id| {
            let sound = Rc::new(LoggedSound::new(id));
            library.insert(id, sound.clone());
            sound
        })
        .collect();
    (library, sounds)
}
