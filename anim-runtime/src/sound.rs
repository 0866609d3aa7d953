//! # Sound 模块
//!
//! 音效协作接口。运行时只负责在合适的时刻触发播放和暂停，
//! 解码与输出由宿主实现。

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// 单个音效
pub trait Sound {
    /// 开始播放
    fn play(&self);

    /// 暂停播放
    fn pause(&self);
}

/// 音效库：按 ID 查找音效
pub trait SoundBank {
    fn get(&self, id: &str) -> Option<Rc<dyn Sound>>;
}

/// 基于哈希表的音效库
#[derive(Default)]
pub struct SoundLibrary {
    sounds: RefCell<HashMap<String, Rc<dyn Sound>>>,
}

impl SoundLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册音效，同 ID 覆盖
    pub fn insert(&self, id: impl Into<String>, sound: Rc<dyn Sound>) {
        self.sounds.borrow_mut().insert(id.into(), sound);
    }

    /// 注销音效
    pub fn remove(&self, id: &str) -> bool {
        self.sounds.borrow_mut().remove(id).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sounds.borrow().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sounds.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.borrow().is_empty()
    }
}

impl SoundBank for SoundLibrary {
    fn get(&self, id: &str) -> Option<Rc<dyn Sound>> {
        self.sounds.borrow().get(id).cloned()
    }
}

impl fmt::Debug for SoundLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.sounds.borrow().keys().cloned().collect();
        ids.sort();
        f.debug_struct("SoundLibrary").field("sounds", &ids).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct Counter {
        plays: Cell<u32>,
        pauses: Cell<u32>,
    }

    impl Sound for Counter {
        fn play(&self) {
            self.plays.set(self.plays.get() + 1);
        }

        fn pause(&self) {
            self.pauses.set(self.pauses.get() + 1);
        }
    }

    #[test]
    fn test_library_lookup() {
        let library = SoundLibrary::new();
        assert!(library.is_empty());

        let click = Rc::new(Counter::default());
        library.insert("click", click.clone());
        assert!(library.contains("click"));
        assert_eq!(library.len(), 1);

        let sound = library.get("click").unwrap();
        sound.play();
        sound.play();
        sound.pause();
        assert_eq!(click.plays.get(), 2);
        assert_eq!(click.pauses.get(), 1);

        assert!(library.get("missing").is_none());
        assert!(library.remove("click"));
        assert!(!library.remove("click"));
    }

    #[test]
    fn test_debug_lists_sorted_ids() {
        let library = SoundLibrary::new();
        library.insert("b", Rc::new(Counter::default()));
        library.insert("a", Rc::new(Counter::default()));
        assert_eq!(
            format!("{library:?}"),
            r#"SoundLibrary { sounds: ["a", "b"] }"#
        );
    }
}
