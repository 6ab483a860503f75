use crate::model::RootId;
use serde::{Deserialize, Serialize};

/// Whether node levels are persisted or reconstructed from interval containment on read
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LevelStrategy {
    #[default]
    Tracked,
    Derived,
}

/// Whether parent ids are persisted or reconstructed from interval containment on read
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParentStrategy {
    #[default]
    Tracked,
    Derived,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Allows several independent trees in one store. When disabled every tree
    /// is created under `default_root_id` and `make_root` is rejected.
    pub multi_root: bool,
    pub default_root_id: RootId,
    pub level: LevelStrategy,
    pub parent: ParentStrategy,
}

impl TreeConfig {
    pub fn with_multi_root(mut self, multi_root: bool) -> Self {
        self.multi_root = multi_root;
        self
    }

    pub fn with_default_root_id(mut self, root_id: RootId) -> Self {
        self.default_root_id = root_id;
        self
    }

    pub fn with_level(mut self, level: LevelStrategy) -> Self {
        self.level = level;
        self
    }

    pub fn with_parent(mut self, parent: ParentStrategy) -> Self {
        self.parent = parent;
        self
    }

    /// Both level and parent are reconstructed on read
    pub fn derived(self) -> Self {
        self.with_level(LevelStrategy::Derived).with_parent(ParentStrategy::Derived)
    }

    pub fn tracks_level(&self) -> bool {
        self.level == LevelStrategy::Tracked
    }

    pub fn tracks_parent(&self) -> bool {
        self.parent == ParentStrategy::Tracked
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self { multi_root: false, default_root_id: 1, level: LevelStrategy::Tracked, parent: ParentStrategy::Tracked }
    }
}
