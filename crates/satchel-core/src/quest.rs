//! Quest-facing pieces: discard protection and item requirements.
//!
//! The quest engine owns its own objectives and rewards. It only needs to
//! decide which items may not be thrown away and to describe what a turn-in
//! consumes.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use satchel_common::ItemTypeId;

use crate::item::ItemDefinition;

/// One entry of a turn-in: `count` units of `item`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRequirement {
    /// Required item.
    pub item: ItemTypeId,
    /// Units required.
    pub count: usize,
}

impl ItemRequirement {
    /// Creates a requirement.
    #[must_use]
    pub const fn new(item: ItemTypeId, count: usize) -> Self {
        Self { item, count }
    }
}

/// Runtime overrides of the catalog's quest-protected flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestProtection {
    lifted: AHashSet<ItemTypeId>,
    forced: AHashSet<ItemTypeId>,
}

impl QuestProtection {
    /// Creates an empty override set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Protects an item regardless of its catalog flag.
    pub fn protect(&mut self, item: ItemTypeId) {
        self.lifted.remove(&item);
        self.forced.insert(item);
    }

    /// Lifts protection from an item regardless of its catalog flag.
    pub fn lift(&mut self, item: ItemTypeId) {
        self.forced.remove(&item);
        self.lifted.insert(item);
    }

    /// Drops any override so the catalog flag applies again.
    pub fn reset(&mut self, item: ItemTypeId) {
        self.forced.remove(&item);
        self.lifted.remove(&item);
    }

    /// Effective protection for a definition.
    #[must_use]
    pub fn is_protected(&self, item: &ItemDefinition) -> bool {
        if self.forced.contains(&item.id) {
            return true;
        }
        item.quest_protected && !self.lifted.contains(&item.id)
    }
}
