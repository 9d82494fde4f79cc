//! Directional quick slots.
//!
//! Each direction binds a specific item instance, not an item kind. An
//! instance is bound to at most one direction. Bindings can go stale when the
//! instance leaves the store; stale bindings resolve to nothing and are
//! cleared when touched.

use serde::{Deserialize, Serialize};

use satchel_common::{InstanceId, ItemTypeId};

use crate::error::{InventoryError, InventoryResult};
use crate::inventory::InventoryStore;

/// Quick slot direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Up.
    Up,
    /// Down.
    Down,
    /// Left.
    Left,
    /// Right.
    Right,
}

impl Direction {
    /// Number of directions.
    pub const COUNT: usize = 4;

    /// All directions in table order.
    pub const ALL: [Self; Self::COUNT] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// Index of this direction in the table.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Up => 0,
            Self::Down => 1,
            Self::Left => 2,
            Self::Right => 3,
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Parses a lowercase name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.name() == name)
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What a direction currently points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Nothing bound.
    Unbound,
    /// Bound to an instance that is no longer in the store.
    Stale(InstanceId),
    /// Bound to an instance held in `slot`.
    Live {
        /// Inventory slot holding the instance.
        slot: usize,
        /// The bound instance.
        instance: InstanceId,
    },
}

/// Four direction-indexed instance bindings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuickBindingTable {
    bindings: [InstanceId; Direction::COUNT],
}

impl QuickBindingTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw bound id for a direction, if any. Not checked against the store.
    #[must_use]
    pub fn get(&self, direction: Direction) -> Option<InstanceId> {
        let id = self.bindings[direction.index()];
        (!id.is_none()).then_some(id)
    }

    /// Raw table contents in direction order.
    #[must_use]
    pub const fn raw(&self) -> [InstanceId; Direction::COUNT] {
        self.bindings
    }

    /// Replaces the table verbatim, stale entries included.
    pub fn restore(&mut self, bindings: [InstanceId; Direction::COUNT]) {
        self.bindings = bindings;
    }

    /// Direction an instance is bound to.
    #[must_use]
    pub fn direction_of(&self, instance: InstanceId) -> Option<Direction> {
        if instance.is_none() {
            return None;
        }
        Direction::ALL
            .into_iter()
            .find(|d| self.bindings[d.index()] == instance)
    }

    /// Returns true if the instance is bound anywhere.
    #[must_use]
    pub fn is_bound(&self, instance: InstanceId) -> bool {
        self.direction_of(instance).is_some()
    }

    /// Resolves a direction against the store.
    #[must_use]
    pub fn resolve(&self, direction: Direction, store: &InventoryStore) -> Binding {
        match self.get(direction) {
            None => Binding::Unbound,
            Some(instance) => match store.find_instance(instance) {
                Some(slot) => Binding::Live { slot, instance },
                None => Binding::Stale(instance),
            },
        }
    }

    /// Binds a held instance to `direction`, moving it off any other
    /// direction first.
    pub fn assign(
        &mut self,
        instance: InstanceId,
        direction: Direction,
        store: &InventoryStore,
    ) -> InventoryResult<()> {
        if store.find_instance(instance).is_none() {
            return Err(InventoryError::UnknownInstance(instance));
        }
        if let Some(previous) = self.direction_of(instance) {
            self.bindings[previous.index()] = InstanceId::NONE;
        }
        self.bindings[direction.index()] = instance;
        Ok(())
    }

    /// Binds the first held instance of `item` that is not bound yet.
    /// Returns the instance chosen.
    pub fn assign_item(
        &mut self,
        item: ItemTypeId,
        item_name: &str,
        direction: Direction,
        store: &InventoryStore,
    ) -> InventoryResult<InstanceId> {
        let candidate = store
            .iter_occupied()
            .filter(|(_, def, _)| def.id == item)
            .map(|(_, _, instance)| instance)
            .find(|instance| !self.is_bound(*instance));

        match candidate {
            Some(instance) => {
                self.assign(instance, direction, store)?;
                Ok(instance)
            },
            None if store.count_of(item) == 0 => Err(InventoryError::NotHeld(item_name.to_string())),
            None => Err(InventoryError::NoUnboundInstance(item_name.to_string())),
        }
    }

    /// Clears one direction. Returns true if something was bound.
    pub fn clear(&mut self, direction: Direction) -> bool {
        let was_bound = self.get(direction).is_some();
        self.bindings[direction.index()] = InstanceId::NONE;
        was_bound
    }

    /// Clears whichever direction references `instance`.
    pub fn clear_instance(&mut self, instance: InstanceId) -> Option<Direction> {
        let direction = self.direction_of(instance)?;
        self.bindings[direction.index()] = InstanceId::NONE;
        Some(direction)
    }

    /// Clears every binding whose instance is not in the store. Returns the
    /// directions cleared.
    pub fn reconcile(&mut self, store: &InventoryStore) -> Vec<Direction> {
        let stale: Vec<_> = Direction::ALL
            .into_iter()
            .filter(|d| matches!(self.resolve(*d, store), Binding::Stale(_)))
            .collect();
        for direction in &stale {
            self.bindings[direction.index()] = InstanceId::NONE;
        }
        stale
    }

}
