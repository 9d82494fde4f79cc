//! Inventory store.
//!
//! A fixed array of slots, each holding at most one item instance. Empty slots
//! may appear anywhere; nothing is ever compacted.

use std::sync::Arc;

use satchel_common::{InstanceId, ItemTypeId};

use crate::error::{InventoryError, InventoryResult};
use crate::instance_id::InstanceIdAllocator;
use crate::item::ItemDefinition;

/// Number of slots in the player's inventory.
pub const INVENTORY_CAPACITY: usize = 12;

/// One inventory cell.
///
/// Holds either nothing (with [`InstanceId::NONE`]) or exactly one item
/// instance with a live id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Slot {
    item: Option<Arc<ItemDefinition>>,
    instance: InstanceId,
}

impl Slot {
    /// Creates an empty slot.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            item: None,
            instance: InstanceId::NONE,
        }
    }

    fn occupied(item: Arc<ItemDefinition>, instance: InstanceId) -> Self {
        Self {
            item: Some(item),
            instance,
        }
    }

    /// Returns true if nothing is stored here.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.item.is_none()
    }

    /// The stored item, if any.
    #[must_use]
    pub fn item(&self) -> Option<&Arc<ItemDefinition>> {
        self.item.as_ref()
    }

    /// The stored instance id, or [`InstanceId::NONE`].
    #[must_use]
    pub const fn instance(&self) -> InstanceId {
        self.instance
    }

    /// Returns true if this slot holds an instance of `item`.
    #[must_use]
    pub fn holds(&self, item: ItemTypeId) -> bool {
        self.item.as_ref().is_some_and(|def| def.id == item)
    }

    fn take(&mut self) -> Option<(Arc<ItemDefinition>, InstanceId)> {
        let item = self.item.take()?;
        let instance = std::mem::take(&mut self.instance);
        Some((item, instance))
    }
}

/// Result of adding units to the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddOutcome {
    /// Slots filled, with the instance ids given to them.
    pub placed: Vec<(usize, InstanceId)>,
    /// Why adding stopped early, if it did.
    pub stopped: Option<InventoryError>,
}

impl AddOutcome {
    /// Number of units placed.
    #[must_use]
    pub fn placed_count(&self) -> usize {
        self.placed.len()
    }
}

/// The fixed-size slot array.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryStore {
    slots: [Slot; INVENTORY_CAPACITY],
}

impl Default for InventoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InventoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| Slot::empty()),
        }
    }

    /// Returns the capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        INVENTORY_CAPACITY
    }

    /// All slots in index order.
    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Slot at `index`, if in range.
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    /// Slot at `index`, or `SlotOutOfRange`.
    pub fn checked_slot(&self, index: usize) -> InventoryResult<&Slot> {
        self.slots.get(index).ok_or(InventoryError::SlotOutOfRange {
            index,
            capacity: INVENTORY_CAPACITY,
        })
    }

    /// Lowest-index empty slot.
    #[must_use]
    pub fn first_empty(&self) -> Option<usize> {
        self.slots.iter().position(Slot::is_empty)
    }

    /// Number of empty slots.
    #[must_use]
    pub fn free_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_empty()).count()
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn occupied_slots(&self) -> usize {
        INVENTORY_CAPACITY - self.free_slots()
    }

    /// Returns true if no slot is empty.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.first_empty().is_none()
    }

    /// Number of held instances of an item kind.
    #[must_use]
    pub fn count_of(&self, item: ItemTypeId) -> usize {
        self.slots.iter().filter(|s| s.holds(item)).count()
    }

    /// Lowest slot index holding an instance of `item`.
    #[must_use]
    pub fn first_index_of(&self, item: ItemTypeId) -> Option<usize> {
        self.slots.iter().position(|s| s.holds(item))
    }

    /// Slot index holding a given instance.
    #[must_use]
    pub fn find_instance(&self, instance: InstanceId) -> Option<usize> {
        if instance.is_none() {
            return None;
        }
        self.slots.iter().position(|s| s.instance == instance)
    }

    /// Occupied slots as `(index, item, instance)`.
    pub fn iter_occupied(&self) -> impl Iterator<Item = (usize, &Arc<ItemDefinition>, InstanceId)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.item.as_ref().map(|item| (index, item, slot.instance)))
    }

    /// Places up to `count` units of `item`, one per empty slot in ascending
    /// index order, each with a freshly allocated id. Units already placed are
    /// kept when the store fills up or allocation fails.
    pub fn add(
        &mut self,
        item: &Arc<ItemDefinition>,
        count: usize,
        ids: &mut InstanceIdAllocator,
    ) -> AddOutcome {
        let mut outcome = AddOutcome::default();
        for _ in 0..count {
            let Some(index) = self.first_empty() else {
                outcome.stopped = Some(InventoryError::Full {
                    capacity: INVENTORY_CAPACITY,
                });
                break;
            };
            match ids.allocate() {
                Ok(instance) => {
                    self.slots[index] = Slot::occupied(Arc::clone(item), instance);
                    outcome.placed.push((index, instance));
                },
                Err(err) => {
                    outcome.stopped = Some(err);
                    break;
                },
            }
        }
        outcome
    }

    /// Puts an item with a known id into a specific empty slot.
    /// Returns false if the index is out of range or the slot is occupied.
    pub fn insert_at(&mut self, index: usize, item: Arc<ItemDefinition>, instance: InstanceId) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) if slot.is_empty() && !instance.is_none() => {
                *slot = Slot::occupied(item, instance);
                true
            },
            _ => false,
        }
    }

    /// Clears up to `count` slots holding `item`, lowest index first, and
    /// releases their ids. Returns the removed instances.
    pub fn remove(
        &mut self,
        item: ItemTypeId,
        count: usize,
        ids: &mut InstanceIdAllocator,
    ) -> Vec<InstanceId> {
        let mut removed = Vec::new();
        for slot in &mut self.slots {
            if removed.len() >= count {
                break;
            }
            if slot.holds(item) {
                if let Some((_, instance)) = slot.take() {
                    ids.release(instance);
                    removed.push(instance);
                }
            }
        }
        removed
    }

    /// Clears one slot and releases its id.
    pub fn take(
        &mut self,
        index: usize,
        ids: &mut InstanceIdAllocator,
    ) -> InventoryResult<(Arc<ItemDefinition>, InstanceId)> {
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(InventoryError::SlotOutOfRange {
                index,
                capacity: INVENTORY_CAPACITY,
            })?;
        let (item, instance) = slot.take().ok_or(InventoryError::EmptySlot(index))?;
        ids.release(instance);
        Ok((item, instance))
    }

    /// Exchanges the full contents of two slots. Swapping a slot with itself
    /// does nothing.
    pub fn swap(&mut self, a: usize, b: usize) -> InventoryResult<()> {
        self.checked_slot(a)?;
        self.checked_slot(b)?;
        if a != b {
            self.slots.swap(a, b);
        }
        Ok(())
    }
}
