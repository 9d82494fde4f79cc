//! Equipment register: one optional item per socket.
//!
//! Equipping moves the single unit out of the inventory store and into a
//! socket; unequipping moves it back. A displaced item always needs a free
//! inventory slot, otherwise the whole operation is refused and nothing moves.

use std::sync::Arc;

use satchel_common::InstanceId;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{InventoryError, InventoryResult};
use crate::instance_id::InstanceIdAllocator;
use crate::inventory::{InventoryStore, INVENTORY_CAPACITY};
use crate::item::{EquipSocket, ItemDefinition, ItemKind};

/// Aggregate stat bonuses from everything equipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EquipmentBonuses {
    /// Summed defense bonus.
    pub defense: i32,
    /// Summed speed bonus.
    pub speed: f32,
}

/// What an equip moved around.
#[derive(Debug, Clone, PartialEq)]
pub struct EquipOutcome {
    /// Socket that received the item.
    pub socket: EquipSocket,
    /// Inventory slot the item left, with the id it had there.
    pub from_slot: (usize, InstanceId),
    /// Where the previously equipped item went, if there was one.
    pub displaced_to: Option<(usize, InstanceId)>,
}

/// The three equipment sockets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EquipmentRegister {
    sockets: [Option<Arc<ItemDefinition>>; EquipSocket::COUNT],
}

impl EquipmentRegister {
    /// Creates an empty register.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Item in a socket.
    #[must_use]
    pub fn get(&self, socket: EquipSocket) -> Option<&Arc<ItemDefinition>> {
        self.sockets[socket.index()].as_ref()
    }

    /// Returns true if the socket holds an item.
    #[must_use]
    pub fn is_occupied(&self, socket: EquipSocket) -> bool {
        self.sockets[socket.index()].is_some()
    }

    /// Occupied sockets in register order.
    pub fn iter(&self) -> impl Iterator<Item = (EquipSocket, &Arc<ItemDefinition>)> {
        EquipSocket::ALL
            .into_iter()
            .filter_map(|socket| self.get(socket).map(|item| (socket, item)))
    }

    /// Number of occupied sockets.
    #[must_use]
    pub fn equipped_count(&self) -> usize {
        self.sockets.iter().filter(|s| s.is_some()).count()
    }

    /// Sum of bonuses across all sockets.
    #[must_use]
    pub fn bonuses(&self) -> EquipmentBonuses {
        self.iter()
            .fold(EquipmentBonuses::default(), |acc, (_, item)| EquipmentBonuses {
                defense: acc.defense + item.defense_bonus,
                speed: acc.speed + item.speed_bonus,
            })
    }

    /// Puts an item straight into its socket without touching the store.
    /// Used when restoring a snapshot.
    pub(crate) fn restore(&mut self, socket: EquipSocket, item: Arc<ItemDefinition>) {
        self.sockets[socket.index()] = Some(item);
    }

    /// Equips the first held instance of `item`.
    pub fn equip(
        &mut self,
        item: &ItemDefinition,
        store: &mut InventoryStore,
        ids: &mut InstanceIdAllocator,
    ) -> InventoryResult<EquipOutcome> {
        if item.kind != ItemKind::Equipment {
            return Err(InventoryError::WrongKind {
                item: item.name.clone(),
                expected: ItemKind::Equipment,
            });
        }
        let index = store
            .first_index_of(item.id)
            .ok_or_else(|| InventoryError::NotHeld(item.name.clone()))?;
        self.equip_from_slot(index, store, ids)
    }

    /// Equips the exact instance held in inventory slot `index`.
    pub fn equip_from_slot(
        &mut self,
        index: usize,
        store: &mut InventoryStore,
        ids: &mut InstanceIdAllocator,
    ) -> InventoryResult<EquipOutcome> {
        let item = store
            .checked_slot(index)?
            .item()
            .cloned()
            .ok_or(InventoryError::EmptySlot(index))?;
        let socket = match (item.kind, item.socket) {
            (ItemKind::Equipment, Some(socket)) => socket,
            _ => {
                return Err(InventoryError::WrongKind {
                    item: item.name.clone(),
                    expected: ItemKind::Equipment,
                })
            },
        };

        let displaced_to = match self.sockets[socket.index()].clone() {
            Some(previous) => {
                if store.is_full() {
                    warn!(
                        "No room to unequip '{}' from {socket}; keeping it equipped",
                        previous.name
                    );
                    return Err(InventoryError::Full {
                        capacity: INVENTORY_CAPACITY,
                    });
                }
                let outcome = store.add(&previous, 1, ids);
                match outcome.placed.first() {
                    Some(&placed) => Some(placed),
                    None => {
                        return Err(outcome.stopped.unwrap_or(InventoryError::Full {
                            capacity: INVENTORY_CAPACITY,
                        }))
                    },
                }
            },
            None => None,
        };

        let (item, instance) = store.take(index, ids)?;
        self.sockets[socket.index()] = Some(item);
        Ok(EquipOutcome {
            socket,
            from_slot: (index, instance),
            displaced_to,
        })
    }

    /// Moves the item in `socket` back into the store. Returns the slot and
    /// id it was given.
    pub fn unequip(
        &mut self,
        socket: EquipSocket,
        store: &mut InventoryStore,
        ids: &mut InstanceIdAllocator,
    ) -> InventoryResult<(usize, InstanceId)> {
        let item = self.sockets[socket.index()]
            .clone()
            .ok_or(InventoryError::EmptySocket(socket))?;

        let outcome = store.add(&item, 1, ids);
        let Some(&placed) = outcome.placed.first() else {
            warn!("No room to unequip '{}' from {socket}", item.name);
            return Err(outcome.stopped.unwrap_or(InventoryError::Full {
                capacity: INVENTORY_CAPACITY,
            }));
        };

        self.sockets[socket.index()] = None;
        Ok(placed)
    }
}
