//! Inventory snapshots.
//!
//! A snapshot is a flat, versioned record of the three stores. Items are
//! stored by catalog name so snapshots survive catalog id renumbering. Quick
//! slot ids are stored raw, stale ones included.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use satchel_common::{InstanceId, MagicBytes, SaveError, SaveResult, SchemaVersion};

use crate::equipment::EquipmentRegister;
use crate::instance_id::InstanceIdAllocator;
use crate::inventory::{InventoryStore, INVENTORY_CAPACITY};
use crate::item::{EquipSocket, ItemCatalog, ItemDefinition};
use crate::quick_slots::{Direction, QuickBindingTable};

/// One occupied inventory slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotSnapshot {
    /// Slot index.
    pub slot_index: usize,
    /// Catalog name of the item.
    pub item_name: String,
    /// Instance id the item had.
    pub instance_id: InstanceId,
}

/// Saved state of the inventory, equipment and quick slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySnapshot {
    /// Snapshot schema version.
    pub version: SchemaVersion,
    /// Occupied slots.
    pub items: Vec<SlotSnapshot>,
    /// Equipped item names by socket.
    pub equipment: [Option<String>; EquipSocket::COUNT],
    /// Raw quick slot ids by direction.
    pub quick_slots: [InstanceId; Direction::COUNT],
}

impl Default for InventorySnapshot {
    fn default() -> Self {
        Self {
            version: SchemaVersion::SNAPSHOT,
            items: Vec::new(),
            equipment: Default::default(),
            quick_slots: [InstanceId::NONE; Direction::COUNT],
        }
    }
}

impl InventorySnapshot {
    /// Captures the current state of the stores.
    #[must_use]
    pub fn capture(
        store: &InventoryStore,
        equipment: &EquipmentRegister,
        quick_slots: &QuickBindingTable,
    ) -> Self {
        Self {
            version: SchemaVersion::SNAPSHOT,
            items: store
                .iter_occupied()
                .map(|(slot_index, item, instance_id)| SlotSnapshot {
                    slot_index,
                    item_name: item.name.clone(),
                    instance_id,
                })
                .collect(),
            equipment: EquipSocket::ALL.map(|socket| equipment.get(socket).map(|i| i.name.clone())),
            quick_slots: quick_slots.raw(),
        }
    }

    /// Refuses snapshots written by an incompatible schema.
    pub fn check_version(&self) -> SaveResult<()> {
        if SchemaVersion::SNAPSHOT.can_read(&self.version) {
            Ok(())
        } else {
            Err(SaveError::VersionMismatch {
                expected: SchemaVersion::SNAPSHOT,
                found: self.version,
            })
        }
    }

    /// Serializes to compact JSON.
    pub fn to_json(&self) -> SaveResult<String> {
        serde_json::to_string(self).map_err(|e| SaveError::Serialization(e.to_string()))
    }

    /// Serializes to indented JSON.
    pub fn to_json_pretty(&self) -> SaveResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SaveError::Serialization(e.to_string()))
    }

    /// Deserializes from JSON and checks the version.
    pub fn from_json(json: &str) -> SaveResult<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| SaveError::Corrupted(e.to_string()))?;
        snapshot.check_version()?;
        Ok(snapshot)
    }

    /// Serializes to binary format.
    pub fn to_bytes(&self) -> SaveResult<Vec<u8>> {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&MagicBytes::SNAPSHOT.0);

        let data = bincode::serialize(self).map_err(|e| SaveError::Serialization(e.to_string()))?;
        buffer.extend(data);

        Ok(buffer)
    }

    /// Deserializes from binary format and checks the version.
    pub fn from_bytes(bytes: &[u8]) -> SaveResult<Self> {
        if !MagicBytes::SNAPSHOT.matches(bytes) {
            return Err(SaveError::InvalidFormat);
        }

        let snapshot: Self = bincode::deserialize(&bytes[MagicBytes::SNAPSHOT.0.len()..])
            .map_err(|e| SaveError::Corrupted(e.to_string()))?;
        snapshot.check_version()?;
        Ok(snapshot)
    }
}

/// What a load restored and what it had to drop or repair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Inventory entries restored.
    pub restored_items: usize,
    /// Inventory entries dropped (unknown name, bad or duplicate index).
    pub skipped_items: usize,
    /// Restored entries whose saved id was unusable and got a fresh one.
    pub reassigned_ids: usize,
    /// Sockets restored.
    pub restored_equipment: usize,
    /// Sockets dropped (unknown name, wrong kind, wrong socket).
    pub skipped_equipment: usize,
}

/// Freshly built stores, ready to replace the live ones.
#[derive(Debug)]
pub(crate) struct RestoredState {
    pub store: InventoryStore,
    pub equipment: EquipmentRegister,
    pub quick_slots: QuickBindingTable,
    pub report: LoadReport,
}

/// Rebuilds the stores from a snapshot. `ids` must already be cleared; it is
/// re-seeded with every restored instance id.
pub(crate) fn restore(
    snapshot: &InventorySnapshot,
    catalog: &ItemCatalog,
    ids: &mut InstanceIdAllocator,
) -> RestoredState {
    let mut report = LoadReport::default();
    let mut store = InventoryStore::new();
    let mut needs_fresh_id: Vec<(usize, Arc<ItemDefinition>)> = Vec::new();
    let mut claimed = [false; INVENTORY_CAPACITY];

    for entry in &snapshot.items {
        if entry.slot_index >= INVENTORY_CAPACITY || claimed[entry.slot_index] {
            warn!(
                "Skipping saved item '{}': slot {} is out of range or duplicated",
                entry.item_name, entry.slot_index
            );
            report.skipped_items += 1;
            continue;
        }
        let Some(item) = catalog.by_name(&entry.item_name) else {
            warn!(
                "Skipping saved item '{}' in slot {}: not in catalog",
                entry.item_name, entry.slot_index
            );
            report.skipped_items += 1;
            continue;
        };

        claimed[entry.slot_index] = true;
        if ids.reserve(entry.instance_id) {
            store.insert_at(entry.slot_index, Arc::clone(item), entry.instance_id);
            report.restored_items += 1;
        } else {
            needs_fresh_id.push((entry.slot_index, Arc::clone(item)));
        }
    }

    // Fresh ids are drawn only after every saved id is reserved so they
    // cannot collide with a later entry. Ids still named by a quick binding
    // are held too, or a reassigned item would pick up that binding.
    let held_for_bindings: Vec<InstanceId> = snapshot
        .quick_slots
        .iter()
        .copied()
        .filter(|id| id.is_valid() && ids.reserve(*id))
        .collect();
    for (slot_index, item) in needs_fresh_id {
        match ids.allocate() {
            Ok(instance) => {
                warn!(
                    "Saved item '{}' in slot {slot_index} had an unusable id; reassigned {instance}",
                    item.name
                );
                store.insert_at(slot_index, item, instance);
                report.restored_items += 1;
                report.reassigned_ids += 1;
            },
            Err(err) => {
                warn!("Skipping saved item '{}': {err}", item.name);
                report.skipped_items += 1;
            },
        }
    }

    for id in held_for_bindings {
        ids.release(id);
    }

    let mut equipment = EquipmentRegister::new();
    for (socket, name) in EquipSocket::ALL.into_iter().zip(&snapshot.equipment) {
        let Some(name) = name else { continue };
        match catalog.by_name(name) {
            Some(item) if item.is_equipment() && item.socket == Some(socket) => {
                equipment.restore(socket, Arc::clone(item));
                report.restored_equipment += 1;
            },
            Some(_) => {
                warn!("Skipping saved equipment '{name}': cannot be worn in {socket}");
                report.skipped_equipment += 1;
            },
            None => {
                warn!("Skipping saved equipment '{name}' in {socket}: not in catalog");
                report.skipped_equipment += 1;
            },
        }
    }

    let mut quick_slots = QuickBindingTable::new();
    quick_slots.restore(snapshot.quick_slots);

    RestoredState {
        store,
        equipment,
        quick_slots,
        report,
    }
}
