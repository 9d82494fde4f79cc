//! The inventory service.
//!
//! `InventoryManager` owns the inventory store, equipment register, quick
//! slot table and instance id registry, and is the only way callers mutate
//! them. One instance is created per game session and handed to collaborators
//! by `&mut`.
//!
//! Refused operations leave state untouched and are logged; they return an
//! error (or a count/flag for add and remove) and never panic.

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use crossbeam_channel::Receiver;
use tracing::{debug, error, info, warn};

use satchel_common::{InstanceId, ItemTypeId, SaveResult};

use crate::equipment::{EquipmentBonuses, EquipmentRegister};
use crate::error::{InventoryError, InventoryResult};
use crate::events::{EventDispatcher, InventoryEvent, SubscriberId};
use crate::instance_id::InstanceIdAllocator;
use crate::inventory::{InventoryStore, Slot};
use crate::item::{EquipSocket, ItemCatalog, ItemDefinition, ItemKind};
use crate::quest::{ItemRequirement, QuestProtection};
use crate::quick_slots::{Binding, Direction, QuickBindingTable};
use crate::save::{self, InventorySnapshot, LoadReport};
use crate::stats::{HealthSink, StatsSink};

/// Result of a pickup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectOutcome {
    /// Units now in the inventory.
    pub placed: usize,
    /// Units that did not fit and stay in the world.
    pub left_behind: usize,
}

impl CollectOutcome {
    /// Returns true if every unit was picked up.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.left_behind == 0
    }
}

/// Player inventory, equipment and quick slots behind one API.
pub struct InventoryManager {
    catalog: Arc<ItemCatalog>,
    store: InventoryStore,
    equipment: EquipmentRegister,
    quick_slots: QuickBindingTable,
    ids: InstanceIdAllocator,
    protection: QuestProtection,
    health: Option<Box<dyn HealthSink>>,
    stats: Option<Box<dyn StatsSink>>,
    events: EventDispatcher<InventoryManager>,
}

impl fmt::Debug for InventoryManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InventoryManager")
            .field("store", &self.store)
            .field("equipment", &self.equipment)
            .field("quick_slots", &self.quick_slots)
            .field("live_ids", &self.ids.live_count())
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

impl InventoryManager {
    /// Creates an empty inventory backed by `catalog`.
    #[must_use]
    pub fn new(catalog: Arc<ItemCatalog>) -> Self {
        Self {
            catalog,
            store: InventoryStore::new(),
            equipment: EquipmentRegister::new(),
            quick_slots: QuickBindingTable::new(),
            ids: InstanceIdAllocator::new(),
            protection: QuestProtection::new(),
            health: None,
            stats: None,
            events: EventDispatcher::new(),
        }
    }

    /// Uses a seeded id allocator. Only meaningful before anything is added.
    #[must_use]
    pub fn with_id_seed(mut self, seed: u64) -> Self {
        self.ids = InstanceIdAllocator::with_seed(seed);
        self
    }

    /// Sets the collaborator that receives healing.
    #[must_use]
    pub fn with_health_sink(mut self, sink: impl HealthSink + 'static) -> Self {
        self.health = Some(Box::new(sink));
        self
    }

    /// Sets the collaborator that receives equipment bonuses, and pushes the
    /// current bonuses to it.
    #[must_use]
    pub fn with_stats_sink(mut self, sink: impl StatsSink + 'static) -> Self {
        self.stats = Some(Box::new(sink));
        self.push_bonuses();
        self
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// The item catalog.
    #[must_use]
    pub fn catalog(&self) -> &Arc<ItemCatalog> {
        &self.catalog
    }

    /// The inventory store.
    #[must_use]
    pub fn store(&self) -> &InventoryStore {
        &self.store
    }

    /// The equipment register.
    #[must_use]
    pub fn equipment(&self) -> &EquipmentRegister {
        &self.equipment
    }

    /// The quick slot table, stale bindings included.
    #[must_use]
    pub fn quick_slots(&self) -> &QuickBindingTable {
        &self.quick_slots
    }

    /// Slot at `index`.
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.store.slot(index)
    }

    /// Current aggregate equipment bonuses.
    #[must_use]
    pub fn bonuses(&self) -> EquipmentBonuses {
        self.equipment.bonuses()
    }

    /// Number of held instances of an item.
    #[must_use]
    pub fn count_item(&self, item: ItemTypeId) -> usize {
        self.store.count_of(item)
    }

    /// Returns true if every requirement is covered. Repeated entries for
    /// the same item add up.
    #[must_use]
    pub fn has_items(&self, requirements: &[ItemRequirement]) -> bool {
        let mut needed: AHashMap<ItemTypeId, usize> = AHashMap::new();
        for req in requirements {
            let total = needed.entry(req.item).or_insert(0);
            *total = total.saturating_add(req.count);
        }
        needed
            .into_iter()
            .all(|(item, count)| self.store.count_of(item) >= count)
    }

    /// Effective quest protection of an item.
    #[must_use]
    pub fn is_quest_protected(&self, item: &ItemDefinition) -> bool {
        self.protection.is_protected(item)
    }

    /// Item a quick slot resolves to; `None` if unbound or stale.
    #[must_use]
    pub fn quick_slot_item(&self, direction: Direction) -> Option<Arc<ItemDefinition>> {
        match self.quick_slots.resolve(direction, &self.store) {
            Binding::Live { slot, .. } => self.store.slot(slot).and_then(Slot::item).cloned(),
            Binding::Unbound | Binding::Stale(_) => None,
        }
    }

    // ------------------------------------------------------------------
    // Inventory store
    // ------------------------------------------------------------------

    /// Adds up to `count` units of `item`, one per free slot. Returns the
    /// number placed; anything short of `count` raises `InventoryFull`.
    pub fn add_item(&mut self, item: ItemTypeId, count: usize) -> usize {
        let Some(definition) = self.catalog.get(item).cloned() else {
            warn!("Cannot add unknown item {item}");
            return 0;
        };

        self.retire_stale_bindings();
        let outcome = self.store.add(&definition, count, &mut self.ids);
        let placed = outcome.placed_count();
        if placed > 0 {
            debug!("Added {placed}x '{}'", definition.name);
            self.events.queue(InventoryEvent::InventoryChanged);
        }
        match outcome.stopped {
            Some(InventoryError::AllocationExhausted { attempts }) => {
                error!(
                    "Stopped adding '{}' after {placed}/{count}: no free instance id in {attempts} draws",
                    definition.name
                );
            },
            Some(err) => {
                warn!("Placed {placed}/{count} '{}': {err}", definition.name);
                self.events.queue(InventoryEvent::InventoryFull {
                    item,
                    requested: count,
                    placed,
                });
            },
            None => {},
        }
        self.dispatch_events();
        placed
    }

    /// Adds an item by catalog name.
    pub fn add_item_named(&mut self, name: &str, count: usize) -> usize {
        match self.catalog.by_name(name) {
            Some(definition) => {
                let id = definition.id;
                self.add_item(id, count)
            },
            None => {
                warn!("Cannot add unknown item '{name}'");
                0
            },
        }
    }

    /// Picks up `count` units from the world. Units that do not fit are
    /// reported as left behind; nothing is rolled back.
    pub fn collect(&mut self, item: ItemTypeId, count: usize) -> CollectOutcome {
        let placed = self.add_item(item, count);
        CollectOutcome {
            placed,
            left_behind: count - placed,
        }
    }

    /// Removes up to `count` units of `item`, lowest slot first. Returns
    /// true only if the full count was removed; partial removals stand.
    pub fn remove_item(&mut self, item: ItemTypeId, count: usize) -> bool {
        let removed = self.store.remove(item, count, &mut self.ids);
        if !removed.is_empty() {
            debug!("Removed {}x {item}", removed.len());
            self.events.queue(InventoryEvent::InventoryChanged);
            self.unbind_instances(&removed);
        }
        if removed.len() < count {
            warn!("Removed only {}/{count} of {item}", removed.len());
        }
        self.dispatch_events();
        removed.len() == count
    }

    /// Consumes the item in `slot_index`, healing the player.
    pub fn use_item(&mut self, slot_index: usize) -> InventoryResult<()> {
        let item = match self.store.checked_slot(slot_index) {
            Ok(slot) => slot.item().cloned(),
            Err(err) => return Err(refused("use", err)),
        };
        let item = item.ok_or_else(|| refused("use", InventoryError::EmptySlot(slot_index)))?;
        if !item.is_consumable() {
            return Err(refused(
                "use",
                InventoryError::WrongKind {
                    item: item.name.clone(),
                    expected: ItemKind::Consumable,
                },
            ));
        }

        match self.health.as_mut() {
            Some(health) => health.heal(item.heal_amount),
            None => debug!("No health sink; '{}' consumed without effect", item.name),
        }
        let (_, instance) = self.store.take(slot_index, &mut self.ids)?;
        debug!("Used '{}' from slot {slot_index}", item.name);

        self.events.queue(InventoryEvent::InventoryChanged);
        self.unbind_instances(&[instance]);
        self.dispatch_events();
        Ok(())
    }

    /// Throws away the item in `slot_index`. `on_confirm` runs before the
    /// item is removed.
    pub fn discard_item(
        &mut self,
        slot_index: usize,
        on_confirm: impl FnOnce(&ItemDefinition),
    ) -> InventoryResult<()> {
        let item = match self.store.checked_slot(slot_index) {
            Ok(slot) => slot.item().cloned(),
            Err(err) => return Err(refused("discard", err)),
        };
        let item =
            item.ok_or_else(|| refused("discard", InventoryError::EmptySlot(slot_index)))?;
        if self.protection.is_protected(&item) {
            return Err(refused(
                "discard",
                InventoryError::QuestProtected(item.name.clone()),
            ));
        }

        on_confirm(&item);
        let instance = self.store.checked_slot(slot_index)?.instance();
        self.unbind_instances(&[instance]);
        self.store.take(slot_index, &mut self.ids)?;
        debug!("Discarded '{}' from slot {slot_index}", item.name);

        self.events.queue(InventoryEvent::InventoryChanged);
        self.dispatch_events();
        Ok(())
    }

    /// Exchanges the contents of two slots.
    pub fn swap_slots(&mut self, a: usize, b: usize) -> InventoryResult<()> {
        self.store.swap(a, b).map_err(|err| refused("swap", err))?;
        if a != b {
            self.events.queue(InventoryEvent::InventoryChanged);
            self.events.queue(InventoryEvent::QuickSlotsChanged);
            self.dispatch_events();
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Equipment
    // ------------------------------------------------------------------

    /// Equips the first held instance of `item`. Returns the socket used.
    pub fn equip_item(&mut self, item: ItemTypeId) -> InventoryResult<EquipSocket> {
        let definition = self
            .catalog
            .get(item)
            .cloned()
            .ok_or_else(|| refused("equip", InventoryError::NotHeld(item.to_string())))?;
        self.retire_stale_bindings();
        let outcome = match self
            .equipment
            .equip(&definition, &mut self.store, &mut self.ids)
        {
            Ok(outcome) => outcome,
            Err(err) => return Err(self.equip_refused(definition.socket, err)),
        };
        self.after_equip(outcome.socket, outcome.from_slot.1);
        Ok(outcome.socket)
    }

    /// Equips the exact instance in `slot_index`. Returns the socket used.
    pub fn equip_slot(&mut self, slot_index: usize) -> InventoryResult<EquipSocket> {
        let socket = self
            .store
            .slot(slot_index)
            .and_then(Slot::item)
            .and_then(|item| item.socket);
        self.retire_stale_bindings();
        let outcome = match self
            .equipment
            .equip_from_slot(slot_index, &mut self.store, &mut self.ids)
        {
            Ok(outcome) => outcome,
            Err(err) => return Err(self.equip_refused(socket, err)),
        };
        self.after_equip(outcome.socket, outcome.from_slot.1);
        Ok(outcome.socket)
    }

    /// A socket swap with no room for the displaced item raises
    /// `InventoryFull` for that item.
    fn equip_refused(
        &mut self,
        socket: Option<EquipSocket>,
        err: InventoryError,
    ) -> InventoryError {
        let displaced = socket
            .and_then(|socket| self.equipment.get(socket))
            .map(|item| item.id);
        if let (InventoryError::Full { .. }, Some(item)) = (&err, displaced) {
            self.raise_no_room(item);
        }
        refused("equip", err)
    }

    /// The store had no slot for an item leaving a socket.
    fn raise_no_room(&mut self, item: ItemTypeId) {
        self.events.queue(InventoryEvent::InventoryFull {
            item,
            requested: 1,
            placed: 0,
        });
        self.dispatch_events();
    }

    fn after_equip(&mut self, socket: EquipSocket, moved: InstanceId) {
        if let Some(item) = self.equipment.get(socket) {
            info!("Equipped '{}' in {socket}", item.name);
        }
        self.push_bonuses();
        self.events.queue(InventoryEvent::InventoryChanged);
        self.events
            .queue(InventoryEvent::EquipmentChanged { socket: Some(socket) });
        self.unbind_instances(&[moved]);
        self.dispatch_events();
    }

    /// Moves the item in `socket` back into the inventory.
    pub fn unequip_item(&mut self, socket: EquipSocket) -> InventoryResult<()> {
        self.retire_stale_bindings();
        let held = self.equipment.get(socket).map(|item| item.id);
        let (slot, _) = match self.equipment.unequip(socket, &mut self.store, &mut self.ids) {
            Ok(placed) => placed,
            Err(err) => {
                if let (InventoryError::Full { .. }, Some(item)) = (&err, held) {
                    self.raise_no_room(item);
                }
                return Err(refused("unequip", err));
            },
        };
        info!("Unequipped {socket} into slot {slot}");

        self.push_bonuses();
        self.events.queue(InventoryEvent::InventoryChanged);
        self.events
            .queue(InventoryEvent::EquipmentChanged { socket: Some(socket) });
        self.dispatch_events();
        Ok(())
    }

    fn push_bonuses(&mut self) {
        let bonuses = self.equipment.bonuses();
        if let Some(stats) = self.stats.as_mut() {
            stats.apply_equipment_bonuses(bonuses);
        }
    }

    // ------------------------------------------------------------------
    // Quick slots
    // ------------------------------------------------------------------

    /// Binds a held instance to `direction`.
    pub fn assign_quick_slot(
        &mut self,
        instance: InstanceId,
        direction: Direction,
    ) -> InventoryResult<()> {
        self.quick_slots
            .assign(instance, direction, &self.store)
            .map_err(|err| refused("bind", err))?;
        debug!("Bound instance {instance} to {direction}");
        self.events.queue(InventoryEvent::QuickSlotsChanged);
        self.dispatch_events();
        Ok(())
    }

    /// Binds the first unbound instance of `item` to `direction`. Returns the
    /// instance bound.
    pub fn assign_quick_slot_item(
        &mut self,
        item: ItemTypeId,
        direction: Direction,
    ) -> InventoryResult<InstanceId> {
        let name = self
            .catalog
            .get(item)
            .map_or_else(|| item.to_string(), |def| def.name.clone());
        let instance = self
            .quick_slots
            .assign_item(item, &name, direction, &self.store)
            .map_err(|err| refused("bind", err))?;
        debug!("Bound '{name}' ({instance}) to {direction}");
        self.events.queue(InventoryEvent::QuickSlotsChanged);
        self.dispatch_events();
        Ok(instance)
    }

    /// Uses whatever `direction` is bound to. A stale binding is cleared.
    pub fn use_quick_slot(&mut self, direction: Direction) -> InventoryResult<()> {
        match self.quick_slots.resolve(direction, &self.store) {
            Binding::Unbound => Err(refused("quick use", InventoryError::Unbound(direction))),
            Binding::Stale(instance) => {
                self.quick_slots.clear(direction);
                self.events.queue(InventoryEvent::QuickSlotsChanged);
                self.dispatch_events();
                Err(refused(
                    "quick use",
                    InventoryError::StaleBinding {
                        direction,
                        instance,
                    },
                ))
            },
            // use_item clears the binding once the instance is consumed
            Binding::Live { slot, .. } => self.use_item(slot),
        }
    }

    /// Clears a binding. Returns true if something was bound.
    pub fn clear_quick_slot(&mut self, direction: Direction) -> bool {
        let cleared = self.quick_slots.clear(direction);
        if cleared {
            self.events.queue(InventoryEvent::QuickSlotsChanged);
            self.dispatch_events();
        }
        cleared
    }

    /// Clears every stale binding. Returns the directions cleared.
    pub fn reconcile_quick_slots(&mut self) -> Vec<Direction> {
        let cleared = self.quick_slots.reconcile(&self.store);
        if !cleared.is_empty() {
            debug!("Cleared stale quick slots: {cleared:?}");
            self.events.queue(InventoryEvent::QuickSlotsChanged);
            self.dispatch_events();
        }
        cleared
    }

    /// Drops bindings whose instance is gone before a new id can reuse it.
    fn retire_stale_bindings(&mut self) {
        let _ = self.reconcile_quick_slots();
    }

    fn unbind_instances(&mut self, instances: &[InstanceId]) {
        let mut changed = false;
        for instance in instances {
            changed |= self.quick_slots.clear_instance(*instance).is_some();
        }
        if changed {
            self.events.queue(InventoryEvent::QuickSlotsChanged);
        }
    }

    // ------------------------------------------------------------------
    // Quest engine
    // ------------------------------------------------------------------

    /// Removes every requirement, or nothing if any is short.
    pub fn turn_in(&mut self, requirements: &[ItemRequirement]) -> bool {
        if !self.has_items(requirements) {
            warn!("Turn-in refused: requirements not met");
            return false;
        }
        let mut removed = Vec::new();
        for req in requirements {
            removed.extend(self.store.remove(req.item, req.count, &mut self.ids));
        }
        if !removed.is_empty() {
            self.events.queue(InventoryEvent::InventoryChanged);
            self.unbind_instances(&removed);
            self.dispatch_events();
        }
        true
    }

    /// Protects an item from discarding regardless of its catalog flag.
    pub fn protect_item(&mut self, item: ItemTypeId) {
        self.protection.protect(item);
    }

    /// Allows discarding an item regardless of its catalog flag.
    pub fn lift_protection(&mut self, item: ItemTypeId) {
        self.protection.lift(item);
    }

    /// Returns an item to its catalog protection flag.
    pub fn reset_protection(&mut self, item: ItemTypeId) {
        self.protection.reset(item);
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Captures the three stores.
    #[must_use]
    pub fn save(&self) -> InventorySnapshot {
        InventorySnapshot::capture(&self.store, &self.equipment, &self.quick_slots)
    }

    /// Replaces the three stores with a snapshot's contents. Entries that do
    /// not resolve are skipped; an incompatible version changes nothing.
    pub fn load(&mut self, snapshot: &InventorySnapshot) -> SaveResult<LoadReport> {
        snapshot.check_version()?;

        self.ids.clear();
        let restored = save::restore(snapshot, &self.catalog, &mut self.ids);
        self.store = restored.store;
        self.equipment = restored.equipment;
        self.quick_slots = restored.quick_slots;
        self.push_bonuses();

        let report = restored.report;
        info!(
            "Loaded inventory: {} items ({} skipped, {} ids reassigned), {} equipped ({} skipped)",
            report.restored_items,
            report.skipped_items,
            report.reassigned_ids,
            report.restored_equipment,
            report.skipped_equipment
        );

        self.events.queue(InventoryEvent::InventoryChanged);
        self.events
            .queue(InventoryEvent::EquipmentChanged { socket: None });
        self.events.queue(InventoryEvent::QuickSlotsChanged);
        self.dispatch_events();
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    /// Registers an observer called after every change.
    pub fn subscribe(
        &mut self,
        observer: impl FnMut(&InventoryEvent, &mut InventoryManager) + 'static,
    ) -> SubscriberId {
        self.events.subscribe(Box::new(observer))
    }

    /// Removes an observer.
    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.events.unsubscribe(id);
    }

    /// Returns a receiver that gets a copy of every event.
    pub fn subscribe_channel(&mut self) -> Receiver<InventoryEvent> {
        self.events.subscribe_channel()
    }

    fn dispatch_events(&mut self) {
        // Nested calls from inside an observer land here with a pass already
        // running; that pass drains their events.
        let Some(mut observers) = self.events.begin_dispatch() else {
            return;
        };
        while let Some(event) = self.events.next_event() {
            for (id, observer) in &mut observers {
                if !self.events.is_removed(*id) {
                    observer(&event, self);
                }
            }
        }
        self.events.end_dispatch(observers);
    }
}

fn refused(action: &str, err: InventoryError) -> InventoryError {
    warn!("Refused {action}: {err} ({:?})", err.category());
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::PlayerVitals;
    use std::cell::RefCell;
    use std::rc::Rc;

    const POTION: ItemTypeId = ItemTypeId::new(1);
    const HERB: ItemTypeId = ItemTypeId::new(2);
    const SWORD: ItemTypeId = ItemTypeId::new(10);
    const RUBY_RING: ItemTypeId = ItemTypeId::new(20);
    const IRON_RING: ItemTypeId = ItemTypeId::new(21);
    const CLOAK: ItemTypeId = ItemTypeId::new(30);
    const OLD_KEY: ItemTypeId = ItemTypeId::new(40);

    fn catalog() -> Arc<ItemCatalog> {
        Arc::new(
            ItemCatalog::from_definitions([
                ItemDefinition::consumable(1, "Potion", 25),
                ItemDefinition::consumable(2, "Herb", 5),
                ItemDefinition::equipment(10, "Sword", EquipSocket::Amulet, 4, 0.0),
                ItemDefinition::equipment(20, "RubyRing", EquipSocket::Ring, 2, 0.5),
                ItemDefinition::equipment(21, "IronRing", EquipSocket::Ring, 1, 0.0),
                ItemDefinition::equipment(30, "Cloak", EquipSocket::Cape, 3, -0.25),
                ItemDefinition::quest_item(40, "OldKey"),
            ])
            .unwrap(),
        )
    }

    fn manager() -> (InventoryManager, Rc<RefCell<PlayerVitals>>) {
        let player = Rc::new(RefCell::new(PlayerVitals::new().with_health(50, 100)));
        let manager = InventoryManager::new(catalog())
            .with_id_seed(42)
            .with_health_sink(Rc::clone(&player))
            .with_stats_sink(Rc::clone(&player));
        (manager, player)
    }

    fn record_events(manager: &mut InventoryManager) -> Rc<RefCell<Vec<InventoryEvent>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        manager.subscribe(move |event, _| sink.borrow_mut().push(event.clone()));
        log
    }

    #[test]
    fn test_add_reports_partial_and_full() {
        let (mut inv, _) = manager();
        let events = record_events(&mut inv);
        assert_eq!(inv.add_item(HERB, 10), 10);

        assert_eq!(inv.add_item(POTION, 5), 2);
        assert_eq!(inv.count_item(POTION), 2);
        assert_eq!(
            events.borrow().last(),
            Some(&InventoryEvent::InventoryFull {
                item: POTION,
                requested: 5,
                placed: 2
            })
        );
    }

    #[test]
    fn test_full_inventory_add_places_nothing() {
        let (mut inv, _) = manager();
        inv.add_item(HERB, 12);
        let before = inv.store().clone();

        assert_eq!(inv.add_item(POTION, 1), 0);
        assert_eq!(inv.store(), &before);

        let outcome = inv.collect(POTION, 3);
        assert_eq!(
            outcome,
            CollectOutcome {
                placed: 0,
                left_behind: 3
            }
        );
        assert!(!outcome.is_complete());
    }

    #[test]
    fn test_add_unknown_item() {
        let (mut inv, _) = manager();
        assert_eq!(inv.add_item(ItemTypeId::new(999), 1), 0);
        assert_eq!(inv.add_item_named("Nothing", 1), 0);
        assert_eq!(inv.add_item_named("Herb", 2), 2);
    }

    #[test]
    fn test_remove_item_partial() {
        let (mut inv, _) = manager();
        inv.add_item(POTION, 2);
        assert!(!inv.remove_item(POTION, 3));
        assert_eq!(inv.count_item(POTION), 0);
        assert!(inv.remove_item(HERB, 0));
    }

    #[test]
    fn test_use_item_heals_and_consumes() {
        let (mut inv, player) = manager();
        inv.add_item(POTION, 1);
        inv.use_item(0).unwrap();

        assert_eq!(player.borrow().hp, 75);
        assert!(inv.slot(0).unwrap().is_empty());
        assert_eq!(inv.ids.live_count(), 0);
    }

    #[test]
    fn test_use_item_refusals() {
        let (mut inv, player) = manager();
        inv.add_item(SWORD, 1);

        assert_eq!(inv.use_item(3), Err(InventoryError::EmptySlot(3)));
        assert!(matches!(
            inv.use_item(0),
            Err(InventoryError::WrongKind { .. })
        ));
        assert!(matches!(
            inv.use_item(20),
            Err(InventoryError::SlotOutOfRange { .. })
        ));
        assert_eq!(inv.count_item(SWORD), 1);
        assert_eq!(player.borrow().hp, 50);
    }

    #[test]
    fn test_discard_quest_item_changes_nothing() {
        let (mut inv, _) = manager();
        inv.add_item(OLD_KEY, 1);
        let instance = inv.slot(0).unwrap().instance();
        inv.assign_quick_slot(instance, Direction::Left).unwrap();

        let mut confirmed = false;
        let result = inv.discard_item(0, |_| confirmed = true);
        assert_eq!(result, Err(InventoryError::QuestProtected("OldKey".into())));
        assert!(!confirmed);
        assert_eq!(inv.slot(0).unwrap().instance(), instance);
        assert!(inv.ids.is_live(instance));
        assert_eq!(inv.quick_slots().get(Direction::Left), Some(instance));

        inv.lift_protection(OLD_KEY);
        inv.discard_item(0, |item| assert_eq!(item.name, "OldKey"))
            .unwrap();
        assert!(inv.slot(0).unwrap().is_empty());
    }

    #[test]
    fn test_discard_clears_binding_and_confirms() {
        let (mut inv, _) = manager();
        inv.add_item(HERB, 1);
        let instance = inv.slot(0).unwrap().instance();
        inv.assign_quick_slot(instance, Direction::Up).unwrap();

        let confirmed = RefCell::new(None);
        inv.discard_item(0, |item| *confirmed.borrow_mut() = Some(item.id))
            .unwrap();

        assert_eq!(*confirmed.borrow(), Some(HERB));
        assert_eq!(inv.quick_slots().get(Direction::Up), None);
        assert!(!inv.ids.is_live(instance));
        assert!(inv.discard_item(0, |_| {}).is_err());
    }

    #[test]
    fn test_protect_overrides_catalog() {
        let (mut inv, _) = manager();
        inv.add_item(HERB, 1);
        inv.protect_item(HERB);
        assert!(inv.discard_item(0, |_| {}).is_err());
        inv.reset_protection(HERB);
        assert!(inv.discard_item(0, |_| {}).is_ok());
    }

    #[test]
    fn test_swap_emits_both_notifications() {
        let (mut inv, _) = manager();
        inv.add_item(POTION, 1);
        let events = record_events(&mut inv);

        inv.swap_slots(0, 11).unwrap();
        assert_eq!(
            *events.borrow(),
            vec![
                InventoryEvent::InventoryChanged,
                InventoryEvent::QuickSlotsChanged
            ]
        );
        assert!(inv.slot(11).unwrap().holds(POTION));

        inv.swap_slots(4, 4).unwrap();
        assert_eq!(events.borrow().len(), 2);
        assert!(inv.swap_slots(0, 12).is_err());
    }

    #[test]
    fn test_swap_keeps_bindings_on_instances() {
        let (mut inv, _) = manager();
        inv.add_item(POTION, 1);
        inv.add_item(HERB, 1);
        inv.assign_quick_slot_item(POTION, Direction::Right).unwrap();

        inv.swap_slots(0, 1).unwrap();
        assert_eq!(inv.quick_slot_item(Direction::Right).unwrap().id, POTION);
    }

    #[test]
    fn test_equip_pushes_bonuses() {
        let (mut inv, player) = manager();
        inv.add_item(RUBY_RING, 1);
        inv.add_item(CLOAK, 1);

        assert_eq!(inv.equip_item(RUBY_RING), Ok(EquipSocket::Ring));
        assert_eq!(inv.equip_slot(1), Ok(EquipSocket::Cape));
        assert_eq!(player.borrow().bonuses.defense, 5);
        assert_eq!(inv.store().occupied_slots(), 0);

        inv.unequip_item(EquipSocket::Ring).unwrap();
        assert_eq!(player.borrow().bonuses.defense, 3);
        assert_eq!(inv.count_item(RUBY_RING), 1);
    }

    #[test]
    fn test_equip_with_full_socket_and_store_fails_entirely() {
        let (mut inv, player) = manager();
        inv.add_item(RUBY_RING, 1);
        inv.equip_item(RUBY_RING).unwrap();
        inv.add_item(HERB, 3);
        inv.add_item(IRON_RING, 1);
        inv.add_item(HERB, 8);
        assert!(inv.store().is_full());

        let events = record_events(&mut inv);
        let result = inv.equip_item(IRON_RING);
        assert!(matches!(result, Err(InventoryError::Full { .. })));
        assert_eq!(
            *events.borrow(),
            vec![InventoryEvent::InventoryFull {
                item: RUBY_RING,
                requested: 1,
                placed: 0,
            }]
        );
        assert_eq!(inv.equipment().get(EquipSocket::Ring).unwrap().id, RUBY_RING);
        assert!(inv.slot(3).unwrap().holds(IRON_RING));
        assert_eq!(player.borrow().bonuses.defense, 2);
    }

    #[test]
    fn test_equip_refusals() {
        let (mut inv, _) = manager();
        inv.add_item(POTION, 1);
        assert!(matches!(
            inv.equip_item(POTION),
            Err(InventoryError::WrongKind { .. })
        ));
        assert!(matches!(
            inv.equip_item(CLOAK),
            Err(InventoryError::NotHeld(_))
        ));
        assert_eq!(
            inv.unequip_item(EquipSocket::Amulet),
            Err(InventoryError::EmptySocket(EquipSocket::Amulet))
        );
    }

    #[test]
    fn test_equip_clears_binding_of_moved_instance() {
        let (mut inv, _) = manager();
        inv.add_item(SWORD, 1);
        inv.assign_quick_slot_item(SWORD, Direction::Down).unwrap();
        inv.equip_item(SWORD).unwrap();
        assert_eq!(inv.quick_slots().get(Direction::Down), None);
    }

    #[test]
    fn test_rebinding_instance_moves_direction() {
        let (mut inv, _) = manager();
        inv.add_item(POTION, 1);
        let instance = inv.slot(0).unwrap().instance();

        inv.assign_quick_slot(instance, Direction::Up).unwrap();
        inv.assign_quick_slot(instance, Direction::Down).unwrap();

        assert!(inv.quick_slot_item(Direction::Up).is_none());
        assert_eq!(inv.quick_slot_item(Direction::Down).unwrap().id, POTION);
    }

    #[test]
    fn test_use_quick_slot_consumes_and_unbinds() {
        let (mut inv, player) = manager();
        inv.add_item(POTION, 2);
        let bound = inv.assign_quick_slot_item(POTION, Direction::Up).unwrap();

        inv.use_quick_slot(Direction::Up).unwrap();
        assert_eq!(player.borrow().hp, 75);
        assert_eq!(inv.count_item(POTION), 1);
        assert!(inv.store().find_instance(bound).is_none());
        assert_eq!(inv.quick_slots().get(Direction::Up), None);

        assert_eq!(
            inv.use_quick_slot(Direction::Up),
            Err(InventoryError::Unbound(Direction::Up))
        );
    }

    #[test]
    fn test_use_quick_slot_stale_binding_is_cleared() {
        let (mut inv, player) = manager();
        let mut snapshot = InventorySnapshot::default();
        snapshot.quick_slots[Direction::Left.index()] = InstanceId::from_raw(654_321);
        inv.load(&snapshot).unwrap();

        assert!(inv.quick_slot_item(Direction::Left).is_none());
        assert!(matches!(
            inv.use_quick_slot(Direction::Left),
            Err(InventoryError::StaleBinding { .. })
        ));
        assert_eq!(inv.quick_slots().get(Direction::Left), None);
        assert_eq!(player.borrow().hp, 50);
    }

    #[test]
    fn test_use_quick_slot_wrong_kind_keeps_binding() {
        let (mut inv, _) = manager();
        inv.add_item(CLOAK, 1);
        let instance = inv.assign_quick_slot_item(CLOAK, Direction::Right).unwrap();
        assert!(inv.use_quick_slot(Direction::Right).is_err());
        assert_eq!(inv.quick_slots().get(Direction::Right), Some(instance));
    }

    #[test]
    fn test_reconcile_quick_slots() {
        let (mut inv, _) = manager();
        let mut snapshot = InventorySnapshot::default();
        snapshot.quick_slots = [
            InstanceId::from_raw(111_111),
            InstanceId::from_raw(222_222),
            InstanceId::NONE,
            InstanceId::NONE,
        ];
        snapshot.items.push(crate::save::SlotSnapshot {
            slot_index: 2,
            item_name: "Potion".into(),
            instance_id: InstanceId::from_raw(111_111),
        });
        inv.load(&snapshot).unwrap();

        assert_eq!(inv.reconcile_quick_slots(), vec![Direction::Down]);
        assert_eq!(inv.quick_slot_item(Direction::Up).unwrap().id, POTION);
        assert!(inv.clear_quick_slot(Direction::Up));
        assert!(!inv.clear_quick_slot(Direction::Up));
    }

    #[test]
    fn test_turn_in_is_all_or_nothing() {
        let (mut inv, _) = manager();
        inv.add_item(HERB, 3);
        inv.add_item(OLD_KEY, 1);

        let too_much = [
            ItemRequirement::new(HERB, 2),
            ItemRequirement::new(HERB, 2),
        ];
        assert!(!inv.has_items(&too_much));
        assert!(!inv.turn_in(&too_much));
        assert_eq!(inv.count_item(HERB), 3);

        let enough = [
            ItemRequirement::new(HERB, 3),
            ItemRequirement::new(OLD_KEY, 1),
        ];
        assert!(inv.turn_in(&enough));
        assert_eq!(inv.store().occupied_slots(), 0);
    }

    #[test]
    fn test_has_items_with_huge_counts() {
        let (mut inv, _) = manager();
        inv.add_item(HERB, 3);

        let absurd = [
            ItemRequirement::new(HERB, usize::MAX),
            ItemRequirement::new(HERB, 1),
        ];
        assert!(!inv.has_items(&absurd));
        assert!(!inv.turn_in(&absurd));
        assert_eq!(inv.count_item(HERB), 3);
    }

    #[test]
    fn test_save_load_round_trip() {
        let (mut inv, _) = manager();
        let snapshot = InventorySnapshot {
            items: vec![
                crate::save::SlotSnapshot {
                    slot_index: 0,
                    item_name: "Potion".into(),
                    instance_id: InstanceId::from_raw(111_111),
                },
                crate::save::SlotSnapshot {
                    slot_index: 5,
                    item_name: "Sword".into(),
                    instance_id: InstanceId::from_raw(222_222),
                },
            ],
            equipment: [None, Some("RubyRing".into()), None],
            quick_slots: [
                InstanceId::from_raw(111_111),
                InstanceId::NONE,
                InstanceId::NONE,
                InstanceId::NONE,
            ],
            ..InventorySnapshot::default()
        };
        inv.load(&snapshot).unwrap();

        let json = inv.save().to_json().unwrap();
        let (mut restored, player) = manager();
        restored
            .load(&InventorySnapshot::from_json(&json).unwrap())
            .unwrap();

        assert_eq!(restored.save(), snapshot);
        assert_eq!(restored.slot(0).unwrap().instance().raw(), 111_111);
        assert!(restored.slot(5).unwrap().holds(SWORD));
        assert_eq!(
            restored.equipment().get(EquipSocket::Ring).unwrap().id,
            RUBY_RING
        );
        assert_eq!(restored.quick_slot_item(Direction::Up).unwrap().id, POTION);
        assert_eq!(player.borrow().bonuses.defense, 2);

        // Restored ids are live, so new instances cannot collide with them
        assert!(!restored.ids.reserve(InstanceId::from_raw(222_222)));
    }

    #[test]
    fn test_load_refuses_newer_version_without_mutation() {
        let (mut inv, _) = manager();
        inv.add_item(POTION, 2);
        let before = inv.save();

        let mut snapshot = InventorySnapshot::default();
        snapshot.version = satchel_common::SchemaVersion::new(2, 0, 0);
        assert!(inv.load(&snapshot).is_err());
        assert_eq!(inv.save(), before);
    }

    /// A snapshot whose Up binding names the first id seed 42 will draw.
    fn snapshot_with_dangling_binding() -> (InventorySnapshot, InstanceId) {
        let dangling = InstanceIdAllocator::with_seed(42).allocate().unwrap();
        let snapshot = InventorySnapshot {
            quick_slots: [
                dangling,
                InstanceId::NONE,
                InstanceId::NONE,
                InstanceId::NONE,
            ],
            ..InventorySnapshot::default()
        };
        (snapshot, dangling)
    }

    #[test]
    fn test_loaded_stale_binding_not_revived_by_add() {
        let (mut inv, _) = manager();
        let (snapshot, dangling) = snapshot_with_dangling_binding();
        inv.load(&snapshot).unwrap();
        assert_eq!(inv.quick_slots().get(Direction::Up), Some(dangling));

        let events = record_events(&mut inv);
        assert_eq!(inv.add_item(HERB, 1), 1);

        assert!(inv.quick_slot_item(Direction::Up).is_none());
        assert_eq!(inv.quick_slots().get(Direction::Up), None);
        assert_eq!(
            *events.borrow(),
            vec![
                InventoryEvent::QuickSlotsChanged,
                InventoryEvent::InventoryChanged,
            ]
        );
    }

    #[test]
    fn test_loaded_stale_binding_not_revived_by_unequip() {
        let (mut inv, _) = manager();
        let (mut snapshot, _) = snapshot_with_dangling_binding();
        snapshot.equipment = [None, Some("RubyRing".into()), None];
        inv.load(&snapshot).unwrap();

        inv.unequip_item(EquipSocket::Ring).unwrap();

        assert_eq!(inv.count_item(RUBY_RING), 1);
        assert!(inv.quick_slot_item(Direction::Up).is_none());
        assert_eq!(inv.quick_slots().get(Direction::Up), None);
    }

    #[test]
    fn test_unequip_without_room_raises_full() {
        let (mut inv, _) = manager();
        inv.add_item(RUBY_RING, 1);
        inv.equip_item(RUBY_RING).unwrap();
        inv.add_item(HERB, 12);

        let events = record_events(&mut inv);
        assert!(matches!(
            inv.unequip_item(EquipSocket::Ring),
            Err(InventoryError::Full { .. })
        ));
        assert_eq!(
            *events.borrow(),
            vec![InventoryEvent::InventoryFull {
                item: RUBY_RING,
                requested: 1,
                placed: 0,
            }]
        );
        assert_eq!(inv.equipment().get(EquipSocket::Ring).unwrap().id, RUBY_RING);
    }

    #[test]
    fn test_observers_run_in_registration_order() {
        let (mut inv, _) = manager();
        let order = Rc::new(RefCell::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let order = Rc::clone(&order);
            inv.subscribe(move |_, _| order.borrow_mut().push(tag));
        }

        inv.add_item(POTION, 1);
        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_reentrant_observer_sees_final_state() {
        let (mut inv, _) = manager();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);

        // A quest tracker that consumes herbs as soon as three are held
        inv.subscribe(move |event, inv| {
            if *event == InventoryEvent::InventoryChanged {
                let herbs = inv.count_item(HERB);
                log.borrow_mut().push(herbs);
                if herbs >= 3 {
                    assert!(inv.remove_item(HERB, 3));
                }
            }
        });
        let later = record_events(&mut inv);

        inv.add_item(HERB, 2);
        inv.add_item(HERB, 1);

        assert_eq!(*seen.borrow(), vec![2, 3, 0]);
        assert_eq!(inv.count_item(HERB), 0);
        assert_eq!(
            *later.borrow(),
            vec![
                InventoryEvent::InventoryChanged,
                InventoryEvent::InventoryChanged,
                InventoryEvent::InventoryChanged
            ]
        );
    }

    #[test]
    fn test_unsubscribe_inside_observer() {
        let (mut inv, _) = manager();
        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        let id = Rc::new(RefCell::new(None));
        let own_id = Rc::clone(&id);
        let subscriber = inv.subscribe(move |_, inv| {
            *counter.borrow_mut() += 1;
            if let Some(id) = *own_id.borrow() {
                inv.unsubscribe(id);
            }
        });
        *id.borrow_mut() = Some(subscriber);

        inv.add_item(POTION, 1);
        inv.add_item(POTION, 1);
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn test_channel_subscriber_receives_events() {
        let (mut inv, _) = manager();
        let rx = inv.subscribe_channel();
        inv.add_item(RUBY_RING, 1);
        inv.equip_item(RUBY_RING).unwrap();

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                InventoryEvent::InventoryChanged,
                InventoryEvent::InventoryChanged,
                InventoryEvent::EquipmentChanged {
                    socket: Some(EquipSocket::Ring)
                },
            ]
        );

        drop(rx);
        inv.add_item(POTION, 1);
        assert_eq!(inv.events.subscriber_count(), 0);
    }
}
