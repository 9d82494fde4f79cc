//! One play session: catalog, inventory, player and save slots.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use tracing::{debug, info};

use satchel_core::{InventoryEvent, InventoryManager, ItemCatalog, LoadReport, PlayerVitals};

use crate::config::SandboxConfig;
use crate::save_manager::SaveManager;

/// Owns everything a running game needs from the inventory.
#[derive(Debug)]
pub struct GameSession {
    config: SandboxConfig,
    inventory: InventoryManager,
    player: Rc<RefCell<PlayerVitals>>,
    saves: SaveManager,
    hud: Receiver<InventoryEvent>,
}

impl GameSession {
    /// Starts a session, loading the catalog named in `config`.
    pub fn new(config: SandboxConfig) -> Result<Self> {
        let catalog = ItemCatalog::load_from(&config.catalog_path).with_context(|| {
            format!("loading item catalog {}", config.catalog_path.display())
        })?;
        info!("Loaded {} item definitions", catalog.len());
        Ok(Self::with_catalog(config, Arc::new(catalog)))
    }

    /// Starts a session with an already loaded catalog.
    pub fn with_catalog(config: SandboxConfig, catalog: Arc<ItemCatalog>) -> Self {
        let player = Rc::new(RefCell::new(
            PlayerVitals::new().with_health(config.max_hp, config.max_hp),
        ));

        let mut inventory = InventoryManager::new(catalog);
        if let Some(seed) = config.id_seed {
            inventory = inventory.with_id_seed(seed);
        }
        let mut inventory = inventory
            .with_health_sink(Rc::clone(&player))
            .with_stats_sink(Rc::clone(&player));
        let hud = inventory.subscribe_channel();

        let saves = SaveManager::new(&config.save_dir, config.save_format);
        Self {
            config,
            inventory,
            player,
            saves,
            hud,
        }
    }

    /// Session configuration.
    #[must_use]
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// The inventory.
    #[must_use]
    pub fn inventory(&self) -> &InventoryManager {
        &self.inventory
    }

    /// The inventory, for mutation.
    pub fn inventory_mut(&mut self) -> &mut InventoryManager {
        &mut self.inventory
    }

    /// The player record fed by the inventory.
    #[must_use]
    pub fn player(&self) -> &Rc<RefCell<PlayerVitals>> {
        &self.player
    }

    /// Save slot storage.
    #[must_use]
    pub fn saves(&self) -> &SaveManager {
        &self.saves
    }

    /// Drains notifications raised since the last call, the way a HUD would
    /// once per frame.
    pub fn poll_notifications(&self) -> Vec<InventoryEvent> {
        let events: Vec<_> = self.hud.try_iter().collect();
        for event in &events {
            debug!("HUD notified: {event:?}");
        }
        events
    }

    /// Saves the inventory to `slot`, or the configured slot.
    pub fn save(&self, slot: Option<&str>) -> Result<()> {
        let slot = slot.unwrap_or(&self.config.save_slot);
        self.saves
            .save(slot, &self.inventory.save())
            .with_context(|| format!("saving slot '{slot}'"))
    }

    /// Loads the inventory from `slot`, or the configured slot.
    pub fn load(&mut self, slot: Option<&str>) -> Result<LoadReport> {
        let slot = slot.unwrap_or(&self.config.save_slot).to_string();
        let snapshot = self
            .saves
            .load(&slot)
            .with_context(|| format!("reading slot '{slot}'"))?;
        self.inventory
            .load(&snapshot)
            .with_context(|| format!("restoring slot '{slot}'"))
    }

    /// Multi-line summary of the inventory, equipment and quick slots.
    #[must_use]
    pub fn describe(&self) -> String {
        use std::fmt::Write;

        let inv = &self.inventory;
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Inventory ({}/{}):",
            inv.store().occupied_slots(),
            inv.store().capacity()
        );
        for (index, item, instance) in inv.store().iter_occupied() {
            let _ = writeln!(out, "  [{index:2}] {} #{instance}", item.label());
        }
        for (socket, item) in inv.equipment().iter() {
            let _ = writeln!(out, "  {socket}: {}", item.label());
        }
        for direction in satchel_core::Direction::ALL {
            if let Some(item) = inv.quick_slot_item(direction) {
                let _ = writeln!(out, "  quick {direction}: {}", item.label());
            }
        }
        let player = self.player.borrow();
        let _ = write!(
            out,
            "  hp {}/{}  defense {}  speed {:.2}",
            player.hp,
            player.max_hp,
            player.defense(),
            player.speed()
        );
        out
    }
}
