//! # Satchel Core
//!
//! Player inventory for a top-down action game.
//!
//! This crate provides:
//! - Item catalog loaded from TOML
//! - Fixed-capacity inventory store with unique instance ids
//! - Equipment sockets (amulet, ring, cape) and their stat bonuses
//! - Directional quick slots bound to item instances
//! - Versioned snapshots (JSON and binary)
//! - Change notifications and player-side sinks
//! - `InventoryManager`, the single entry point tying these together

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod equipment;
pub mod error;
pub mod events;
pub mod instance_id;
pub mod inventory;
pub mod item;
pub mod manager;
pub mod quest;
pub mod quick_slots;
pub mod save;
pub mod stats;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::equipment::*;
    pub use crate::error::*;
    pub use crate::events::*;
    pub use crate::instance_id::*;
    pub use crate::inventory::*;
    pub use crate::item::*;
    pub use crate::manager::*;
    pub use crate::quest::*;
    pub use crate::quick_slots::*;
    pub use crate::save::*;
    pub use crate::stats::*;
}

pub use prelude::*;
