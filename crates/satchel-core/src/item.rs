//! Item definitions and the read-only item catalog.
//!
//! This module provides:
//! - `ItemDefinition`, the immutable description of an item kind
//! - `ItemCatalog`, lookup by id and by persisted name
//! - Loading catalogs from `[[items]]` TOML asset files with validation

use std::fs;
use std::path::Path;
use std::sync::Arc;

use ahash::AHashMap;
use satchel_common::ItemTypeId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur while building or loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Failed to read file.
    #[error("Failed to read item catalog: {0}")]
    Read(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("Failed to parse item catalog TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// Validation error.
    #[error("Item '{name}' is invalid: {reason}")]
    Validation {
        /// Offending item name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Duplicate item ID.
    #[error("Duplicate item ID: {0}")]
    DuplicateId(ItemTypeId),

    /// Duplicate item name.
    #[error("Duplicate item name: {0}")]
    DuplicateName(String),
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// What an item does when the player interacts with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Used up on activation (potions, food).
    Consumable,
    /// Worn in an equipment socket.
    Equipment,
    /// Carried for quests; neither usable nor wearable.
    QuestItem,
}

/// Equipment socket an item can be worn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipSocket {
    /// Neck slot.
    Amulet,
    /// Finger slot.
    Ring,
    /// Back slot.
    Cape,
}

impl EquipSocket {
    /// Number of sockets.
    pub const COUNT: usize = 3;

    /// All sockets in register order.
    pub const ALL: [Self; Self::COUNT] = [Self::Amulet, Self::Ring, Self::Cape];

    /// Index of this socket in the register.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Amulet => 0,
            Self::Ring => 1,
            Self::Cape => 2,
        }
    }

    /// Socket at a register index.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Amulet),
            1 => Some(Self::Ring),
            2 => Some(Self::Cape),
            _ => None,
        }
    }

    /// Lowercase name, as used in asset files and commands.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Amulet => "amulet",
            Self::Ring => "ring",
            Self::Cape => "cape",
        }
    }

    /// Parses a lowercase name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }
}

impl std::fmt::Display for EquipSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable definition of an item kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    /// Catalog id; identity comparisons use this.
    pub id: ItemTypeId,
    /// Unique persisted name.
    pub name: String,
    /// Name shown to the player.
    #[serde(default)]
    pub display_name: String,
    /// Item kind.
    pub kind: ItemKind,
    /// Socket for equipment.
    #[serde(default)]
    pub socket: Option<EquipSocket>,
    /// Health restored when consumed.
    #[serde(default, rename = "heal")]
    pub heal_amount: u32,
    /// Defense granted while equipped.
    #[serde(default, rename = "defense")]
    pub defense_bonus: i32,
    /// Speed granted while equipped.
    #[serde(default, rename = "speed")]
    pub speed_bonus: f32,
    /// Refuses discarding while set.
    #[serde(default)]
    pub quest_protected: bool,
}

impl ItemDefinition {
    fn base(id: u32, name: &str, kind: ItemKind) -> Self {
        Self {
            id: ItemTypeId::new(id),
            name: name.to_string(),
            display_name: name.to_string(),
            kind,
            socket: None,
            heal_amount: 0,
            defense_bonus: 0,
            speed_bonus: 0.0,
            quest_protected: false,
        }
    }

    /// Creates a consumable definition.
    #[must_use]
    pub fn consumable(id: u32, name: &str, heal_amount: u32) -> Self {
        Self {
            heal_amount,
            ..Self::base(id, name, ItemKind::Consumable)
        }
    }

    /// Creates an equipment definition.
    #[must_use]
    pub fn equipment(id: u32, name: &str, socket: EquipSocket, defense: i32, speed: f32) -> Self {
        Self {
            socket: Some(socket),
            defense_bonus: defense,
            speed_bonus: speed,
            ..Self::base(id, name, ItemKind::Equipment)
        }
    }

    /// Creates a quest item definition. Quest items start out protected.
    #[must_use]
    pub fn quest_item(id: u32, name: &str) -> Self {
        Self {
            quest_protected: true,
            ..Self::base(id, name, ItemKind::QuestItem)
        }
    }

    /// Returns true for consumables.
    #[must_use]
    pub fn is_consumable(&self) -> bool {
        self.kind == ItemKind::Consumable
    }

    /// Returns true for equipment.
    #[must_use]
    pub fn is_equipment(&self) -> bool {
        self.kind == ItemKind::Equipment
    }

    /// Display name, falling back to the persisted name.
    #[must_use]
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }

    /// Validates the definition's internal consistency.
    pub fn validate(&self) -> CatalogResult<()> {
        let invalid = |reason: &str| CatalogError::Validation {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        match (self.kind, self.socket) {
            (ItemKind::Equipment, None) => return Err(invalid("equipment must declare a socket")),
            (ItemKind::Consumable | ItemKind::QuestItem, Some(_)) => {
                return Err(invalid("only equipment may declare a socket"));
            },
            _ => {},
        }
        if !self.speed_bonus.is_finite() {
            return Err(invalid("speed bonus must be finite"));
        }
        if self.kind == ItemKind::Consumable && self.heal_amount == 0 {
            warn!("Consumable '{}' heals for 0", self.name);
        }
        Ok(())
    }
}

/// On-disk layout of a catalog asset file.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    items: Vec<ItemDefinition>,
}

/// Read-only registry of item definitions.
#[derive(Debug, Default)]
pub struct ItemCatalog {
    by_id: AHashMap<ItemTypeId, Arc<ItemDefinition>>,
    by_name: AHashMap<String, ItemTypeId>,
}

impl ItemCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from definitions, failing on the first invalid one.
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = ItemDefinition>,
    ) -> CatalogResult<Self> {
        let mut catalog = Self::new();
        for definition in definitions {
            catalog.insert(definition)?;
        }
        Ok(catalog)
    }

    /// Parses a catalog from TOML text.
    pub fn from_toml_str(contents: &str) -> CatalogResult<Self> {
        let file: CatalogFile = toml::from_str(contents)?;
        Self::from_definitions(file.items)
    }

    /// Loads a catalog from a TOML asset file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> CatalogResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let catalog = Self::from_toml_str(&contents)?;
        info!("Loaded {} items from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Validates and registers a definition.
    pub fn insert(&mut self, definition: ItemDefinition) -> CatalogResult<Arc<ItemDefinition>> {
        definition.validate()?;
        if self.by_id.contains_key(&definition.id) {
            return Err(CatalogError::DuplicateId(definition.id));
        }
        if self.by_name.contains_key(&definition.name) {
            return Err(CatalogError::DuplicateName(definition.name));
        }

        debug!("Registered item {} '{}'", definition.id, definition.name);
        let definition = Arc::new(definition);
        self.by_name
            .insert(definition.name.clone(), definition.id);
        self.by_id.insert(definition.id, Arc::clone(&definition));
        Ok(definition)
    }

    /// Looks up a definition by id.
    #[must_use]
    pub fn get(&self, id: ItemTypeId) -> Option<&Arc<ItemDefinition>> {
        self.by_id.get(&id)
    }

    /// Looks up a definition by persisted name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Arc<ItemDefinition>> {
        self.by_name.get(name).and_then(|id| self.by_id.get(id))
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns true if the catalog holds no definitions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Iterates over all definitions in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ItemDefinition>> {
        self.by_id.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[[items]]
id = 1
name = "Potion"
display_name = "Healing Potion"
kind = "consumable"
heal = 25

[[items]]
id = 20
name = "RubyRing"
kind = "equipment"
socket = "ring"
defense = 2
speed = 0.5

[[items]]
id = 40
name = "OldKey"
kind = "quest_item"
quest_protected = true
"#;

    #[test]
    fn test_socket_index_round_trip() {
        for socket in EquipSocket::ALL {
            assert_eq!(EquipSocket::from_index(socket.index()), Some(socket));
        }
        assert_eq!(EquipSocket::from_index(3), None);
    }

    #[test]
    fn test_catalog_from_toml() {
        let catalog = ItemCatalog::from_toml_str(SAMPLE).unwrap();
        assert_eq!(catalog.len(), 3);

        let potion = catalog.by_name("Potion").unwrap();
        assert_eq!(potion.kind, ItemKind::Consumable);
        assert_eq!(potion.heal_amount, 25);
        assert_eq!(potion.label(), "Healing Potion");

        let ring = catalog.get(ItemTypeId::new(20)).unwrap();
        assert_eq!(ring.socket, Some(EquipSocket::Ring));
        assert_eq!(ring.defense_bonus, 2);
        assert_eq!(ring.label(), "RubyRing");

        assert!(catalog.by_name("OldKey").unwrap().quest_protected);
        assert!(catalog.by_name("Missing").is_none());
    }

    #[test]
    fn test_catalog_rejects_duplicates() {
        let mut catalog = ItemCatalog::new();
        catalog
            .insert(ItemDefinition::consumable(1, "Potion", 10))
            .unwrap();

        let dup_id = catalog.insert(ItemDefinition::consumable(1, "Elixir", 10));
        assert!(matches!(dup_id, Err(CatalogError::DuplicateId(_))));

        let dup_name = catalog.insert(ItemDefinition::consumable(2, "Potion", 10));
        assert!(matches!(dup_name, Err(CatalogError::DuplicateName(_))));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_equipment_requires_socket() {
        let mut sword = ItemDefinition::equipment(5, "Sword", EquipSocket::Cape, 1, 0.0);
        sword.socket = None;
        assert!(matches!(
            sword.validate(),
            Err(CatalogError::Validation { .. })
        ));

        let mut potion = ItemDefinition::consumable(6, "Potion", 5);
        potion.socket = Some(EquipSocket::Ring);
        assert!(potion.validate().is_err());
    }

    #[test]
    fn test_catalog_parse_error() {
        let result = ItemCatalog::from_toml_str("[[items]]\nid = \"one\"");
        assert!(matches!(result, Err(CatalogError::Parse(_))));
    }
}
