//! Save slots on disk.
//!
//! Each slot is one file in the save directory, named after the slot with
//! an extension per format. Writes go to a temp file first and are renamed
//! into place, so a crash mid-write never leaves a half-written slot.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use satchel_common::{SaveError, SaveResult};
use satchel_core::InventorySnapshot;

use crate::config::SaveFormat;

/// Reads and writes inventory snapshots in a save directory.
#[derive(Debug, Clone)]
pub struct SaveManager {
    save_dir: PathBuf,
    format: SaveFormat,
}

impl SaveManager {
    /// Creates a manager for `save_dir`. The directory is created on first
    /// save.
    pub fn new(save_dir: impl AsRef<Path>, format: SaveFormat) -> Self {
        Self {
            save_dir: save_dir.as_ref().to_path_buf(),
            format,
        }
    }

    /// Returns the save directory path.
    #[must_use]
    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    /// Returns the snapshot encoding.
    #[must_use]
    pub const fn format(&self) -> SaveFormat {
        self.format
    }

    fn slot_path(&self, slot_name: &str) -> PathBuf {
        self.save_dir
            .join(format!("{slot_name}.{}", self.format.extension()))
    }

    fn temp_path(&self, slot_name: &str) -> PathBuf {
        self.save_dir.join(format!("{slot_name}.tmp"))
    }

    fn validate_slot_name(slot_name: &str) -> SaveResult<()> {
        if slot_name.is_empty() {
            return Err(SaveError::InvalidSlotName("Empty slot name".to_string()));
        }

        let invalid_chars = ['/', '\\', ':', '*', '?', '"', '<', '>', '|', '.'];
        if let Some(c) = slot_name.chars().find(|c| invalid_chars.contains(c)) {
            return Err(SaveError::InvalidSlotName(format!(
                "Invalid character '{c}' in slot name"
            )));
        }
        Ok(())
    }

    /// Writes a snapshot to a slot, replacing any previous one.
    pub fn save(&self, slot_name: &str, snapshot: &InventorySnapshot) -> SaveResult<()> {
        Self::validate_slot_name(slot_name)?;
        fs::create_dir_all(&self.save_dir)?;

        let bytes = match self.format {
            SaveFormat::Binary => snapshot.to_bytes()?,
            SaveFormat::Json => snapshot.to_json_pretty()?.into_bytes(),
        };

        match self.atomic_write(slot_name, &bytes) {
            Ok(()) => {
                info!("Saved inventory to slot: {slot_name}");
                Ok(())
            },
            Err(e) => {
                error!("Failed to save slot {slot_name}: {e}");
                Err(e)
            },
        }
    }

    fn atomic_write(&self, slot_name: &str, bytes: &[u8]) -> SaveResult<()> {
        let temp_path = self.temp_path(slot_name);
        let final_path = self.slot_path(slot_name);

        {
            let mut file = File::create(&temp_path)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }

        fs::rename(&temp_path, &final_path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            SaveError::Io(e)
        })?;

        debug!("Atomic write complete for slot: {slot_name}");
        Ok(())
    }

    /// Reads the snapshot in a slot.
    pub fn load(&self, slot_name: &str) -> SaveResult<InventorySnapshot> {
        Self::validate_slot_name(slot_name)?;

        let path = self.slot_path(slot_name);
        if !path.exists() {
            return Err(SaveError::NotFound(slot_name.to_string()));
        }

        let result = match self.format {
            SaveFormat::Binary => InventorySnapshot::from_bytes(&fs::read(&path)?),
            SaveFormat::Json => InventorySnapshot::from_json(&fs::read_to_string(&path)?),
        };
        match &result {
            Ok(_) => info!("Read inventory from slot: {slot_name}"),
            Err(e) => error!("Failed to read slot {slot_name}: {e}"),
        }
        result
    }

    /// Returns true if a slot has a save file.
    #[must_use]
    pub fn exists(&self, slot_name: &str) -> bool {
        Self::validate_slot_name(slot_name).is_ok() && self.slot_path(slot_name).exists()
    }

    /// Deletes a slot.
    pub fn delete(&self, slot_name: &str) -> SaveResult<()> {
        Self::validate_slot_name(slot_name)?;

        let path = self.slot_path(slot_name);
        if !path.exists() {
            return Err(SaveError::NotFound(slot_name.to_string()));
        }
        fs::remove_file(path)?;
        info!("Deleted save slot: {slot_name}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use satchel_common::InstanceId;
    use satchel_core::SlotSnapshot;
    use tempfile::TempDir;

    fn snapshot() -> InventorySnapshot {
        InventorySnapshot {
            items: vec![SlotSnapshot {
                slot_index: 3,
                item_name: "Potion".to_string(),
                instance_id: InstanceId::from_raw(123_456),
            }],
            equipment: [Some("Pendant".to_string()), None, None],
            ..InventorySnapshot::default()
        }
    }

    #[test]
    fn test_validate_slot_name() {
        assert!(SaveManager::validate_slot_name("slot1").is_ok());
        assert!(SaveManager::validate_slot_name("").is_err());
        assert!(SaveManager::validate_slot_name("../escape").is_err());
        assert!(SaveManager::validate_slot_name("a:b").is_err());
    }

    #[test]
    fn test_save_load_both_formats() {
        for format in [SaveFormat::Binary, SaveFormat::Json] {
            let temp_dir = TempDir::new().expect("Failed to create temp dir");
            let manager = SaveManager::new(temp_dir.path().join("saves"), format);

            manager.save("slot1", &snapshot()).expect("save");
            assert!(manager.exists("slot1"));
            assert!(!manager.save_dir().join("slot1.tmp").exists());
            assert_eq!(manager.load("slot1").expect("load"), snapshot());
        }
    }

    #[test]
    fn test_save_overwrites() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let manager = SaveManager::new(temp_dir.path(), SaveFormat::Binary);

        manager.save("slot1", &snapshot()).expect("save");
        manager
            .save("slot1", &InventorySnapshot::default())
            .expect("save");
        assert_eq!(
            manager.load("slot1").expect("load"),
            InventorySnapshot::default()
        );
    }

    #[test]
    fn test_load_missing_and_delete() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let manager = SaveManager::new(temp_dir.path(), SaveFormat::Json);

        assert!(matches!(
            manager.load("nothing"),
            Err(SaveError::NotFound(_))
        ));

        manager.save("slot2", &snapshot()).expect("save");
        manager.delete("slot2").expect("delete");
        assert!(!manager.exists("slot2"));
        assert!(manager.delete("slot2").is_err());
    }

    #[test]
    fn test_load_corrupted_binary() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let manager = SaveManager::new(temp_dir.path(), SaveFormat::Binary);
        fs::write(temp_dir.path().join("slot1.snap"), b"garbage").unwrap();

        assert!(manager.load("slot1").is_err());
    }
}
