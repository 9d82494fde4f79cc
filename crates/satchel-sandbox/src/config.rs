//! Sandbox configuration.
//!
//! Loaded from a TOML file; any missing field takes its default, and a
//! missing or unreadable file yields the defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "satchel.toml";

/// On-disk snapshot encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveFormat {
    /// Magic bytes followed by bincode
    #[default]
    Binary,
    /// Pretty-printed JSON
    Json,
}

impl SaveFormat {
    /// File extension for this format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Binary => "snap",
            Self::Json => "json",
        }
    }
}

/// Sandbox configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Item catalog file
    pub catalog_path: PathBuf,
    /// Directory holding save slots
    pub save_dir: PathBuf,
    /// Slot used by `save`/`load` commands without an argument
    pub save_slot: String,
    /// Snapshot encoding
    pub save_format: SaveFormat,
    /// Instance id seed (None = random)
    pub id_seed: Option<u64>,
    /// Default tracing filter, overridden by `RUST_LOG`
    pub log_filter: String,
    /// Save to `save_slot` after a script finishes
    pub autosave_after_script: bool,
    /// Player max health
    pub max_hp: u32,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("assets/items.toml"),
            save_dir: PathBuf::from("saves"),
            save_slot: "slot1".to_string(),
            save_format: SaveFormat::Binary,
            id_seed: None,
            log_filter: "satchel=info".to_string(),
            autosave_after_script: false,
            max_hp: 100,
        }
    }
}

impl SandboxConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(mut config) => {
                    config.validate();
                    info!("Loaded config from {}", path.display());
                    config
                },
                Err(e) => {
                    warn!("Failed to parse config file: {e}");
                    Self::default()
                },
            },
            Err(e) => {
                warn!("Failed to read config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Normalize values that would make the session unusable.
    pub fn validate(&mut self) {
        let trimmed = self.save_slot.trim();
        if trimmed.is_empty() {
            self.save_slot = Self::default().save_slot;
        } else if trimmed.len() != self.save_slot.len() {
            self.save_slot = trimmed.to_string();
        }

        if self.log_filter.trim().is_empty() {
            self.log_filter = Self::default().log_filter;
        }

        self.max_hp = self.max_hp.clamp(1, 9999);
    }
}
