//! Persisted settings for the Herald command protocol.
//!
//! The dispatcher and the permission gate read a handful of boolean knobs
//! (hints, command logging, security, relay of unknown commands) plus one
//! lazily created entry per registered trigger. Settings live in a TOML
//! file of `[section]`-grouped booleans and are exposed as *live cells*:
//! a [`BoolSetting`] handle keeps reflecting changes made through the store
//! or through another handle to the same cell.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::info;

/// Section holding the per-trigger permission entries.
pub const PERMISSIONS_SECTION: &str = "permissions";

/// A live handle onto one boolean setting cell.
///
/// Cheap to clone; all clones observe the same value.
#[derive(Debug, Clone)]
pub struct BoolSetting {
    cell: Arc<AtomicBool>,
}

impl BoolSetting {
    /// A handle not backed by any store, fixed at creation value until set.
    /// Useful in tests and for hosts that do not persist settings.
    pub fn detached(value: bool) -> Self {
        Self {
            cell: Arc::new(AtomicBool::new(value)),
        }
    }

    pub fn get(&self) -> bool {
        self.cell.load(Ordering::Relaxed)
    }

    pub fn set(&self, value: bool) {
        self.cell.store(value, Ordering::Relaxed);
    }
}

#[derive(Debug)]
struct Cell {
    value: Arc<AtomicBool>,
    description: String,
}

/// On-disk shape: `[section]` tables of `key = bool`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile(BTreeMap<String, BTreeMap<String, bool>>);

/// A TOML-backed store of boolean settings grouped into sections.
///
/// Owned by the dispatch engine; collaborators receive [`BoolSetting`]
/// handles rather than the store itself.
#[derive(Debug, Default)]
pub struct SettingsStore {
    path: Option<PathBuf>,
    cells: BTreeMap<(String, String), Cell>,
    /// Values present in the loaded file but not (yet) claimed by a cell —
    /// e.g. operator-added permission entries for unregistered triggers.
    unclaimed: BTreeMap<(String, String), bool>,
}

impl SettingsStore {
    /// An empty store with no backing file.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load settings from a TOML file.
    ///
    /// A missing file is not an error: the store starts empty and `save`
    /// will create it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "no settings file found, starting with defaults");
            return Ok(Self {
                path: Some(path.to_path_buf()),
                ..Self::default()
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let file: SettingsFile = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut unclaimed = BTreeMap::new();
        for (section, entries) in file.0 {
            for (key, value) in entries {
                unclaimed.insert((section.clone(), key), value);
            }
        }

        Ok(Self {
            path: Some(path.to_path_buf()),
            cells: BTreeMap::new(),
            unclaimed,
        })
    }

    /// Get (or lazily create) the live cell for `section.key`.
    ///
    /// The first call decides the default; a value loaded from the file
    /// wins over the default. Later calls for the same cell return a handle
    /// onto the existing value and ignore `default`/`description`.
    pub fn bool_setting(
        &mut self,
        section: &str,
        key: &str,
        default: bool,
        description: &str,
    ) -> BoolSetting {
        let id = (section.to_string(), key.to_string());
        if let Some(cell) = self.cells.get(&id) {
            return BoolSetting {
                cell: cell.value.clone(),
            };
        }

        let initial = self.unclaimed.remove(&id).unwrap_or(default);
        let value = Arc::new(AtomicBool::new(initial));
        self.cells.insert(
            id,
            Cell {
                value: value.clone(),
                description: description.to_string(),
            },
        );
        BoolSetting { cell: value }
    }

    /// Read a value without creating a cell.
    ///
    /// Consults live cells first, then file-loaded values nobody claimed.
    /// The permission gate uses this for triggers that were never
    /// registered, so an operator can explicitly allow a relay-only command
    /// by adding it to the file.
    pub fn peek_bool(&self, section: &str, key: &str) -> Option<bool> {
        let id = (section.to_string(), key.to_string());
        if let Some(cell) = self.cells.get(&id) {
            return Some(cell.value.load(Ordering::Relaxed));
        }
        self.unclaimed.get(&id).copied()
    }

    /// Description recorded for a cell, if one exists.
    pub fn description(&self, section: &str, key: &str) -> Option<&str> {
        self.cells
            .get(&(section.to_string(), key.to_string()))
            .map(|c| c.description.as_str())
    }

    /// Persist all cells (and unclaimed values) to the backing file.
    pub fn save(&self) -> Result<(), ConfigError> {
        let Some(path) = &self.path else {
            return Ok(()); // in-memory store, nothing to do
        };
        self.save_to(path)
    }

    /// Persist to an explicit path.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let mut file = SettingsFile::default();
        for ((section, key), cell) in &self.cells {
            file.0
                .entry(section.clone())
                .or_default()
                .insert(key.clone(), cell.value.load(Ordering::Relaxed));
        }
        for ((section, key), value) in &self.unclaimed {
            file.0
                .entry(section.clone())
                .or_default()
                .insert(key.clone(), *value);
        }

        let content = toml::to_string_pretty(&file.0).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read settings file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse settings file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Failed to write settings file at {path}: {reason}")]
    WriteError { path: PathBuf, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_applies_on_first_creation() {
        let mut store = SettingsStore::in_memory();
        let hints = store.bool_setting("commands", "hints_enabled", true, "Append usage hints");
        assert!(hints.get());
    }

    #[test]
    fn handles_share_one_cell() {
        let mut store = SettingsStore::in_memory();
        let a = store.bool_setting("commands", "security_enabled", true, "");
        let b = store.bool_setting("commands", "security_enabled", false, "ignored");
        a.set(false);
        assert!(!b.get());
        b.set(true);
        assert!(a.get());
    }

    #[test]
    fn peek_reads_live_cells() {
        let mut store = SettingsStore::in_memory();
        let cell = store.bool_setting(PERMISSIONS_SECTION, "kick", false, "");
        assert_eq!(store.peek_bool(PERMISSIONS_SECTION, "kick"), Some(false));
        cell.set(true);
        assert_eq!(store.peek_bool(PERMISSIONS_SECTION, "kick"), Some(true));
        assert_eq!(store.peek_bool(PERMISSIONS_SECTION, "ban"), None);
    }

    #[test]
    fn description_recorded_once() {
        let mut store = SettingsStore::in_memory();
        store.bool_setting("commands", "log_all_commands", false, "Log every command");
        assert_eq!(
            store.description("commands", "log_all_commands"),
            Some("Log every command")
        );
    }

    #[test]
    fn save_and_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("herald.toml");

        let mut store = SettingsStore::load(&path).unwrap();
        let security = store.bool_setting("commands", "security_enabled", true, "");
        security.set(false);
        store.bool_setting(PERMISSIONS_SECTION, "help", false, "").set(true);
        store.save().unwrap();

        let mut reloaded = SettingsStore::load(&path).unwrap();
        // File value wins over the default on re-creation.
        let security = reloaded.bool_setting("commands", "security_enabled", true, "");
        assert!(!security.get());
        assert_eq!(reloaded.peek_bool(PERMISSIONS_SECTION, "help"), Some(true));
    }

    #[test]
    fn operator_added_entry_visible_without_registration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("herald.toml");
        std::fs::write(&path, "[permissions]\nwave = true\n").unwrap();

        let store = SettingsStore::load(&path).unwrap();
        assert_eq!(store.peek_bool(PERMISSIONS_SECTION, "wave"), Some(true));
    }

    #[test]
    fn missing_file_starts_empty() {
        let store = SettingsStore::load("/nonexistent/herald.toml").unwrap();
        assert_eq!(store.peek_bool("commands", "hints_enabled"), None);
    }

    #[test]
    fn unclaimed_values_survive_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("herald.toml");
        std::fs::write(&path, "[permissions]\nwave = true\n").unwrap();

        let mut store = SettingsStore::load(&path).unwrap();
        store.bool_setting("commands", "hints_enabled", true, "");
        store.save().unwrap();

        let reloaded = SettingsStore::load(&path).unwrap();
        assert_eq!(reloaded.peek_bool(PERMISSIONS_SECTION, "wave"), Some(true));
        assert_eq!(reloaded.peek_bool("commands", "hints_enabled"), Some(true));
    }
}
