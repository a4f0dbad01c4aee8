//! Settings persistence
//!
//! The settings blob (configuration, ignore list and saved snapshot) is kept
//! as JSON under the vault's state directory.

use super::settings::{Settings, SettingsError};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

/// Directory under the vault root holding notehealth state
pub const STATE_DIR: &str = ".notehealth";

const SETTINGS_FILE: &str = "settings.json";

/// Load and persist the settings blob
pub trait SettingsStore: Send + Sync {
    /// Load stored settings, falling back to defaults when absent or unreadable
    fn load(&self) -> Settings;

    fn save(&self, settings: &Settings) -> Result<(), SettingsError>;
}

/// JSON file store at `<vault>/.notehealth/settings.json`
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn for_vault(vault_root: &Path) -> Self {
        Self {
            path: vault_root.join(STATE_DIR).join(SETTINGS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Settings, SettingsError> {
        let file = File::open(&self.path)?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| SettingsError::Parse(e.to_string()))
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> Settings {
        if !self.path.exists() {
            debug!("No settings at {}, using defaults", self.path.display());
            return Settings::default();
        }
        match self.read() {
            Ok(settings) => {
                debug!("Loaded settings from {}", self.path.display());
                settings
            }
            Err(e) => {
                warn!("Failed to load {}: {}", self.path.display(), e);
                Settings::default()
            }
        }
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }

        // Write to temp file first, then rename (atomic on POSIX)
        let tmp_file = self.path.with_extension("tmp");
        {
            let file = File::create(&tmp_file)?;
            serde_json::to_writer_pretty(BufWriter::new(file), settings)
                .map_err(|e| SettingsError::Parse(e.to_string()))?;
        }
        fs::rename(&tmp_file, &self.path)?;

        debug!("Saved settings to {}", self.path.display());
        Ok(())
    }
}

/// Store that keeps the blob in memory; `saves()` counts persists
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: Mutex<Option<Settings>>,
    saves: Mutex<usize>,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(Some(settings)),
            saves: Mutex::new(0),
        }
    }

    pub fn saves(&self) -> usize {
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn stored(&self) -> Option<Settings> {
        self.settings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Settings {
        self.stored().unwrap_or_default()
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        *self.settings.lock().unwrap_or_else(PoisonError::into_inner) = Some(settings.clone());
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DiagnosisSnapshot;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = TempDir::new().unwrap();
        let store = JsonSettingsStore::for_vault(dir.path());
        assert_eq!(store.load(), Settings::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = JsonSettingsStore::for_vault(dir.path());

        let mut settings = Settings::default();
        settings.max_note_length = 700;
        settings.ignore("naked-links-a.md-3");
        settings.saved_diagnosis = Some(DiagnosisSnapshot {
            health_score: 88,
            ..Default::default()
        });
        store.save(&settings).unwrap();

        assert!(store.path().exists());
        assert!(!store.path().with_extension("tmp").exists());
        assert_eq!(store.load(), settings);
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let store = JsonSettingsStore::for_vault(dir.path());
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{ not json").unwrap();
        assert_eq!(store.load(), Settings::default());
    }

    #[test]
    fn test_memory_store_counts_saves() {
        let store = MemorySettingsStore::default();
        assert_eq!(store.load(), Settings::default());
        store.save(&Settings::default()).unwrap();
        store.save(&Settings::default()).unwrap();
        assert_eq!(store.saves(), 2);
    }
}
