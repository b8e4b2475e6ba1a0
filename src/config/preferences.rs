//! Persisted user preferences
//!
//! A small string key/value store kept as JSON in the platform config
//! directory. The store is passed explicitly to whatever needs it; nothing
//! reaches for it globally.

use crate::error::{IntakeError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Key holding the UI theme name
pub const THEME_KEY: &str = "theme";

/// Theme used when none has been stored
pub const DEFAULT_THEME: &str = "dark";

const PREFERENCES_FILE: &str = "preferences.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct PreferencesJson {
    #[serde(default)]
    values: BTreeMap<String, String>,
}

/// Key/value preference store backed by a JSON file
#[derive(Debug)]
pub struct PreferenceStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl PreferenceStore {
    /// Open the store at the platform config location
    pub fn open_default() -> Result<Self> {
        let dirs = ProjectDirs::from("com", "stemintake", "stemintake").ok_or_else(|| {
            IntakeError::Config("could not determine a config directory for this user".to_string())
        })?;
        Ok(Self::open(dirs.config_dir().join(PREFERENCES_FILE)))
    }

    /// Open the store at `path`
    ///
    /// A missing file yields an empty store. An unreadable or corrupt file is
    /// logged and also yields an empty store; it is replaced on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = read_values(&path);
        Self { path, values }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Set a value and persist the store
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        self.values.insert(key.into(), value.into());
        self.save()
    }

    pub fn theme(&self) -> &str {
        self.get(THEME_KEY).unwrap_or(DEFAULT_THEME)
    }

    pub fn set_theme(&mut self, theme: &str) -> Result<()> {
        self.set(THEME_KEY, theme)
    }

    /// Write the store to disk
    ///
    /// Writes to a temp file next to the target, then renames over it.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| IntakeError::preferences_error(&self.path, e))?;
            }
        }

        let temp_path = self.path.with_extension("json.tmp");
        let file =
            File::create(&temp_path).map_err(|e| IntakeError::preferences_error(&self.path, e))?;

        let output = PreferencesJson {
            values: self.values.clone(),
        };

        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &output).map_err(|e| {
            let _ = std::fs::remove_file(&temp_path);
            IntakeError::Preferences {
                path: self.path.clone(),
                reason: e.to_string(),
            }
        })?;

        // A failed flush must not be renamed over the previous file
        writer
            .into_inner()
            .map_err(|e| e.into_error())
            .and_then(|file| file.sync_all())
            .map_err(|e| {
                let _ = std::fs::remove_file(&temp_path);
                IntakeError::preferences_error(&self.path, e)
            })?;

        std::fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&temp_path);
            IntakeError::preferences_error(&self.path, e)
        })?;

        debug!("Saved {} preferences to {}", self.values.len(), self.path.display());
        Ok(())
    }
}

fn read_values(path: &Path) -> BTreeMap<String, String> {
    if !path.exists() {
        debug!("No preferences file at {}", path.display());
        return BTreeMap::new();
    }

    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Could not open preferences {}: {}", path.display(), e);
            return BTreeMap::new();
        }
    };

    match serde_json::from_reader::<_, PreferencesJson>(BufReader::new(file)) {
        Ok(json) => json.values,
        Err(e) => {
            warn!("Ignoring corrupt preferences {}: {}", path.display(), e);
            BTreeMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_default_theme() {
        let dir = TempDir::new().unwrap();
        let store = PreferenceStore::open(dir.path().join("prefs.json"));
        assert_eq!(store.theme(), DEFAULT_THEME);
    }

    #[test]
    fn test_theme_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("prefs.json");

        let mut store = PreferenceStore::open(&path);
        store.set_theme("light").unwrap();
        store.set("last_dir", "/music").unwrap();

        let reopened = PreferenceStore::open(&path);
        assert_eq!(reopened.theme(), "light");
        assert_eq!(reopened.get("last_dir"), Some("/music"));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "{ not json").unwrap();

        let mut store = PreferenceStore::open(&path);
        assert_eq!(store.theme(), DEFAULT_THEME);
        store.set_theme("dark-cyan").unwrap();
        assert_eq!(PreferenceStore::open(&path).theme(), "dark-cyan");
    }

    #[test]
    fn test_saved_file_is_complete_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.json");
        let mut store = PreferenceStore::open(&path);
        let long = "x".repeat(64 * 1024);
        store.set("notes", long.as_str()).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: PreferencesJson = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.values.get("notes"), Some(&long));
    }

    #[test]
    fn test_unwritable_location_is_preferences_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();

        let store = PreferenceStore::open(blocker.join("prefs.json"));
        assert!(matches!(store.save(), Err(IntakeError::Preferences { .. })));
    }
}
