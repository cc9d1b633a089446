//! Persisted preferences.
//!
//! Only three integers survive restarts: the selected preset, the signed
//! selection range anchored at it, and the build counter. Values are read
//! once at startup and written back through the backend on every mutation.
//!
//! Stored as TOML:
//! - Linux: `~/.config/gamebuilder/preferences.toml`
//! - Windows: `%APPDATA%/gamebuilder/preferences.toml`

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::error::PresetsError;

/// Raw persisted values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PreferenceValues {
    #[serde(default)]
    pub selected_index: i64,
    #[serde(default)]
    pub selection_range: i64,
    #[serde(default)]
    pub build_counter: u64,
}

/// Storage behind [`Preferences`].
pub trait PreferencesBackend: Send + Sync {
    fn load(&self) -> Result<PreferenceValues, PresetsError>;
    fn save(&self, values: &PreferenceValues) -> Result<(), PresetsError>;
}

/// Process-wide preferences shared by the store and the sequencer.
pub struct Preferences {
    values: Mutex<PreferenceValues>,
    backend: Box<dyn PreferencesBackend>,
}

impl Preferences {
    /// Reads the initial values from `backend`.
    pub fn load(backend: Box<dyn PreferencesBackend>) -> Result<Self, PresetsError> {
        let values = backend.load()?;
        tracing::debug!(
            selected = values.selected_index,
            range = values.selection_range,
            counter = values.build_counter,
            "preferences loaded"
        );
        Ok(Self {
            values: Mutex::new(values),
            backend,
        })
    }

    /// Preferences that live only in memory.
    pub fn in_memory() -> Self {
        Self {
            values: Mutex::new(PreferenceValues::default()),
            backend: Box::new(MemoryPreferences::default()),
        }
    }

    pub fn values(&self) -> PreferenceValues {
        *self.lock()
    }

    pub fn selected_index(&self) -> i64 {
        self.lock().selected_index
    }

    pub fn selection_range(&self) -> i64 {
        self.lock().selection_range
    }

    pub fn build_counter(&self) -> u64 {
        self.lock().build_counter
    }

    pub fn set_selected_index(&self, index: i64) {
        self.update(|v| v.selected_index = index);
    }

    pub fn set_selection_range(&self, range: i64) {
        self.update(|v| v.selection_range = range);
    }

    /// Sets index and range with a single write.
    pub fn set_selection(&self, index: i64, range: i64) {
        self.update(|v| {
            v.selected_index = index;
            v.selection_range = range;
        });
    }

    /// Increments the build counter and returns the new value.
    pub fn increment_build_counter(&self) -> u64 {
        let mut next = 0;
        self.update(|v| {
            v.build_counter = v.build_counter.saturating_add(1);
            next = v.build_counter;
        });
        next
    }

    fn lock(&self) -> MutexGuard<'_, PreferenceValues> {
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn update(&self, f: impl FnOnce(&mut PreferenceValues)) {
        let snapshot = {
            let mut values = self.lock();
            let before = *values;
            f(&mut values);
            if *values == before {
                return;
            }
            *values
        };
        if let Err(e) = self.backend.save(&snapshot) {
            tracing::warn!(error = %e, "failed to persist preferences");
        }
    }
}

/// TOML file backend.
#[derive(Debug, Clone)]
pub struct TomlPreferencesFile {
    path: PathBuf,
}

impl TomlPreferencesFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backend at the platform default location.
    pub fn default_location() -> Self {
        Self::new(default_preferences_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferencesBackend for TomlPreferencesFile {
    fn load(&self) -> Result<PreferenceValues, PresetsError> {
        if !self.path.exists() {
            return Ok(PreferenceValues::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(toml::from_str(&content)?)
    }

    fn save(&self, values: &PreferenceValues) -> Result<(), PresetsError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(values)?;
        std::fs::write(&self.path, content)?;
        tracing::trace!(path = %self.path.display(), "preferences saved");
        Ok(())
    }
}

/// In-memory backend. Clones share the same saved values.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferences {
    saved: Arc<Mutex<PreferenceValues>>,
}

impl MemoryPreferences {
    pub fn with_values(values: PreferenceValues) -> Self {
        Self {
            saved: Arc::new(Mutex::new(values)),
        }
    }

    /// Last values written through this backend.
    pub fn saved(&self) -> PreferenceValues {
        *self.saved.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PreferencesBackend for MemoryPreferences {
    fn load(&self) -> Result<PreferenceValues, PresetsError> {
        Ok(self.saved())
    }

    fn save(&self, values: &PreferenceValues) -> Result<(), PresetsError> {
        *self.saved.lock().unwrap_or_else(|e| e.into_inner()) = *values;
        Ok(())
    }
}

fn default_preferences_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("gamebuilder")
            .join("preferences.toml")
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata)
            .join("gamebuilder")
            .join("preferences.toml")
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        PathBuf::from("/tmp/gamebuilder/preferences.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutations_are_written_through() {
        let backend = MemoryPreferences::default();
        let prefs = Preferences::load(Box::new(backend.clone())).unwrap();

        prefs.set_selection(3, -2);
        assert_eq!(backend.saved().selected_index, 3);
        assert_eq!(backend.saved().selection_range, -2);

        assert_eq!(prefs.increment_build_counter(), 1);
        assert_eq!(prefs.increment_build_counter(), 2);
        assert_eq!(backend.saved().build_counter, 2);
    }

    #[test]
    fn loads_initial_values() {
        let backend = MemoryPreferences::with_values(PreferenceValues {
            selected_index: 4,
            selection_range: 1,
            build_counter: 99,
        });
        let prefs = Preferences::load(Box::new(backend)).unwrap();
        assert_eq!(prefs.selected_index(), 4);
        assert_eq!(prefs.selection_range(), 1);
        assert_eq!(prefs.build_counter(), 99);
    }

    #[test]
    fn toml_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.toml");
        let file = TomlPreferencesFile::new(&path);

        assert_eq!(file.load().unwrap(), PreferenceValues::default());

        let prefs = Preferences::load(Box::new(file.clone())).unwrap();
        prefs.set_selected_index(2);
        prefs.increment_build_counter();

        let reloaded = Preferences::load(Box::new(file)).unwrap();
        assert_eq!(reloaded.selected_index(), 2);
        assert_eq!(reloaded.build_counter(), 1);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.toml");
        std::fs::write(&path, "selected_index = \"nope\"").unwrap();
        assert!(TomlPreferencesFile::new(path).load().is_err());
    }
}
