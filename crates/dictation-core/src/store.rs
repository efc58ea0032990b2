//! Flat key-value persistence for the entered list and user preferences.
//!
//! Values are read once at startup and written through on every change.
//! There is no batching or versioning.

use crate::config::StorageConfig;
use crate::error::{DictationError, DictationResult};
use crate::speech_engine::{validate_pitch, validate_rate};
use directories::ProjectDirs;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Key holding the entered list as a JSON array of strings
pub const VOCAB_LIST_KEY: &str = "dictationAppVocabList";
/// Key holding the selected theme
pub const THEME_KEY: &str = "dictationAppTheme";
/// Key holding the speech rate
pub const RATE_KEY: &str = "dictationAppRate";
/// Key holding the speech pitch
pub const PITCH_KEY: &str = "dictationAppPitch";

/// Theme used when none was saved
pub const DEFAULT_THEME: &str = "default";

/// String-keyed string storage
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read
    fn get(&self, key: &str) -> DictationResult<Option<String>>;

    /// Write a value
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written
    fn set(&self, key: &str, value: &str) -> DictationResult<()>;

    /// Delete a value; deleting a missing key is not an error
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written
    fn remove(&self, key: &str) -> DictationResult<()>;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> DictationResult<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> DictationResult<()> {
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> DictationResult<()> {
        self.values.write().remove(key);
        Ok(())
    }
}

/// Store persisted as one JSON object on disk
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open a store file, starting empty if it does not exist yet
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed
    pub fn open(path: impl Into<PathBuf>) -> DictationResult<Self> {
        let path = path.into();
        let values = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            let values: BTreeMap<String, String> = serde_json::from_str(&contents)?;
            debug!("Loaded {} stored values from {}", values.len(), path.display());
            values
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    /// Open the store in the platform data directory
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be determined or the
    /// store file cannot be read
    pub fn open_default() -> DictationResult<Self> {
        let dirs = ProjectDirs::from("app", "Dictation", "dictation").ok_or_else(|| {
            DictationError::storage("Failed to determine project directories")
        })?;
        let path = dirs.data_dir().join("preferences.json");
        info!("Using preference store at {}", path.display());
        Self::open(path)
    }

    /// Open the configured store file, or the default one when unset
    ///
    /// # Errors
    ///
    /// Returns an error if the store file cannot be located or read
    pub fn from_config(config: &StorageConfig) -> DictationResult<Self> {
        match &config.path {
            Some(path) => Self::open(path.clone()),
            None => Self::open_default(),
        }
    }

    /// Location of the store file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &BTreeMap<String, String>) -> DictationResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(values)?)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> DictationResult<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> DictationResult<()> {
        let mut values = self.values.write();
        values.insert(key.to_string(), value.to_string());
        self.flush(&values)
    }

    fn remove(&self, key: &str) -> DictationResult<()> {
        let mut values = self.values.write();
        if values.remove(key).is_some() {
            self.flush(&values)?;
        }
        Ok(())
    }
}

/// Everything read from the store at startup
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPreferences {
    /// Entered list, possibly with blank lines
    pub list: Vec<String>,
    /// Selected theme
    pub theme: String,
    /// Speech rate
    pub rate: f32,
    /// Speech pitch
    pub pitch: f32,
}

impl Default for StoredPreferences {
    fn default() -> Self {
        Self {
            list: Vec::new(),
            theme: DEFAULT_THEME.to_string(),
            rate: crate::DEFAULT_RATE,
            pitch: crate::DEFAULT_PITCH,
        }
    }
}

/// Typed access to the dictation keys
#[derive(Debug)]
pub struct Preferences<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> Preferences<S> {
    /// Wrap a store
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Read every preference, falling back to defaults for bad values
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read
    pub fn load(&self) -> DictationResult<StoredPreferences> {
        Ok(StoredPreferences {
            list: self.load_list()?,
            theme: self.load_theme()?,
            rate: self.load_rate()?,
            pitch: self.load_pitch()?,
        })
    }

    /// Saved list, or empty if none or unreadable
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read
    pub fn load_list(&self) -> DictationResult<Vec<String>> {
        let Some(raw) = self.store.get(VOCAB_LIST_KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(list) => Ok(list),
            Err(e) => {
                warn!("Ignoring unreadable saved list: {e}");
                Ok(Vec::new())
            }
        }
    }

    /// Save the list, blank lines included
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written
    pub fn save_list<T: AsRef<str>>(&self, items: &[T]) -> DictationResult<()> {
        let items: Vec<&str> = items.iter().map(AsRef::as_ref).collect();
        self.store.set(VOCAB_LIST_KEY, &serde_json::to_string(&items)?)
    }

    /// Forget the saved list
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written
    pub fn clear_list(&self) -> DictationResult<()> {
        self.store.remove(VOCAB_LIST_KEY)
    }

    /// Saved theme, or the default theme
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read
    pub fn load_theme(&self) -> DictationResult<String> {
        Ok(self
            .store
            .get(THEME_KEY)?
            .filter(|theme| !theme.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_THEME.to_string()))
    }

    /// Save the theme
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written
    pub fn save_theme(&self, theme: &str) -> DictationResult<()> {
        self.store.set(THEME_KEY, theme)
    }

    /// Saved rate, or the default rate
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read
    pub fn load_rate(&self) -> DictationResult<f32> {
        self.load_number(RATE_KEY, crate::DEFAULT_RATE, validate_rate)
    }

    /// Save the rate
    ///
    /// # Errors
    ///
    /// Returns an error if the rate is out of range or the store cannot be written
    pub fn save_rate(&self, rate: f32) -> DictationResult<()> {
        validate_rate(rate)?;
        self.store.set(RATE_KEY, &rate.to_string())
    }

    /// Saved pitch, or the default pitch
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read
    pub fn load_pitch(&self) -> DictationResult<f32> {
        self.load_number(PITCH_KEY, crate::DEFAULT_PITCH, validate_pitch)
    }

    /// Save the pitch
    ///
    /// # Errors
    ///
    /// Returns an error if the pitch is out of range or the store cannot be written
    pub fn save_pitch(&self, pitch: f32) -> DictationResult<()> {
        validate_pitch(pitch)?;
        self.store.set(PITCH_KEY, &pitch.to_string())
    }

    /// Underlying store
    pub const fn store(&self) -> &S {
        &self.store
    }

    fn load_number(
        &self,
        key: &str,
        default: f32,
        validate: fn(f32) -> DictationResult<f32>,
    ) -> DictationResult<f32> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(default);
        };
        let value = raw
            .trim()
            .parse::<f32>()
            .ok()
            .filter(|value| validate(*value).is_ok());
        Ok(value.unwrap_or_else(|| {
            warn!("Ignoring stored {key}='{raw}', using {default}");
            default
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_file_store_writes_through() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("prefs.json");

        let store = FileStore::open(&path).unwrap();
        store.set(THEME_KEY, "dark").unwrap();
        assert!(path.exists());

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get(THEME_KEY).unwrap().as_deref(), Some("dark"));

        reopened.remove(THEME_KEY).unwrap();
        let again = FileStore::open(&path).unwrap();
        assert_eq!(again.get(THEME_KEY).unwrap(), None);
    }

    #[test]
    fn test_file_store_from_config() {
        let dir = TempDir::new().unwrap();
        let config = StorageConfig {
            path: Some(dir.path().join("custom.json")),
        };
        let store = FileStore::from_config(&config).unwrap();
        assert_eq!(store.path(), dir.path().join("custom.json"));
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            FileStore::open(&path),
            Err(DictationError::StorageError { .. })
        ));
    }

    #[test]
    fn test_preferences_defaults() {
        let prefs = Preferences::new(MemoryStore::new());
        assert_eq!(prefs.load().unwrap(), StoredPreferences::default());
    }

    #[test]
    fn test_preferences_roundtrip() {
        let prefs = Preferences::new(MemoryStore::new());
        prefs.save_list(&["apple", "", "香蕉"]).unwrap();
        prefs.save_theme("ocean").unwrap();
        prefs.save_rate(1.5).unwrap();
        prefs.save_pitch(0.5).unwrap();

        let loaded = prefs.load().unwrap();
        assert_eq!(loaded.list, vec!["apple", "", "香蕉"]);
        assert_eq!(loaded.theme, "ocean");
        assert_eq!(loaded.rate, 1.5);
        assert_eq!(loaded.pitch, 0.5);

        prefs.clear_list().unwrap();
        assert!(prefs.load_list().unwrap().is_empty());
    }

    #[test]
    fn test_preferences_fall_back_on_bad_values() {
        let store = MemoryStore::new();
        store.set(VOCAB_LIST_KEY, "{broken").unwrap();
        store.set(RATE_KEY, "fast").unwrap();
        store.set(PITCH_KEY, "7.5").unwrap();
        store.set(THEME_KEY, "").unwrap();

        let prefs = Preferences::new(store);
        assert_eq!(prefs.load().unwrap(), StoredPreferences::default());
    }

    #[test]
    fn test_save_rate_rejects_out_of_range() {
        let prefs = Preferences::new(MemoryStore::new());
        assert!(prefs.save_rate(0.0).is_err());
        assert_eq!(prefs.store().get(RATE_KEY).unwrap(), None);
    }

    #[test]
    fn test_store_errors_propagate() {
        let mut store = MockKeyValueStore::new();
        store
            .expect_get()
            .with(eq(VOCAB_LIST_KEY))
            .returning(|_| Err(DictationError::storage("quota exceeded")));

        let prefs = Preferences::new(store);
        assert!(matches!(
            prefs.load_list(),
            Err(DictationError::StorageError { .. })
        ));
    }

    #[test]
    fn test_save_list_writes_json() {
        let mut store = MockKeyValueStore::new();
        store
            .expect_set()
            .with(eq(VOCAB_LIST_KEY), eq(r#"["one","two"]"#))
            .times(1)
            .returning(|_, _| Ok(()));

        let prefs = Preferences::new(store);
        prefs.save_list(&["one", "two"]).unwrap();
    }
}
