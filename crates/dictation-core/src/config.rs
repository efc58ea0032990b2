//! Configuration for the dictation core.
//!
//! Every section has defaults, so an empty TOML document is a valid config.
//!
//! ```toml
//! [speech]
//! rate = 0.9
//! interruption_codes = ["canceled", "interrupted"]
//!
//! [lookup]
//! timeout_ms = 3000
//! ```

use crate::error::{DictationError, DictationResult};
use crate::speech_engine::{validate_pitch, validate_rate, DEFAULT_INTERRUPTION_CODES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DictationConfig {
    /// Speech defaults
    pub speech: SpeechConfig,
    /// Dictionary and translation services
    pub lookup: LookupConfig,
    /// Preference storage
    pub storage: StorageConfig,
    /// Vocabulary list
    pub list: ListConfig,
}

impl DictationConfig {
    /// Parse a TOML document
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or a value is out of range
    pub fn from_toml_str(source: &str) -> DictationResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML config file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid config
    pub fn load(path: &Path) -> DictationResult<Self> {
        info!("Loading config from {}", path.display());
        let source = std::fs::read_to_string(path).map_err(|e| {
            DictationError::configuration(format!("Cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    /// Validate every section
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value
    pub fn validate(&self) -> DictationResult<()> {
        validate_rate(self.speech.rate)?;
        validate_pitch(self.speech.pitch)?;

        if self.lookup.timeout_ms == 0 {
            return Err(DictationError::configuration(
                "Lookup timeout must be greater than 0",
            ));
        }

        if self.list.min_lines == 0 {
            return Err(DictationError::configuration(
                "List must show at least one line",
            ));
        }

        Ok(())
    }
}

/// Speech defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Default rate (0.1 to 10.0)
    pub rate: f32,
    /// Default pitch (0.0 to 2.0)
    pub pitch: f32,
    /// Default voice identifier
    pub voice_id: Option<String>,
    /// Engine error codes treated as benign interruptions
    pub interruption_codes: Vec<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            rate: crate::DEFAULT_RATE,
            pitch: crate::DEFAULT_PITCH,
            voice_id: None,
            interruption_codes: DEFAULT_INTERRUPTION_CODES
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Dictionary and translation service endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Base URL of the English dictionary; the word is appended as a path segment
    pub dictionary_url: String,
    /// Translation endpoint
    pub translate_url: String,
    /// Fallback dictionary page; the word is appended as a path segment
    pub fallback_dictionary_url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl LookupConfig {
    /// Per-request timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            dictionary_url: "https://api.dictionaryapi.dev/api/v2/entries/en".to_string(),
            translate_url: "https://translate.googleapis.com/translate_a/single".to_string(),
            fallback_dictionary_url: "https://www.merriam-webster.com/dictionary".to_string(),
            timeout_ms: crate::DEFAULT_LOOKUP_TIMEOUT_MS,
        }
    }
}

/// Preference storage location
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Preference file; the platform data directory is used when unset
    pub path: Option<PathBuf>,
}

/// Vocabulary list layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListConfig {
    /// Lines always shown, even when empty
    pub min_lines: usize,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            min_lines: crate::MIN_LINES,
        }
    }
}
