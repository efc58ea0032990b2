//! Voice discovery and selection for dictation playback.
//!
//! Speech engines report every installed voice. Dictation only offers the
//! English and Cantonese ones, and prefers Cantonese when it is present.

use crate::error::{DictationError, DictationResult};
use serde::{Deserialize, Serialize};

/// Language prefixes a dictation voice may use
pub const SUPPORTED_LANGUAGE_PREFIXES: [&str; 2] = ["en-", "zh-HK"];

/// Language prefix of the preferred voice
pub const PREFERRED_LANGUAGE_PREFIX: &str = "zh-HK";

/// A voice reported by the speech engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    /// Engine-specific identifier (voice URI)
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// BCP 47 language tag (e.g., "en-US", "zh-HK")
    pub language: String,
    /// Whether the engine marks this voice as its default
    pub is_default: bool,
}

impl Voice {
    /// Create a new voice description
    #[must_use]
    pub fn new<I, N, L>(id: I, name: N, language: L) -> Self
    where
        I: Into<String>,
        N: Into<String>,
        L: Into<String>,
    {
        Self {
            id: id.into(),
            name: name.into(),
            language: language.into(),
            is_default: false,
        }
    }

    /// Mark the voice as the engine default
    #[must_use]
    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }

    /// Check if the voice language starts with the given prefix
    #[must_use]
    pub fn has_language_prefix(&self, prefix: &str) -> bool {
        self.language.starts_with(prefix)
    }

    /// Check if dictation can use this voice
    #[must_use]
    pub fn is_supported(&self) -> bool {
        SUPPORTED_LANGUAGE_PREFIXES
            .iter()
            .any(|prefix| self.has_language_prefix(prefix))
    }

    /// Label shown in voice pickers, e.g. "Sin-ji (zh-HK)"
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.language)
    }
}

/// Supported voices in engine order, with a preferred selection
#[derive(Debug, Clone)]
pub struct VoiceManager {
    voices: Vec<Voice>,
    preferred: usize,
}

impl VoiceManager {
    /// Build a manager from everything the engine reports
    ///
    /// # Errors
    ///
    /// Returns a speech error if none of the voices is English or Cantonese
    pub fn from_voices(voices: Vec<Voice>) -> DictationResult<Self> {
        let voices: Vec<Voice> = voices.into_iter().filter(Voice::is_supported).collect();

        if voices.is_empty() {
            return Err(DictationError::speech("No English or Cantonese voices found"));
        }

        let preferred = voices
            .iter()
            .position(|voice| voice.has_language_prefix(PREFERRED_LANGUAGE_PREFIX))
            .unwrap_or(0);

        Ok(Self { voices, preferred })
    }

    /// All supported voices
    #[must_use]
    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// The voice selected when nothing else was chosen
    #[must_use]
    pub fn preferred_voice(&self) -> &Voice {
        &self.voices[self.preferred]
    }

    /// Get a voice by its identifier
    ///
    /// # Errors
    ///
    /// Returns `VoiceNotFound` if no supported voice has this id
    pub fn get_voice(&self, voice_id: &str) -> DictationResult<&Voice> {
        self.voices
            .iter()
            .find(|voice| voice.id == voice_id)
            .ok_or_else(|| DictationError::voice_not_found(voice_id))
    }

    /// Get a voice by its display name
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Voice> {
        self.voices.iter().find(|voice| voice.name == name)
    }

    /// Voices whose language starts with the given prefix
    #[must_use]
    pub fn voices_by_language(&self, prefix: &str) -> Vec<&Voice> {
        self.voices
            .iter()
            .filter(|voice| voice.has_language_prefix(prefix))
            .collect()
    }

    /// Number of supported voices
    #[must_use]
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_voices() -> Vec<Voice> {
        vec![
            Voice::new("com.apple.fr", "Amelie", "fr-CA"),
            Voice::new("com.apple.samantha", "Samantha", "en-US").with_default(true),
            Voice::new("com.apple.daniel", "Daniel", "en-GB"),
            Voice::new("com.apple.sinji", "Sin-ji", "zh-HK"),
            Voice::new("com.apple.tingting", "Tingting", "zh-CN"),
        ]
    }

    #[test]
    fn test_unsupported_languages_are_filtered() {
        let manager = VoiceManager::from_voices(engine_voices()).unwrap();
        assert_eq!(manager.voice_count(), 3);
        assert!(manager.voices().iter().all(Voice::is_supported));
        assert!(manager.find_by_name("Tingting").is_none());
    }

    #[test]
    fn test_cantonese_voice_is_preferred() {
        let manager = VoiceManager::from_voices(engine_voices()).unwrap();
        assert_eq!(manager.preferred_voice().name, "Sin-ji");
    }

    #[test]
    fn test_first_voice_preferred_without_cantonese() {
        let voices = vec![
            Voice::new("a", "Daniel", "en-GB"),
            Voice::new("b", "Samantha", "en-US"),
        ];
        let manager = VoiceManager::from_voices(voices).unwrap();
        assert_eq!(manager.preferred_voice().id, "a");
    }

    #[test]
    fn test_no_supported_voices() {
        let voices = vec![Voice::new("fr", "Amelie", "fr-CA")];
        let err = VoiceManager::from_voices(voices).unwrap_err();
        assert!(matches!(err, DictationError::SpeechError { .. }));
        assert_eq!(
            err.to_string(),
            "Speech error: No English or Cantonese voices found"
        );
    }

    #[test]
    fn test_lookup_and_filtering() {
        let manager = VoiceManager::from_voices(engine_voices()).unwrap();
        assert_eq!(manager.get_voice("com.apple.daniel").unwrap().name, "Daniel");
        assert!(manager.get_voice("com.apple.fr").is_err());
        assert_eq!(manager.voices_by_language("en-").len(), 2);
    }

    #[test]
    fn test_voice_label() {
        let voice = Voice::new("x", "Sin-ji", "zh-HK");
        assert_eq!(voice.label(), "Sin-ji (zh-HK)");
    }
}
