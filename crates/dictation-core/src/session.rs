//! Dictation session: entry, masked dictation, and review.
//!
//! The session owns the vocabulary list, the utterance sequencer and the
//! preference store. Every list or preference edit is written through to the
//! store immediately.

use crate::config::DictationConfig;
use crate::error::{DictationError, DictationResult};
use crate::sequencer::{SequencerSettings, UtteranceSequencer};
use crate::speech_engine::{Continuation, EngineEvent, SpeechEngine, UtteranceId};
use crate::status::{StatusEvent, StatusReporter};
use crate::store::{KeyValueStore, Preferences};
use crate::vocabulary::VocabularyList;
use crate::voice_manager::VoiceManager;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where the user is in a dictation round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Typing the list
    Entry,
    /// Items are masked and read aloud
    Dictation,
    /// Answers are revealed
    Review,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entry => write!(f, "Entry"),
            Self::Dictation => write!(f, "Dictation"),
            Self::Review => write!(f, "Review"),
        }
    }
}

/// Actions available in a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ActionSet {
    /// Mask the list and begin dictation
    pub start_dictation: bool,
    /// Append an input line
    pub add_line: bool,
    /// Shuffle the visible lines
    pub shuffle: bool,
    /// Read every entered item
    pub read_all: bool,
    /// Reveal the masked lines
    pub show_answers: bool,
    /// Export the list as text
    pub export: bool,
    /// Clear the list
    pub reset: bool,
}

impl ActionSet {
    /// Actions enabled in the given phase
    #[must_use]
    pub const fn for_phase(phase: Phase) -> Self {
        match phase {
            Phase::Entry => Self {
                start_dictation: true,
                add_line: true,
                shuffle: false,
                read_all: false,
                show_answers: false,
                export: false,
                reset: false,
            },
            Phase::Dictation => Self {
                start_dictation: false,
                add_line: false,
                shuffle: true,
                read_all: true,
                show_answers: true,
                export: true,
                reset: true,
            },
            Phase::Review => Self {
                start_dictation: true,
                add_line: true,
                shuffle: false,
                read_all: false,
                show_answers: false,
                export: true,
                reset: true,
            },
        }
    }
}

/// One user's dictation trainer state
pub struct DictationSession<E: SpeechEngine, S: KeyValueStore> {
    list: VocabularyList,
    phase: Phase,
    theme: String,
    voices: Option<VoiceManager>,
    sequencer: UtteranceSequencer<E>,
    preferences: Preferences<S>,
    status: Arc<dyn StatusReporter>,
}

impl<E: SpeechEngine, S: KeyValueStore> DictationSession<E, S> {
    /// Restore a session from the store
    ///
    /// Stored rate and pitch override the configured defaults. The configured
    /// voice wins over the preferred engine voice.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the store cannot be read
    pub fn open(
        engine: E,
        store: S,
        status: Arc<dyn StatusReporter>,
        config: &DictationConfig,
    ) -> DictationResult<Self> {
        config.validate()?;

        let preferences = Preferences::new(store);
        let stored = preferences.load()?;

        let voices = match VoiceManager::from_voices(engine.voices()) {
            Ok(manager) => Some(manager),
            Err(err) => {
                warn!("{err}");
                status.report(StatusEvent::NoSupportedVoices);
                None
            }
        };

        let mut settings = SequencerSettings::from(&config.speech);
        settings.rate = stored.rate;
        settings.pitch = stored.pitch;
        if settings.voice_id.is_none() {
            settings.voice_id = voices
                .as_ref()
                .map(|manager| manager.preferred_voice().id.clone());
        }

        info!(
            "Opened dictation session: {} saved lines, theme '{}', rate {}, pitch {}",
            stored.list.len(),
            stored.theme,
            stored.rate,
            stored.pitch
        );

        Ok(Self {
            list: VocabularyList::from_saved(stored.list, config.list.min_lines),
            phase: Phase::Entry,
            theme: stored.theme,
            voices,
            sequencer: UtteranceSequencer::with_settings(engine, Arc::clone(&status), settings),
            preferences,
            status,
        })
    }

    /// Current phase
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Actions enabled right now
    #[must_use]
    pub const fn actions(&self) -> ActionSet {
        ActionSet::for_phase(self.phase)
    }

    /// The vocabulary list
    #[must_use]
    pub const fn list(&self) -> &VocabularyList {
        &self.list
    }

    /// Supported voices, if the engine has any
    #[must_use]
    pub const fn voices(&self) -> Option<&VoiceManager> {
        self.voices.as_ref()
    }

    /// Selected theme
    #[must_use]
    pub fn theme(&self) -> &str {
        &self.theme
    }

    /// The utterance sequencer
    #[must_use]
    pub const fn sequencer(&self) -> &UtteranceSequencer<E> {
        &self.sequencer
    }

    /// The utterance sequencer, mutably
    pub fn sequencer_mut(&mut self) -> &mut UtteranceSequencer<E> {
        &mut self.sequencer
    }

    /// Forward an engine signal to the sequencer
    pub fn handle_event(&mut self, event: EngineEvent) {
        self.sequencer.handle_event(event);
    }

    /// Edit one line
    ///
    /// # Errors
    ///
    /// Returns an error if the line does not exist, is masked or hidden, or
    /// the store cannot be written
    pub fn set_item(&mut self, index: usize, text: &str) -> DictationResult<()> {
        self.list.set_item(index, text)?;
        self.save_list()
    }

    /// Append an empty line
    ///
    /// # Errors
    ///
    /// Returns an error if adding lines is disabled or the store cannot be written
    pub fn add_line(&mut self) -> DictationResult<usize> {
        self.ensure(self.actions().add_line, "Adding lines")?;
        let index = self.list.add_line();
        self.save_list()?;
        Ok(index)
    }

    /// Mask entered lines and begin dictation
    ///
    /// # Errors
    ///
    /// Returns `NothingEntered` if the list is blank
    pub fn start_dictation(&mut self) -> DictationResult<usize> {
        self.ensure(self.actions().start_dictation, "Starting dictation")?;
        let entered = self.list.mask_entered()?;
        self.phase = Phase::Dictation;
        info!("Dictation started with {} items", entered);
        Ok(entered)
    }

    /// Shuffle the visible lines
    ///
    /// # Errors
    ///
    /// Returns an error if shuffling is disabled or the store cannot be written
    pub fn shuffle(&mut self) -> DictationResult<()> {
        self.ensure(self.actions().shuffle, "Shuffling")?;
        self.list.shuffle();
        self.status.report(StatusEvent::Shuffled);
        self.save_list()
    }

    /// Read every entered item in order
    ///
    /// Returns the number of items scheduled; 0 means nothing to read.
    ///
    /// # Errors
    ///
    /// Returns an error if reading is disabled or the engine refuses the first item
    pub fn read_all(&mut self) -> DictationResult<usize> {
        self.ensure(self.actions().read_all, "Reading all items")?;
        self.sequencer.speak_sequence(self.list.entered_items())
    }

    /// Speak one line; blank lines are skipped
    ///
    /// # Errors
    ///
    /// Returns an error if the line does not exist or the engine refuses it
    pub fn pronounce(&mut self, index: usize) -> DictationResult<Option<UtteranceId>> {
        let Some(text) = self.list.item(index)?.map(str::to_string) else {
            debug!("Line {index} is blank; nothing to pronounce");
            return Ok(None);
        };
        self.sequencer
            .speak_with_defaults(&text, Continuation::None)
            .map(Some)
    }

    /// Reveal the masked lines
    ///
    /// # Errors
    ///
    /// Returns an error outside dictation
    pub fn show_answers(&mut self) -> DictationResult<()> {
        self.ensure(self.actions().show_answers, "Showing answers")?;
        self.list.reveal();
        self.phase = Phase::Review;
        Ok(())
    }

    /// The list as plain text, one item per line
    ///
    /// # Errors
    ///
    /// Returns `NothingToExport` if the list is blank
    pub fn export_text(&self) -> DictationResult<String> {
        self.ensure(self.actions().export, "Exporting")?;
        self.list.export_text()
    }

    /// Clear the list and go back to entry
    ///
    /// # Errors
    ///
    /// Returns an error if reset is disabled or the store cannot be written
    pub fn reset(&mut self) -> DictationResult<()> {
        self.ensure(self.actions().reset, "Resetting")?;
        self.list.reset();
        self.phase = Phase::Entry;
        self.preferences.clear_list()
    }

    /// Change and save the rate, restarting any active utterance
    ///
    /// # Errors
    ///
    /// Returns an error if the rate is out of range or cannot be saved
    pub fn set_rate(&mut self, rate: f32) -> DictationResult<()> {
        self.preferences.save_rate(rate)?;
        let pitch = self.sequencer.settings().pitch;
        self.sequencer.retune(rate, pitch)?;
        Ok(())
    }

    /// Change and save the pitch, restarting any active utterance
    ///
    /// # Errors
    ///
    /// Returns an error if the pitch is out of range or cannot be saved
    pub fn set_pitch(&mut self, pitch: f32) -> DictationResult<()> {
        self.preferences.save_pitch(pitch)?;
        let rate = self.sequencer.settings().rate;
        self.sequencer.retune(rate, pitch)?;
        Ok(())
    }

    /// Change and save the theme
    ///
    /// # Errors
    ///
    /// Returns an error if the theme is blank or cannot be saved
    pub fn set_theme(&mut self, theme: &str) -> DictationResult<()> {
        if theme.trim().is_empty() {
            return Err(DictationError::invalid_input("Theme cannot be empty"));
        }
        self.preferences.save_theme(theme)?;
        self.theme = theme.to_string();
        Ok(())
    }

    /// Select the voice for future speech
    ///
    /// # Errors
    ///
    /// Returns `VoiceNotFound` unless the id names a supported voice
    pub fn select_voice(&mut self, voice_id: &str) -> DictationResult<()> {
        let voice = self
            .voices
            .as_ref()
            .ok_or_else(|| DictationError::voice_not_found(voice_id))?
            .get_voice(voice_id)?;
        info!("Selected voice {}", voice.label());
        let id = voice.id.clone();
        self.sequencer.set_voice(Some(id));
        Ok(())
    }

    fn save_list(&self) -> DictationResult<()> {
        self.preferences.save_list(&self.list.texts())
    }

    fn ensure(&self, allowed: bool, action: &str) -> DictationResult<()> {
        if allowed {
            Ok(())
        } else {
            Err(DictationError::invalid_input(format!(
                "{action} is not available during {}",
                self.phase
            )))
        }
    }
}
