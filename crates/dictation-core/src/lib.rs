//! # Dictation Core
//!
//! Engine for a vocabulary dictation trainer: enter words, phrases or
//! sentences, hear them read aloud while the text is masked, then reveal the
//! answers and check yourself.
//!
//! ## Features
//!
//! - Single-slot utterance sequencing with read-all playback
//! - Live rate and pitch changes that restart the current item
//! - Benign interruption filtering for racy engine cancellations
//! - Persistent list and preferences over any key-value store
//! - Dictionary and translation lookups with built-in fallbacks
//! - Plain-text list export
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use dictation_core::{MockSpeechEngine, StatusLog, UtteranceSequencer};
//!
//! let status = Arc::new(StatusLog::new());
//! let mut sequencer = UtteranceSequencer::new(MockSpeechEngine::new(), status);
//!
//! sequencer.speak_sequence(["apple", "banana"])?;
//! while let Some(event) = sequencer.engine_mut().complete_current() {
//!     sequencer.handle_event(event);
//! }
//!
//! assert_eq!(sequencer.engine().submitted_texts(), vec!["apple", "banana"]);
//! # Ok::<(), dictation_core::DictationError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod lookup;
pub mod mock_engine;
pub mod sequencer;
pub mod session;
pub mod speech_engine;
pub mod status;
pub mod store;
pub mod vocabulary;
pub mod voice_manager;

// Re-export main types for convenience
pub use config::{DictationConfig, ListConfig, LookupConfig, SpeechConfig, StorageConfig};
pub use error::{DictationError, DictationResult};
pub use lookup::{is_chinese, LookupClient, Meaning};
pub use mock_engine::MockSpeechEngine;
pub use sequencer::{SequencerSettings, UtteranceSequencer};
pub use session::{ActionSet, DictationSession, Phase};
pub use speech_engine::{
    Continuation, EngineEvent, ErrorClass, InterruptionPolicy, SpeechEngine, SpeechErrorKind,
    UtteranceId, UtteranceRequest,
};
pub use status::{StatusEvent, StatusLog, StatusReporter};
pub use store::{FileStore, KeyValueStore, MemoryStore, Preferences, StoredPreferences};
pub use vocabulary::{Line, VocabularyList};
pub use voice_manager::{Voice, VoiceManager};

/// Version information for the dictation-core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default speech rate
pub const DEFAULT_RATE: f32 = 1.0;

/// Default speech pitch
pub const DEFAULT_PITCH: f32 = 1.0;

/// Lines shown in the list even when empty
pub const MIN_LINES: usize = 6;

/// Default timeout for dictionary and translation requests
pub const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 5_000;
