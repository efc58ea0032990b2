//! Speech engine abstraction consumed by the utterance sequencer.
//!
//! A [`SpeechEngine`] synthesizes one [`UtteranceRequest`] at a time and later
//! reports an [`EngineEvent`] for it. Engines in browsers, on desktop
//! platforms and in tests all sit behind the same trait.

use crate::error::{DictationError, DictationResult};
use crate::voice_manager::Voice;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Identifier assigned to every submitted utterance
pub type UtteranceId = Uuid;

/// Minimum speech rate accepted by engines
pub const MIN_RATE: f32 = 0.1;
/// Maximum speech rate accepted by engines
pub const MAX_RATE: f32 = 10.0;
/// Minimum pitch accepted by engines
pub const MIN_PITCH: f32 = 0.0;
/// Maximum pitch accepted by engines
pub const MAX_PITCH: f32 = 2.0;

/// Default error codes treated as expected interruptions
pub const DEFAULT_INTERRUPTION_CODES: [&str; 2] = ["canceled", "interrupted"];

/// Validate a speech rate
///
/// # Errors
///
/// Returns an error if rate is not in the valid range (0.1 to 10.0)
pub fn validate_rate(rate: f32) -> DictationResult<f32> {
    if !(MIN_RATE..=MAX_RATE).contains(&rate) {
        return Err(DictationError::invalid_input(format!(
            "Rate must be between {MIN_RATE} and {MAX_RATE}, got {rate}"
        )));
    }
    Ok(rate)
}

/// Validate a speech pitch
///
/// # Errors
///
/// Returns an error if pitch is not in the valid range (0.0 to 2.0)
pub fn validate_pitch(pitch: f32) -> DictationResult<f32> {
    if !(MIN_PITCH..=MAX_PITCH).contains(&pitch) {
        return Err(DictationError::invalid_input(format!(
            "Pitch must be between {MIN_PITCH} and {MAX_PITCH}, got {pitch}"
        )));
    }
    Ok(pitch)
}

/// What happens after an utterance finishes normally
#[derive(Clone, Default)]
pub enum Continuation {
    /// Nothing runs
    #[default]
    None,
    /// Caller-supplied callback
    Callback(Arc<dyn Fn() + Send + Sync>),
    /// Speak the next queued item of a read-all sequence
    AdvanceQueue,
}

impl Continuation {
    /// Wrap a closure as a callback continuation
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::Callback(Arc::new(f))
    }

    /// Check whether two continuations are the same continuation
    ///
    /// Callbacks compare by pointer identity, not by behaviour.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) | (Self::AdvanceQueue, Self::AdvanceQueue) => true,
            (Self::Callback(a), Self::Callback(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Callback(cb) => write!(f, "Callback({:p})", Arc::as_ptr(cb)),
            Self::AdvanceQueue => write!(f, "AdvanceQueue"),
        }
    }
}

/// One request to synthesize text
///
/// Immutable once built. Changing parameters means building a new request.
#[derive(Debug, Clone)]
pub struct UtteranceRequest {
    id: UtteranceId,
    text: String,
    voice_id: Option<String>,
    rate: f32,
    pitch: f32,
    on_complete: Continuation,
}

impl UtteranceRequest {
    /// Build a request with a fresh identifier
    #[must_use]
    pub fn new(
        text: String,
        voice_id: Option<String>,
        rate: f32,
        pitch: f32,
        on_complete: Continuation,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            voice_id,
            rate,
            pitch,
            on_complete,
        }
    }

    /// Same text, voice and continuation with new prosody and a new identifier
    #[must_use]
    pub fn retuned(&self, rate: f32, pitch: f32) -> Self {
        Self::new(
            self.text.clone(),
            self.voice_id.clone(),
            rate,
            pitch,
            self.on_complete.clone(),
        )
    }

    /// Request identifier
    #[must_use]
    pub const fn id(&self) -> UtteranceId {
        self.id
    }

    /// Text to speak
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Selected voice, if any
    #[must_use]
    pub fn voice_id(&self) -> Option<&str> {
        self.voice_id.as_deref()
    }

    /// Speech rate
    #[must_use]
    pub const fn rate(&self) -> f32 {
        self.rate
    }

    /// Speech pitch
    #[must_use]
    pub const fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Continuation run on normal completion
    #[must_use]
    pub const fn on_complete(&self) -> &Continuation {
        &self.on_complete
    }
}

/// Error codes a speech engine may report for an utterance
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SpeechErrorKind {
    /// Utterance was removed from the queue before it started
    Canceled,
    /// Utterance was stopped while speaking
    Interrupted,
    /// Audio output was busy
    AudioBusy,
    /// Audio output device failed
    AudioHardware,
    /// Network voice could not be reached
    Network,
    /// No synthesis engine is available
    SynthesisUnavailable,
    /// Synthesis failed for another reason
    SynthesisFailed,
    /// No voice for the requested language
    LanguageUnavailable,
    /// Requested voice is not available
    VoiceUnavailable,
    /// Text exceeds the engine limit
    TextTooLong,
    /// Rate, pitch or volume was rejected
    InvalidArgument,
    /// Engine refused to speak
    NotAllowed,
    /// Any code the engine reported that is not listed above
    Other(String),
}

impl SpeechErrorKind {
    /// Parse an engine error code, ignoring case
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "canceled" => Self::Canceled,
            "interrupted" => Self::Interrupted,
            "audio-busy" => Self::AudioBusy,
            "audio-hardware" => Self::AudioHardware,
            "network" => Self::Network,
            "synthesis-unavailable" => Self::SynthesisUnavailable,
            "synthesis-failed" => Self::SynthesisFailed,
            "language-unavailable" => Self::LanguageUnavailable,
            "voice-unavailable" => Self::VoiceUnavailable,
            "text-too-long" => Self::TextTooLong,
            "invalid-argument" => Self::InvalidArgument,
            "not-allowed" => Self::NotAllowed,
            other => Self::Other(other.to_string()),
        }
    }

    /// Lowercase engine code
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Canceled => "canceled",
            Self::Interrupted => "interrupted",
            Self::AudioBusy => "audio-busy",
            Self::AudioHardware => "audio-hardware",
            Self::Network => "network",
            Self::SynthesisUnavailable => "synthesis-unavailable",
            Self::SynthesisFailed => "synthesis-failed",
            Self::LanguageUnavailable => "language-unavailable",
            Self::VoiceUnavailable => "voice-unavailable",
            Self::TextTooLong => "text-too-long",
            Self::InvalidArgument => "invalid-argument",
            Self::NotAllowed => "not-allowed",
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for SpeechErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// How the sequencer treats an engine error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Side effect of a superseding request, absorbed silently
    ExpectedInterruption,
    /// Anything else, surfaced on the status channel
    UnexpectedFailure,
}

/// Allow-list of error codes treated as expected interruptions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterruptionPolicy {
    codes: HashSet<String>,
}

impl InterruptionPolicy {
    /// Build a policy from engine codes; codes are lowercased
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            codes: codes
                .into_iter()
                .map(|code| code.as_ref().trim().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Classify an engine error
    #[must_use]
    pub fn classify(&self, kind: &SpeechErrorKind) -> ErrorClass {
        if self.codes.contains(&kind.code().to_ascii_lowercase()) {
            ErrorClass::ExpectedInterruption
        } else {
            ErrorClass::UnexpectedFailure
        }
    }

    /// Codes in the allow-list
    #[must_use]
    pub fn codes(&self) -> &HashSet<String> {
        &self.codes
    }
}

impl Default for InterruptionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_INTERRUPTION_CODES)
    }
}

/// Signals an engine reports about a submitted utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Utterance finished speaking
    Completed(UtteranceId),
    /// Utterance stopped with an error
    Failed(UtteranceId, SpeechErrorKind),
}

impl EngineEvent {
    /// Utterance the event refers to
    #[must_use]
    pub const fn utterance_id(&self) -> UtteranceId {
        match self {
            Self::Completed(id) | Self::Failed(id, _) => *id,
        }
    }
}

/// Platform speech synthesizer
///
/// Engines accept one utterance at a time. Completion and failure are
/// reported later as [`EngineEvent`]s carrying the request id.
pub trait SpeechEngine {
    /// Submit an utterance for synthesis
    ///
    /// # Errors
    ///
    /// Returns an error if the engine refuses the request outright
    fn speak(&mut self, request: &UtteranceRequest) -> DictationResult<()>;

    /// Stop the in-flight utterance; may report `interrupted` later
    fn cancel(&mut self);

    /// Whether the engine is currently producing audio
    fn is_speaking(&self) -> bool;

    /// Voices the engine offers
    fn voices(&self) -> Vec<Voice>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("canceled", ErrorClass::ExpectedInterruption)]
    #[case("interrupted", ErrorClass::ExpectedInterruption)]
    #[case("INTERRUPTED", ErrorClass::ExpectedInterruption)]
    #[case("Canceled", ErrorClass::ExpectedInterruption)]
    #[case("audio-busy", ErrorClass::UnexpectedFailure)]
    #[case("synthesis-failed", ErrorClass::UnexpectedFailure)]
    #[case("something-new", ErrorClass::UnexpectedFailure)]
    fn test_default_policy_classification(#[case] code: &str, #[case] expected: ErrorClass) {
        let policy = InterruptionPolicy::default();
        assert_eq!(policy.classify(&SpeechErrorKind::from_code(code)), expected);
    }

    #[test]
    fn test_custom_policy() {
        let policy = InterruptionPolicy::new(["Interrupted", "audio-busy"]);
        assert_eq!(
            policy.classify(&SpeechErrorKind::AudioBusy),
            ErrorClass::ExpectedInterruption
        );
        assert_eq!(
            policy.classify(&SpeechErrorKind::Canceled),
            ErrorClass::UnexpectedFailure
        );
    }

    #[test]
    fn test_error_kind_codes() {
        assert_eq!(SpeechErrorKind::from_code("Not-Allowed"), SpeechErrorKind::NotAllowed);
        assert_eq!(
            SpeechErrorKind::from_code("Weird"),
            SpeechErrorKind::Other("weird".to_string())
        );
        assert_eq!(SpeechErrorKind::TextTooLong.to_string(), "text-too-long");
    }

    #[rstest]
    #[case(0.1, true)]
    #[case(1.0, true)]
    #[case(10.0, true)]
    #[case(0.05, false)]
    #[case(10.5, false)]
    fn test_rate_range(#[case] rate: f32, #[case] valid: bool) {
        assert_eq!(validate_rate(rate).is_ok(), valid);
    }

    #[rstest]
    #[case(0.0, true)]
    #[case(2.0, true)]
    #[case(-0.1, false)]
    #[case(2.5, false)]
    fn test_pitch_range(#[case] pitch: f32, #[case] valid: bool) {
        assert_eq!(validate_pitch(pitch).is_ok(), valid);
    }

    #[test]
    fn test_retuned_request_keeps_continuation() {
        let original = UtteranceRequest::new(
            "hello".to_string(),
            Some("voice".to_string()),
            1.0,
            1.0,
            Continuation::callback(|| {}),
        );
        let retuned = original.retuned(1.5, 0.8);

        assert_ne!(retuned.id(), original.id());
        assert_eq!(retuned.text(), "hello");
        assert_eq!(retuned.voice_id(), Some("voice"));
        assert_eq!(retuned.rate(), 1.5);
        assert_eq!(retuned.pitch(), 0.8);
        assert!(retuned.on_complete().same_as(original.on_complete()));
    }

    #[test]
    fn test_distinct_callbacks_are_not_the_same() {
        let a = Continuation::callback(|| {});
        let b = Continuation::callback(|| {});
        assert!(!a.same_as(&b));
        assert!(a.same_as(&a.clone()));
        assert!(!a.same_as(&Continuation::None));
    }
}
