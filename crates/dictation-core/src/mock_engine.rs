//! In-memory speech engine for testing and hosts without speech support.
//!
//! The mock records every submission and cancellation. Completion and failure
//! happen only when the host asks for them, except in auto-complete mode. With
//! an event channel attached, a cancel also reports a late `interrupted` error
//! for the utterance it stopped, like browser engines do.

use crate::error::{DictationError, DictationResult};
use crate::speech_engine::{EngineEvent, SpeechEngine, SpeechErrorKind, UtteranceId, UtteranceRequest};
use crate::voice_manager::Voice;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

/// Mock speech engine
#[derive(Debug, Default)]
pub struct MockSpeechEngine {
    voices: Vec<Voice>,
    submitted: Vec<UtteranceRequest>,
    current: Option<UtteranceId>,
    cancel_count: usize,
    reject_next: Option<String>,
    auto_complete: bool,
    events: Option<UnboundedSender<EngineEvent>>,
}

impl MockSpeechEngine {
    /// Create a mock engine with a small English and Cantonese voice set
    #[must_use]
    pub fn new() -> Self {
        info!("Creating mock speech engine");
        Self {
            voices: vec![
                Voice::new("mock-en-us", "Samantha", "en-US").with_default(true),
                Voice::new("mock-zh-hk", "Sin-ji", "zh-HK"),
            ],
            ..Self::default()
        }
    }

    /// Replace the reported voices
    #[must_use]
    pub fn with_voices(mut self, voices: Vec<Voice>) -> Self {
        self.voices = voices;
        self
    }

    /// Send events for cancels and auto-completions to this channel
    #[must_use]
    pub fn with_event_sender(mut self, events: UnboundedSender<EngineEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Report completion for every utterance as soon as it is submitted
    #[must_use]
    pub fn with_auto_complete(mut self) -> Self {
        self.auto_complete = true;
        self
    }

    /// Refuse the next submission with the given message
    pub fn reject_next(&mut self, message: impl Into<String>) {
        self.reject_next = Some(message.into());
    }

    /// Finish the current utterance normally
    pub fn complete_current(&mut self) -> Option<EngineEvent> {
        let event = EngineEvent::Completed(self.current.take()?);
        self.emit(event.clone());
        Some(event)
    }

    /// Stop the current utterance with an error
    pub fn fail_current(&mut self, kind: SpeechErrorKind) -> Option<EngineEvent> {
        let event = EngineEvent::Failed(self.current.take()?, kind);
        self.emit(event.clone());
        Some(event)
    }

    /// Every request accepted so far, oldest first
    #[must_use]
    pub fn submitted(&self) -> &[UtteranceRequest] {
        &self.submitted
    }

    /// Texts of every accepted request, oldest first
    #[must_use]
    pub fn submitted_texts(&self) -> Vec<&str> {
        self.submitted.iter().map(UtteranceRequest::text).collect()
    }

    /// Most recently accepted request
    #[must_use]
    pub fn last_submitted(&self) -> Option<&UtteranceRequest> {
        self.submitted.last()
    }

    /// Number of accepted requests
    #[must_use]
    pub fn submission_count(&self) -> usize {
        self.submitted.len()
    }

    /// Number of `cancel` calls
    #[must_use]
    pub const fn cancel_count(&self) -> usize {
        self.cancel_count
    }

    /// Utterance currently speaking
    #[must_use]
    pub const fn current(&self) -> Option<UtteranceId> {
        self.current
    }

    fn emit(&self, event: EngineEvent) {
        if let Some(events) = &self.events {
            // Receiver gone means nobody is listening any more
            let _ = events.send(event);
        }
    }
}

impl SpeechEngine for MockSpeechEngine {
    fn speak(&mut self, request: &UtteranceRequest) -> DictationResult<()> {
        if let Some(message) = self.reject_next.take() {
            return Err(DictationError::speech(message));
        }

        debug!("Mock engine speaking '{}' at rate {}", request.text(), request.rate());
        self.submitted.push(request.clone());
        self.current = Some(request.id());

        if self.auto_complete {
            self.complete_current();
        }
        Ok(())
    }

    fn cancel(&mut self) {
        self.cancel_count += 1;
        if let Some(id) = self.current.take() {
            self.emit(EngineEvent::Failed(id, SpeechErrorKind::Interrupted));
        }
    }

    fn is_speaking(&self) -> bool {
        self.current.is_some()
    }

    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }
}
