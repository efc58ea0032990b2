//! Single-slot utterance sequencer.
//!
//! All speech goes through one active-utterance slot. Starting a new request
//! always cancels the one in flight, so at most one utterance is active at
//! any time. Read-all playback is a queue of item texts: each completion
//! submits the next item, and any error ends the sequence.
//!
//! Engine signals arrive through [`UtteranceSequencer::handle_event`], either
//! called directly by the host or pumped from a channel by
//! [`UtteranceSequencer::drive`]. Nothing here blocks.

use crate::config::SpeechConfig;
use crate::error::{DictationError, DictationResult};
use crate::speech_engine::{
    validate_pitch, validate_rate, Continuation, EngineEvent, ErrorClass, InterruptionPolicy,
    SpeechEngine, SpeechErrorKind, UtteranceId, UtteranceRequest,
};
use crate::status::{StatusEvent, StatusReporter};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

/// Parameters applied to requests that do not specify their own
#[derive(Debug, Clone, PartialEq)]
pub struct SequencerSettings {
    /// Rate for read-all items and default speech
    pub rate: f32,
    /// Pitch for read-all items and default speech
    pub pitch: f32,
    /// Voice for read-all items and default speech
    pub voice_id: Option<String>,
    /// Which engine errors are benign interruptions
    pub interruption_policy: InterruptionPolicy,
}

impl Default for SequencerSettings {
    fn default() -> Self {
        Self {
            rate: crate::DEFAULT_RATE,
            pitch: crate::DEFAULT_PITCH,
            voice_id: None,
            interruption_policy: InterruptionPolicy::default(),
        }
    }
}

impl From<&SpeechConfig> for SequencerSettings {
    fn from(config: &SpeechConfig) -> Self {
        Self {
            rate: config.rate,
            pitch: config.pitch,
            voice_id: config.voice_id.clone(),
            interruption_policy: InterruptionPolicy::new(&config.interruption_codes),
        }
    }
}

/// Serializes speech through one active utterance
pub struct UtteranceSequencer<E: SpeechEngine> {
    engine: E,
    status: Arc<dyn StatusReporter>,
    settings: SequencerSettings,
    active: Option<UtteranceRequest>,
    pending: VecDeque<String>,
}

impl<E: SpeechEngine> UtteranceSequencer<E> {
    /// Create a sequencer with default settings
    pub fn new(engine: E, status: Arc<dyn StatusReporter>) -> Self {
        Self::with_settings(engine, status, SequencerSettings::default())
    }

    /// Create a sequencer with custom settings
    pub fn with_settings(
        engine: E,
        status: Arc<dyn StatusReporter>,
        settings: SequencerSettings,
    ) -> Self {
        Self {
            engine,
            status,
            settings,
            active: None,
            pending: VecDeque::new(),
        }
    }

    /// Speak one item now, preempting anything in progress
    ///
    /// A read-all sequence in progress is abandoned.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The text is empty
    /// - Rate or pitch is out of range
    /// - The engine refuses the request
    pub fn speak(
        &mut self,
        text: &str,
        voice_id: Option<&str>,
        rate: f32,
        pitch: f32,
        on_complete: Continuation,
    ) -> DictationResult<UtteranceId> {
        if text.trim().is_empty() {
            return Err(DictationError::invalid_input("Text cannot be empty"));
        }
        validate_rate(rate)?;
        validate_pitch(pitch)?;

        if !self.pending.is_empty() {
            debug!("Abandoning read-all with {} items left", self.pending.len());
            self.pending.clear();
        }

        let request = UtteranceRequest::new(
            text.to_string(),
            voice_id.map(str::to_string),
            rate,
            pitch,
            on_complete,
        );
        self.submit(request)
    }

    /// Speak one item with the current default voice, rate and pitch
    ///
    /// # Errors
    ///
    /// Same as [`Self::speak`]
    pub fn speak_with_defaults(
        &mut self,
        text: &str,
        on_complete: Continuation,
    ) -> DictationResult<UtteranceId> {
        let voice_id = self.settings.voice_id.clone();
        let (rate, pitch) = (self.settings.rate, self.settings.pitch);
        self.speak(text, voice_id.as_deref(), rate, pitch, on_complete)
    }

    /// Speak items back to back, in order
    ///
    /// Blank items are skipped. With nothing left to read, reports
    /// [`StatusEvent::NothingToRead`], speaks nothing and returns `Ok(0)`.
    /// Otherwise returns the number of items scheduled.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine refuses the first item
    pub fn speak_sequence<I, S>(&mut self, items: I) -> DictationResult<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut queue: VecDeque<String> = items
            .into_iter()
            .map(|item| item.as_ref().trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();

        let Some(first) = queue.pop_front() else {
            info!("Read-all requested with no items");
            self.status.report(StatusEvent::NothingToRead);
            return Ok(0);
        };

        let count = queue.len() + 1;
        info!("Reading {} items", count);

        self.pending = queue;
        let request = self.default_request(first, Continuation::AdvanceQueue);
        self.submit(request)?;
        Ok(count)
    }

    /// Change rate and pitch, restarting the active utterance if there is one
    ///
    /// The active item restarts from its beginning with the same text, voice
    /// and continuation. Queued read-all items are kept. Returns the id of the
    /// restarted utterance.
    ///
    /// # Errors
    ///
    /// Returns an error if rate or pitch is out of range, or the engine
    /// refuses the restarted request
    pub fn retune(&mut self, rate: f32, pitch: f32) -> DictationResult<Option<UtteranceId>> {
        validate_rate(rate)?;
        validate_pitch(pitch)?;
        self.settings.rate = rate;
        self.settings.pitch = pitch;

        let Some(active) = &self.active else {
            debug!("Retune with nothing active; updated defaults only");
            return Ok(None);
        };

        debug!("Restarting '{}' at rate {rate}, pitch {pitch}", active.text());
        let request = active.retuned(rate, pitch);
        self.submit(request).map(Some)
    }

    /// Process one engine signal
    pub fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Completed(id) => self.on_completed(id),
            EngineEvent::Failed(id, kind) => self.on_failed(id, kind),
        }
    }

    /// Feed engine events into the sequencer until it is idle
    ///
    /// Returns early if the channel closes while an utterance is active.
    pub async fn drive(&mut self, events: &mut UnboundedReceiver<EngineEvent>) {
        while self.is_active() {
            match events.recv().await {
                Some(event) => self.handle_event(event),
                None => {
                    warn!("Engine event channel closed with an utterance active");
                    break;
                }
            }
        }
    }

    /// Whether an utterance is active
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// The active request, if any
    #[must_use]
    pub const fn active_request(&self) -> Option<&UtteranceRequest> {
        self.active.as_ref()
    }

    /// Number of read-all items waiting behind the active one
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Current defaults
    #[must_use]
    pub const fn settings(&self) -> &SequencerSettings {
        &self.settings
    }

    /// Select the default voice
    pub fn set_voice(&mut self, voice_id: Option<String>) {
        self.settings.voice_id = voice_id;
    }

    /// Speech engine
    #[must_use]
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    /// Speech engine, mutably
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    fn default_request(&self, text: String, on_complete: Continuation) -> UtteranceRequest {
        UtteranceRequest::new(
            text,
            self.settings.voice_id.clone(),
            self.settings.rate,
            self.settings.pitch,
            on_complete,
        )
    }

    /// Cancel whatever is active, then hand `request` to the engine
    fn submit(&mut self, request: UtteranceRequest) -> DictationResult<UtteranceId> {
        if let Some(previous) = self.active.take() {
            debug!("Cancelling active utterance {}", previous.id());
            self.engine.cancel();
        }

        let id = request.id();
        match self.engine.speak(&request) {
            Ok(()) => {
                self.active = Some(request);
                Ok(id)
            }
            Err(err) => {
                error!("Speech engine refused '{}': {}", request.text(), err);
                self.pending.clear();
                self.status.report(StatusEvent::SpeechRejected(err.to_string()));
                Err(err)
            }
        }
    }

    fn is_active_id(&self, id: UtteranceId) -> bool {
        self.active.as_ref().is_some_and(|active| active.id() == id)
    }

    fn on_completed(&mut self, id: UtteranceId) {
        if !self.is_active_id(id) {
            debug!("Ignoring completion of superseded utterance {id}");
            return;
        }

        let Some(finished) = self.active.take() else {
            return;
        };
        match finished.on_complete() {
            Continuation::None => {}
            Continuation::Callback(callback) => callback(),
            Continuation::AdvanceQueue => self.advance_queue(),
        }
    }

    fn on_failed(&mut self, id: UtteranceId, kind: SpeechErrorKind) {
        let current = self.is_active_id(id);

        match self.settings.interruption_policy.classify(&kind) {
            ErrorClass::ExpectedInterruption => {
                debug!("Speech interrupted as expected: {kind}");
            }
            ErrorClass::UnexpectedFailure => {
                error!("Speech failed for utterance {id}: {kind}");
                self.status.report(StatusEvent::SpeechError(kind));
            }
        }

        if current {
            self.active = None;
            if !self.pending.is_empty() {
                info!("Read-all stopped with {} items left", self.pending.len());
                self.pending.clear();
            }
        }
    }

    fn advance_queue(&mut self) {
        let Some(next) = self.pending.pop_front() else {
            info!("Finished reading all items");
            return;
        };

        let request = self.default_request(next, Continuation::AdvanceQueue);
        if let Err(err) = self.submit(request) {
            // Already reported by submit
            debug!("Read-all ended early: {err}");
        }
    }
}

impl<E: SpeechEngine + std::fmt::Debug> std::fmt::Debug for UtteranceSequencer<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UtteranceSequencer")
            .field("engine", &self.engine)
            .field("settings", &self.settings)
            .field("active", &self.active)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}
