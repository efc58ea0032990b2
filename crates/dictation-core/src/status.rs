//! User-visible status channel.

use crate::speech_engine::SpeechErrorKind;
use parking_lot::Mutex;
use std::fmt;

/// Messages surfaced to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// A read-all request had nothing to read
    NothingToRead,
    /// The engine reported an unexpected error
    SpeechError(SpeechErrorKind),
    /// The engine refused a submission
    SpeechRejected(String),
    /// The list order was shuffled
    Shuffled,
    /// The engine offers no English or Cantonese voice
    NoSupportedVoices,
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NothingToRead => write!(f, "There are no items to read."),
            Self::SpeechError(kind) => write!(f, "An error occurred during speech: {kind}"),
            Self::SpeechRejected(message) => {
                write!(f, "An error occurred during speech: {message}")
            }
            Self::Shuffled => write!(f, "Lines have been shuffled."),
            Self::NoSupportedVoices => {
                write!(f, "No English or Cantonese voices found in your browser.")
            }
        }
    }
}

/// Sink for status messages
pub trait StatusReporter: Send + Sync {
    /// Surface one message
    fn report(&self, event: StatusEvent);
}

impl<F> StatusReporter for F
where
    F: Fn(StatusEvent) + Send + Sync,
{
    fn report(&self, event: StatusEvent) {
        self(event);
    }
}

/// Reporter that keeps every message, newest last
#[derive(Debug, Default)]
pub struct StatusLog {
    events: Mutex<Vec<StatusEvent>>,
}

impl StatusLog {
    /// Create an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all messages so far
    #[must_use]
    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.lock().clone()
    }

    /// Most recent message
    #[must_use]
    pub fn latest(&self) -> Option<StatusEvent> {
        self.events.lock().last().cloned()
    }

    /// Number of messages so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether nothing was reported
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Drop all messages
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl StatusReporter for StatusLog {
    fn report(&self, event: StatusEvent) {
        self.events.lock().push(event);
    }
}
