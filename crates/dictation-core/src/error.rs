//! Error types for the dictation core.

/// Result type alias for dictation operations
pub type DictationResult<T> = Result<T, DictationError>;

/// Main error type for dictation operations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DictationError {
    /// The speech engine rejected or failed an utterance
    #[error("Speech error: {message}")]
    SpeechError {
        /// Error message describing the failure
        message: String,
    },

    /// Voice not found error
    #[error("Voice '{voice_id}' not found")]
    VoiceNotFound {
        /// The voice ID that was not found
        voice_id: String,
    },

    /// Invalid input error
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Error message describing the invalid input
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Persistent store error
    #[error("Storage error: {message}")]
    StorageError {
        /// Error message describing the storage failure
        message: String,
    },

    /// Network error from a lookup service
    #[error("Network error: {message}")]
    NetworkError {
        /// Error message describing the network issue
        message: String,
    },

    /// Timeout error
    #[error("Operation timed out: {message}")]
    TimeoutError {
        /// Error message describing the timeout
        message: String,
    },

    /// An export request found no items
    #[error("There is nothing to export.")]
    NothingToExport,

    /// Dictation was started without any entered text
    #[error("Please enter some text to start the dictation.")]
    NothingEntered,
}

impl DictationError {
    /// Create a new speech error
    #[must_use]
    pub fn speech<S: Into<String>>(message: S) -> Self {
        Self::SpeechError {
            message: message.into(),
        }
    }

    /// Create a new voice not found error
    #[must_use]
    pub fn voice_not_found<S: Into<String>>(voice_id: S) -> Self {
        Self::VoiceNotFound {
            voice_id: voice_id.into(),
        }
    }

    /// Create a new invalid input error
    #[must_use]
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    #[must_use]
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Create a new storage error
    #[must_use]
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::StorageError {
            message: message.into(),
        }
    }

    /// Create a new network error
    #[must_use]
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    #[must_use]
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::TimeoutError {
            message: message.into(),
        }
    }

    /// Check if this error is retriable
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::NetworkError { .. } | Self::TimeoutError { .. })
    }

    /// Check if this error is due to invalid user input
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. }
                | Self::VoiceNotFound { .. }
                | Self::ConfigurationError { .. }
                | Self::NothingToExport
                | Self::NothingEntered
        )
    }

    /// Get the error category for logging
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::SpeechError { .. } => "speech",
            Self::VoiceNotFound { .. } => "voice",
            Self::InvalidInput { .. } => "input",
            Self::ConfigurationError { .. } => "configuration",
            Self::StorageError { .. } => "storage",
            Self::NetworkError { .. } => "network",
            Self::TimeoutError { .. } => "timeout",
            Self::NothingToExport | Self::NothingEntered => "empty_list",
        }
    }
}

// Convert from common error types
impl From<std::io::Error> for DictationError {
    fn from(err: std::io::Error) -> Self {
        Self::storage(err.to_string())
    }
}

impl From<serde_json::Error> for DictationError {
    fn from(err: serde_json::Error) -> Self {
        Self::storage(format!("JSON serialization error: {err}"))
    }
}

impl From<toml::de::Error> for DictationError {
    fn from(err: toml::de::Error) -> Self {
        Self::configuration(format!("Invalid TOML: {err}"))
    }
}

impl From<reqwest::Error> for DictationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(err.to_string())
        } else {
            Self::network(err.to_string())
        }
    }
}
