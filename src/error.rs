//! Error handling for Shatter
//!
//! Every failure is fatal for the run; the helpers below only decide how it
//! is reported.

use thiserror::Error;

/// Result type alias for Shatter operations
pub type Result<T> = std::result::Result<T, ShatterError>;

/// Main error type for Shatter operations
#[derive(Error, Debug)]
pub enum ShatterError {
    // Configuration Errors
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Unsupported channel count: {channels} (only mono input is supported)")]
    UnsupportedChannels { channels: u16 },

    // Audio I/O Errors
    #[error("Failed to read audio file: {path}")]
    AudioRead {
        path: String,
        #[source]
        source: hound::Error,
    },

    #[error("Failed to write audio file: {path}")]
    AudioWrite {
        path: String,
        #[source]
        source: hound::Error,
    },

    #[error("Short write: sink accepted {written} of {expected} frames")]
    ShortWrite { expected: usize, written: usize },

    #[error("Audio contains no samples")]
    EmptyAudio,

    // Engine Errors
    #[error("Degenerate input: {reason}")]
    DegenerateInput { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ShatterError {
    /// Shorthand for a configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        ShatterError::Config {
            reason: reason.into(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            ShatterError::Config { .. } => "CONFIG_ERROR",
            ShatterError::UnsupportedChannels { .. } => "UNSUPPORTED_CHANNELS",
            ShatterError::AudioRead { .. } => "AUDIO_READ_ERROR",
            ShatterError::AudioWrite { .. } => "AUDIO_WRITE_ERROR",
            ShatterError::ShortWrite { .. } => "SHORT_WRITE",
            ShatterError::EmptyAudio => "EMPTY_AUDIO",
            ShatterError::DegenerateInput { .. } => "DEGENERATE_INPUT",
            ShatterError::Io(_) => "IO_ERROR",
            ShatterError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Whether the error was raised before any audio was touched
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ShatterError::Config { .. } | ShatterError::UnsupportedChannels { .. }
        )
    }

    /// Returns a suggested recovery action for this error
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            Self::Config { .. } => "Run with --help to check the accepted ranges",
            Self::UnsupportedChannels { .. } => "Mix the file down to mono first",
            Self::AudioRead { .. } => "Check that the file exists and is a valid WAV file",
            Self::AudioWrite { .. } | Self::ShortWrite { .. } => {
                "Check the output location is writable and has free space"
            }
            Self::EmptyAudio => "Use a source file that contains audio",
            Self::DegenerateInput { .. } => {
                "Widen the search window, use -n or -z, or relax the -m/-x shard lengths"
            }
            _ => "Check the error details and try again",
        }
    }
}
