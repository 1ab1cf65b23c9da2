// Audio error types and constants

use crate::error::ErrorCode;
use crate::participant::Participant;
use log::error;
use std::fmt;

/// Audio error code constants shared with the game layer
///
/// These constants provide a single source of truth for error codes
/// so the UI can map failures to user-facing messages.
///
/// Error code range: 1001-1006
pub struct AudioErrorCodes {}

impl AudioErrorCodes {
    /// Capture device denied, missing, or failed to start
    pub const CAPTURE_UNAVAILABLE: i32 = 1001;

    /// No source is open for the participant
    pub const NOT_OPEN: i32 = 1002;

    /// A source is already open for the participant
    pub const ALREADY_OPEN: i32 = 1003;

    /// Device only offers a sample format the engine cannot read
    pub const UNSUPPORTED_FORMAT: i32 = 1004;

    /// Mutex/RwLock was poisoned
    pub const LOCK_POISONED: i32 = 1005;

    /// Configuration values are out of range
    pub const INVALID_CONFIG: i32 = 1006;
}

/// Log an audio error with structured context
///
/// This function logs audio errors with structured fields including:
/// - error_code: Numeric error code for programmatic handling
/// - component: The component where the error occurred
/// - message: Human-readable error message
/// - context: Additional contextual information
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component=SpectrumSource, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio-related errors
///
/// These errors cover capture device acquisition and source lifecycle.
/// `CaptureUnavailable` is terminal for the participant: the core never
/// retries, since retrying silently could prompt the permission dialog again.
///
/// Error code range: 1001-1006
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// Capture device denied, missing, or failed to start
    CaptureUnavailable { reason: String },

    /// No source is open for the participant
    NotOpen { participant: Participant },

    /// A source is already open for the participant
    AlreadyOpen { participant: Participant },

    /// Device only offers a sample format the engine cannot read
    UnsupportedFormat { format: String },

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },

    /// Configuration values are out of range
    InvalidConfig { reason: String },
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::CaptureUnavailable { .. } => AudioErrorCodes::CAPTURE_UNAVAILABLE,
            AudioError::NotOpen { .. } => AudioErrorCodes::NOT_OPEN,
            AudioError::AlreadyOpen { .. } => AudioErrorCodes::ALREADY_OPEN,
            AudioError::UnsupportedFormat { .. } => AudioErrorCodes::UNSUPPORTED_FORMAT,
            AudioError::LockPoisoned { .. } => AudioErrorCodes::LOCK_POISONED,
            AudioError::InvalidConfig { .. } => AudioErrorCodes::INVALID_CONFIG,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::CaptureUnavailable { reason } => {
                format!("Microphone unavailable: {}", reason)
            }
            AudioError::NotOpen { participant } => {
                format!("No microphone open for {}. Call open() first.", participant)
            }
            AudioError::AlreadyOpen { participant } => {
                format!("Microphone already open for {}", participant)
            }
            AudioError::UnsupportedFormat { format } => {
                format!("Unsupported sample format: {}", format)
            }
            AudioError::LockPoisoned { component } => {
                format!("Lock poisoned for component: {}", component)
            }
            AudioError::InvalidConfig { reason } => {
                format!("Invalid configuration: {}", reason)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}
