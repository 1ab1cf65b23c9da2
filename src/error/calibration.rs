// Calibration error types and constants

use crate::error::{AudioError, ErrorCode};
use crate::participant::Participant;
use log::error;
use std::fmt;

/// Calibration error code constants shared with the game layer
///
/// Error code range: 2001-2006
pub struct CalibrationErrorCodes {}

impl CalibrationErrorCodes {
    /// Calibration finished without a single accepted sample
    pub const NO_SAMPLES_COLLECTED: i32 = 2001;

    /// No calibration session is active
    pub const NOT_IN_PROGRESS: i32 = 2002;

    /// Calibration already in progress
    pub const ALREADY_IN_PROGRESS: i32 = 2003;

    /// Calibration finished for a different participant than it started for
    pub const PARTICIPANT_MISMATCH: i32 = 2004;

    /// Calibration state lock was poisoned
    pub const STATE_POISONED: i32 = 2005;

    /// Underlying spectrum source failed
    pub const AUDIO: i32 = 2006;
}

/// Log a calibration error with structured context
///
/// This function logs calibration errors with structured fields including:
/// - error_code: Numeric error code for programmatic handling
/// - component: The component where the error occurred
/// - message: Human-readable error message
/// - context: Additional contextual information
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        "Calibration error in {}: code={}, component=CalibrationEngine, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Calibration-related errors
///
/// `NoSamplesCollected` is recoverable: the caller should restart calibration.
/// A closeness computation that would divide by zero is never reported here;
/// it scores 0 instead.
///
/// Error code range: 2001-2006
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Calibration finished without a single accepted sample
    NoSamplesCollected { participant: Participant },

    /// No calibration session is active
    NotInProgress,

    /// Calibration already in progress
    AlreadyInProgress { participant: Participant },

    /// Calibration finished for a different participant than it started for
    ParticipantMismatch {
        expected: Participant,
        actual: Participant,
    },

    /// Calibration state lock was poisoned
    StatePoisoned,

    /// Underlying spectrum source failed
    Audio(AudioError),
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::NoSamplesCollected { .. } => {
                CalibrationErrorCodes::NO_SAMPLES_COLLECTED
            }
            CalibrationError::NotInProgress => CalibrationErrorCodes::NOT_IN_PROGRESS,
            CalibrationError::AlreadyInProgress { .. } => {
                CalibrationErrorCodes::ALREADY_IN_PROGRESS
            }
            CalibrationError::ParticipantMismatch { .. } => {
                CalibrationErrorCodes::PARTICIPANT_MISMATCH
            }
            CalibrationError::StatePoisoned => CalibrationErrorCodes::STATE_POISONED,
            CalibrationError::Audio(_) => CalibrationErrorCodes::AUDIO,
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::NoSamplesCollected { participant } => {
                format!(
                    "No samples collected for {}. Try again and make your sound louder.",
                    participant
                )
            }
            CalibrationError::NotInProgress => "Calibration not in progress".to_string(),
            CalibrationError::AlreadyInProgress { participant } => {
                format!("Calibration already in progress for {}", participant)
            }
            CalibrationError::ParticipantMismatch { expected, actual } => {
                format!(
                    "Calibration started for {} but finished for {}",
                    expected, actual
                )
            }
            CalibrationError::StatePoisoned => "Calibration state lock poisoned".to_string(),
            CalibrationError::Audio(err) => err.message(),
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CalibrationError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CalibrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CalibrationError::Audio(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AudioError> for CalibrationError {
    fn from(err: AudioError) -> Self {
        CalibrationError::Audio(err)
    }
}
