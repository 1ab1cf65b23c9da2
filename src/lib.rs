// Voice Duel Core - shark vs. seal voice classification engine
// Microphone spectra in, per-player calibration and live match scores out

// Module declarations
pub mod analysis;
pub mod audio;
pub mod calibration;
pub mod config;
pub mod engine;
pub mod error;
pub mod fixtures;
pub mod managers;
pub mod participant;

// Re-exports for convenience
pub use analysis::{BandReading, FrequencyCharacteristics, MatchFeedback, SpectralBins};
pub use audio::{SpectrumReading, SpectrumSource};
pub use calibration::{CalibrationProgress, Profile};
pub use config::EngineConfig;
pub use engine::VoiceEngine;
pub use error::{AudioError, CalibrationError, ErrorCode};
pub use participant::Participant;
