// Audio module - microphone capture and spectrum analysis

pub mod analyzer;
#[cfg(not(target_os = "android"))]
pub mod engine_cpal;
pub mod source;
pub mod stubs;

// Re-export commonly used types for convenience
pub use analyzer::SpectrumAnalyzer;
#[cfg(not(target_os = "android"))]
pub use engine_cpal::CpalSpectrumSource;
pub use source::{SpectrumReading, SpectrumSource};
pub use stubs::{ScriptedFeed, ScriptedSpectrumSource};
