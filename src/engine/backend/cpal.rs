//! CPAL-based spectrum backend for desktop platforms (Linux, macOS, Windows)
//!
//! Each `open` acquires the default input device for one participant and
//! wraps it in a CpalSpectrumSource with its own analyzer.

use crate::audio::{CpalSpectrumSource, SpectrumSource};
use crate::config::AnalyzerConfig;
use crate::error::AudioError;
use crate::participant::Participant;

use super::SpectrumBackend;

/// Live microphone backend
pub struct CpalBackend {
    analyzer_config: AnalyzerConfig,
}

impl CpalBackend {
    /// Create a new CPAL backend
    pub fn new(analyzer_config: AnalyzerConfig) -> Self {
        Self { analyzer_config }
    }
}

impl SpectrumBackend for CpalBackend {
    fn open(&self, participant: Participant) -> Result<Box<dyn SpectrumSource>, AudioError> {
        let source = CpalSpectrumSource::open(participant, &self.analyzer_config)?;
        Ok(Box::new(source))
    }
}
