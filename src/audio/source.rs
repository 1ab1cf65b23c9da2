// Source module - the capture seam between hardware and analysis
//
// A SpectrumSource is one participant's microphone plus analyzer. Reads
// never block: they return the latest frame, or silence if there is none.

use crate::analysis::features::SpectralBins;

/// One participant's live spectrum source
///
/// Implementations must be safe to share across threads; the engine holds
/// sources behind `Arc` and reads them from whichever task polls.
pub trait SpectrumSource: Send + Sync {
    /// Latest spectrum frame
    ///
    /// Returns all zeros before any audio has arrived and after `close`.
    fn read(&self) -> SpectralBins;

    /// Sampling rate of the capture device in Hz
    fn sample_rate(&self) -> u32;

    /// Number of bins in every frame this source produces
    fn bin_count(&self) -> usize;

    /// Release the capture device. Calling this more than once is a no-op.
    fn close(&self);

    fn is_closed(&self) -> bool;
}

/// A spectrum frame together with its normalized volume
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SpectrumReading {
    pub bins: SpectralBins,
    /// Trimmed mean magnitude in [0, 1]
    pub volume: f32,
}

impl SpectrumReading {
    pub fn new(bins: SpectralBins) -> Self {
        let volume = bins.volume();
        Self { bins, volume }
    }

    /// Silent reading of the given length
    pub fn silent(bin_count: usize) -> Self {
        Self {
            bins: SpectralBins::zeros(bin_count),
            volume: 0.0,
        }
    }
}
