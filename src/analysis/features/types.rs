// Types module - Data structures for spectra and derived features
//
// This module defines the core data structures shared by the capture side
// (which produces SpectralBins) and the calibration and matching sides
// (which consume FrequencyCharacteristics).

use serde::{Deserialize, Serialize};

/// Largest magnitude a bin can hold (byte scale)
pub const MAX_MAGNITUDE: f32 = 255.0;

/// Bins skipped at the bottom of the spectrum when measuring volume
const VOLUME_SKIP_LOW_BINS: usize = 5;

/// Fraction of the spectrum (from the bottom) included when measuring volume
const VOLUME_UPPER_FRACTION: f32 = 0.8;

/// One frequency-domain snapshot: N magnitudes in byte scale [0, 255]
///
/// Magnitudes are stored as `f32` so that bin-wise averages of several
/// snapshots stay exact. Bin `i` covers frequency
/// `i / N * (sample_rate / 2)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpectralBins {
    magnitudes: Vec<f32>,
}

impl SpectralBins {
    /// Create bins from raw magnitudes, clamping into [0, 255]
    ///
    /// Non-finite values are treated as silence.
    pub fn new(magnitudes: Vec<f32>) -> Self {
        let magnitudes = magnitudes
            .into_iter()
            .map(|m| if m.is_finite() { m.clamp(0.0, MAX_MAGNITUDE) } else { 0.0 })
            .collect();
        Self { magnitudes }
    }

    /// Create bins from a byte spectrum
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            magnitudes: bytes.iter().map(|&b| b as f32).collect(),
        }
    }

    /// All-zero spectrum of the given length
    pub fn zeros(len: usize) -> Self {
        Self {
            magnitudes: vec![0.0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitudes.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.magnitudes
    }

    /// Magnitudes rounded back to bytes, for rendering
    pub fn to_bytes(&self) -> Vec<u8> {
        self.magnitudes.iter().map(|&m| m.round() as u8).collect()
    }

    /// Bin-wise average of several spectra
    ///
    /// The result has the length of the first sample; shorter samples
    /// contribute zero for the bins they lack. An empty slice yields an
    /// empty spectrum.
    pub fn average(samples: &[SpectralBins]) -> SpectralBins {
        let Some(first) = samples.first() else {
            return SpectralBins::default();
        };
        if samples.len() == 1 {
            return first.clone();
        }

        let len = first.len();
        let mut sums = vec![0.0f32; len];
        for sample in samples {
            for (sum, &m) in sums.iter_mut().zip(sample.magnitudes.iter()) {
                *sum += m;
            }
        }

        let count = samples.len() as f32;
        SpectralBins {
            magnitudes: sums.into_iter().map(|s| s / count).collect(),
        }
    }

    /// Normalized loudness in [0, 1]
    ///
    /// Mean magnitude over a trimmed range: the first 5 bins (noise floor,
    /// DC) and the top 20% of bins (ultrasonic junk) are ignored.
    pub fn volume(&self) -> f32 {
        let end = (self.len() as f32 * VOLUME_UPPER_FRACTION) as usize;
        if end <= VOLUME_SKIP_LOW_BINS {
            return 0.0;
        }

        let range = &self.magnitudes[VOLUME_SKIP_LOW_BINS..end];
        let sum: f32 = range.iter().sum();
        sum / range.len() as f32 / MAX_MAGNITUDE
    }

    /// Centre frequency in Hz of a bin, given the source's sample rate
    pub fn frequency_of(&self, index: usize, sample_rate: u32) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        index as f32 / self.len() as f32 * (sample_rate as f32 / 2.0)
    }
}

/// Features summarizing one or more spectra
///
/// All index-valued fields are bin indices, not Hz; they are only
/// comparable between spectra of the same length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrequencyCharacteristics {
    /// Up to 3 strict local maxima above the magnitude floor, ascending
    pub peak_frequencies: Vec<usize>,

    /// Mean magnitude across all bins (byte scale)
    pub avg_energy: f32,

    /// Energy-weighted mean bin index; 0 for a silent spectrum
    pub spectral_centroid: f32,

    /// Smallest bin index holding 85% of cumulative energy; 0 for silence
    pub spectral_rolloff: usize,

    /// Sign changes around the spectrum's own mean, per bin
    ///
    /// This measures dispersion of the magnitudes around their mean, not
    /// time-domain zero crossings. Matching thresholds were tuned against
    /// this definition, so it is kept as is.
    pub zero_crossing_rate: f32,

    /// Up to 3 resonances found in a smoothed copy of the spectrum
    pub formants: Vec<usize>,
}
