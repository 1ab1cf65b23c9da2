// Feature extraction - spectral features for voice profile matching
//
// This module turns one or more byte-scale spectra into a
// FrequencyCharacteristics record. It is used both when building a
// participant's profile from calibration samples and when scoring a live
// spectrum against that profile.
//
// Module organization:
// - types: Data structures (SpectralBins, FrequencyCharacteristics)
// - spectral: Scalar features (average energy, centroid, rolloff, crossing rate)
// - peaks: Peak and formant picking
// - mod.rs: Coordinator (extract)
//
// Features extracted:
// 1. Peak frequencies: strict local maxima above a fixed floor
// 2. Average energy: mean magnitude
// 3. Spectral centroid: energy-weighted mean bin
// 4. Spectral rolloff: bin below which 85% of the energy lies
// 5. Zero-crossing rate: sign changes around the spectrum's own mean
// 6. Formants: resonances in a smoothed copy of the spectrum
//
// Extraction is pure, deterministic and total: silence or an empty input
// produce zero-valued features, never a panic or NaN.

mod peaks;
mod spectral;
mod types;

pub use peaks::{find_formants, find_peaks, smooth, MAGNITUDE_FLOOR};
pub use spectral::{rolloff_at, ROLLOFF_THRESHOLD};
pub use types::{FrequencyCharacteristics, SpectralBins, MAX_MAGNITUDE};

/// Extract features from one or more spectra
///
/// When more than one sample is given they are averaged bin-wise first, so
/// features are always computed over a single aggregate spectrum.
///
/// # Arguments
/// * `samples` - Spectra of the same source (same bin count)
///
/// # Returns
/// FrequencyCharacteristics of the aggregate spectrum
pub fn extract(samples: &[SpectralBins]) -> FrequencyCharacteristics {
    let aggregate = SpectralBins::average(samples);
    extract_one(&aggregate)
}

/// Extract features from a single spectrum
pub fn extract_one(bins: &SpectralBins) -> FrequencyCharacteristics {
    let magnitudes = bins.as_slice();

    FrequencyCharacteristics {
        peak_frequencies: peaks::find_peaks(magnitudes),
        avg_energy: spectral::average_energy(magnitudes),
        spectral_centroid: spectral::centroid(magnitudes),
        spectral_rolloff: spectral::rolloff(magnitudes),
        zero_crossing_rate: spectral::zero_crossing_rate(magnitudes),
        formants: peaks::find_formants(magnitudes),
    }
}
