// Band energy - fixed frequency-band detection for simultaneous sounds
//
// Each participant owns a frequency band (shark: low growl, seal: high bark).
// The energy of a band is the mean magnitude of the bins covering it,
// normalized to [0, 1]. When both bands carry energy at the same time the two
// participants are sounding simultaneously.

use crate::analysis::features::{SpectralBins, MAX_MAGNITUDE};
use crate::config::{FrequencyRange, MatchingConfig};
use crate::participant::Participant;

/// Inclusive bin index range covering a frequency range
///
/// `index = floor(hz / nyquist * bin_count)`, clamped to the last bin.
/// Returns `None` for an empty spectrum or a zero sample rate.
pub fn bin_range(range: FrequencyRange, bin_count: usize, sample_rate: u32) -> Option<(usize, usize)> {
    if bin_count == 0 || sample_rate == 0 {
        return None;
    }

    let nyquist = sample_rate as f32 / 2.0;
    let last = bin_count - 1;
    let to_index = |hz: f32| ((hz.max(0.0) / nyquist * bin_count as f32).floor() as usize).min(last);

    let start = to_index(range.min_hz);
    let end = to_index(range.max_hz);
    Some((start, end.max(start)))
}

/// Normalized mean magnitude of the bins covering `range`
pub fn band_energy(bins: &SpectralBins, range: FrequencyRange, sample_rate: u32) -> f32 {
    let Some((start, end)) = bin_range(range, bins.len(), sample_rate) else {
        return 0.0;
    };

    let band = &bins.as_slice()[start..=end];
    band.iter().sum::<f32>() / band.len() as f32 / MAX_MAGNITUDE
}

/// Band energies of both participants at one instant
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BandReading {
    pub shark: f32,
    pub seal: f32,
    /// Both energies reach the energy threshold
    pub simultaneous: bool,
}

impl BandReading {
    /// Classify two band energies against the configured thresholds
    pub fn new(shark: f32, seal: f32, config: &MatchingConfig) -> Self {
        Self {
            shark,
            seal,
            simultaneous: shark >= config.energy_threshold && seal >= config.energy_threshold,
        }
    }

    /// Compute both band energies from one spectrum
    ///
    /// Used when a single microphone hears both players.
    pub fn from_spectrum(bins: &SpectralBins, sample_rate: u32, config: &MatchingConfig) -> Self {
        Self::new(
            band_energy(bins, config.shark_range, sample_rate),
            band_energy(bins, config.seal_range, sample_rate),
            config,
        )
    }

    pub fn energy_of(&self, participant: Participant) -> f32 {
        match participant {
            Participant::Shark => self.shark,
            Participant::Seal => self.seal,
        }
    }

    /// Participant whose band clearly dominates, if any
    ///
    /// A band dominates when it exceeds the energy threshold and is more than
    /// `dominance_ratio` times the other band.
    pub fn dominant(&self, config: &MatchingConfig) -> Option<Participant> {
        Participant::ALL.into_iter().find(|&p| {
            let mine = self.energy_of(p);
            let theirs = self.energy_of(p.other());
            mine > config.energy_threshold && mine > theirs * config.dominance_ratio
        })
    }
}
