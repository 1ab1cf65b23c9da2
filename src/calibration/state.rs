// Profile - a participant's calibrated voice
//
// A profile keeps the raw calibration samples next to the characteristics
// computed from their bin-wise average. Profiles live in memory only and are
// replaced wholesale by a new calibration, never merged.

use crate::analysis::features::{self, FrequencyCharacteristics, SpectralBins};
use crate::config::FrequencyRange;
use crate::fixtures;
use crate::participant::Participant;

/// Stored acoustic profile for one participant
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Profile {
    pub participant: Participant,
    /// Accepted calibration samples, in capture order
    pub frequency_profiles: Vec<SpectralBins>,
    /// Features of the averaged samples
    pub characteristics: FrequencyCharacteristics,
}

impl Profile {
    /// Build a profile from accepted samples
    ///
    /// Returns `None` when there are no samples; an empty calibration never
    /// produces a profile.
    pub fn from_samples(participant: Participant, samples: Vec<SpectralBins>) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let characteristics = features::extract(&samples);
        Some(Self {
            participant,
            frequency_profiles: samples,
            characteristics,
        })
    }

    /// Placeholder profile for skipping calibration during development
    ///
    /// Synthesizes one voiced sample with resonances inside the
    /// participant's band.
    pub fn dummy(
        participant: Participant,
        range: FrequencyRange,
        bin_count: usize,
        sample_rate: u32,
    ) -> Self {
        let sample = fixtures::voice_in_range(range, bin_count, sample_rate);
        let characteristics = features::extract_one(&sample);
        Self {
            participant,
            frequency_profiles: vec![sample],
            characteristics,
        }
    }

    pub fn sample_count(&self) -> usize {
        self.frequency_profiles.len()
    }
}
