// Matcher - weighted feature comparison of a live spectrum against a profile
//
// A score combines four similarity terms:
//
//   score = w_peak · peak_overlap
//         + w_centroid · closeness(centroid)
//         + w_rolloff · closeness(rolloff)
//         + w_zcr · closeness(zero_crossing_rate)
//
// Each term lies in [0, 1] and the default weights sum to 1.0, so the score
// does too. A live spectrum quieter than the calibration volume gate always
// scores exactly 0 so that silence never registers as a match.

use crate::analysis::features::{self, FrequencyCharacteristics, SpectralBins};
use crate::config::MatchingConfig;

/// Coarse feedback level derived from a match score
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MatchFeedback {
    /// Score above the strong threshold (0.6 by default)
    Strong,
    /// Score above the weak threshold (0.2 by default)
    Weak,
    /// Anything else
    None,
}

impl MatchFeedback {
    /// Map a score to a feedback level using the default thresholds
    pub fn from_score(score: f32) -> Self {
        Self::from_score_with(score, &MatchingConfig::default())
    }

    /// Map a score to a feedback level using configured thresholds
    pub fn from_score_with(score: f32, config: &MatchingConfig) -> Self {
        if score > config.strong_match_score {
            MatchFeedback::Strong
        } else if score > config.weak_match_score {
            MatchFeedback::Weak
        } else {
            MatchFeedback::None
        }
    }
}

/// Scores live spectra against stored voice profiles
#[derive(Debug, Clone)]
pub struct Matcher {
    config: MatchingConfig,
    /// Live spectra at or below this normalized volume score 0
    volume_threshold: f32,
}

impl Matcher {
    pub fn new(config: MatchingConfig, volume_threshold: f32) -> Self {
        Self {
            config,
            volume_threshold,
        }
    }

    /// Score a live spectrum against stored characteristics
    ///
    /// # Returns
    /// Similarity in [0, 1]; exactly 0 for a quiet live spectrum
    pub fn score(&self, live: &SpectralBins, stored: &FrequencyCharacteristics) -> f32 {
        if live.volume() < self.volume_threshold {
            return 0.0;
        }

        let current = features::extract_one(live);
        self.score_features(&current, stored)
    }

    /// Score two feature records directly, without the volume gate
    pub fn score_features(
        &self,
        live: &FrequencyCharacteristics,
        stored: &FrequencyCharacteristics,
    ) -> f32 {
        let peak = peak_overlap(
            &live.peak_frequencies,
            &stored.peak_frequencies,
            self.config.peak_tolerance_bins,
        );
        let centroid = closeness(live.spectral_centroid, stored.spectral_centroid);
        let rolloff = closeness(
            live.spectral_rolloff as f32,
            stored.spectral_rolloff as f32,
        );
        let zcr = closeness(live.zero_crossing_rate, stored.zero_crossing_rate);

        let score = self.config.peak_weight * peak
            + self.config.centroid_weight * centroid
            + self.config.rolloff_weight * rolloff
            + self.config.zero_crossing_weight * zcr;

        tracing::debug!(peak, centroid, rolloff, zcr, score, "match terms");

        score.clamp(0.0, 1.0)
    }

    /// Feedback level for a score under this matcher's thresholds
    pub fn feedback(&self, score: f32) -> MatchFeedback {
        MatchFeedback::from_score_with(score, &self.config)
    }
}

/// Fraction of live peaks lying within `tolerance` bins of some stored peak
///
/// Normalized by the larger of the two peak counts; 0 if either is empty.
pub fn peak_overlap(live: &[usize], stored: &[usize], tolerance: usize) -> f32 {
    if live.is_empty() || stored.is_empty() {
        return 0.0;
    }

    let matches = live
        .iter()
        .filter(|&&l| stored.iter().any(|&s| l.abs_diff(s) <= tolerance))
        .count();

    matches as f32 / live.len().max(stored.len()) as f32
}

/// Relative closeness `max(0, 1 - |live - stored| / stored)`
///
/// A zero stored value carries no information and yields 0.
pub fn closeness(live: f32, stored: f32) -> f32 {
    if stored == 0.0 || !stored.is_finite() || !live.is_finite() {
        return 0.0;
    }
    (1.0 - (live - stored).abs() / stored.abs()).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Loud spectrum with three clear resonances
    fn voiced(centers: &[usize]) -> SpectralBins {
        let mut magnitudes = vec![90.0f32; 1024];
        for &c in centers {
            for d in 0..=4usize {
                let value = 250.0 - d as f32 * 30.0;
                for idx in [c.saturating_sub(d), c + d] {
                    if idx < magnitudes.len() {
                        magnitudes[idx] = magnitudes[idx].max(value);
                    }
                }
            }
        }
        SpectralBins::new(magnitudes)
    }

    fn matcher() -> Matcher {
        Matcher::new(MatchingConfig::default(), 0.2)
    }

    #[test]
    fn test_self_match_is_high() {
        let live = voiced(&[30, 90, 200]);
        let stored = features::extract(&[live.clone()]);

        let score = matcher().score(&live, &stored);
        assert!(score >= 0.9, "self match scored {}", score);
    }

    #[test]
    fn test_quiet_live_scores_exactly_zero() {
        let stored = features::extract(&[voiced(&[30, 90, 200])]);
        let quiet = SpectralBins::from_bytes(&[10u8; 1024]);

        assert_eq!(matcher().score(&quiet, &stored), 0.0);
        assert_eq!(matcher().score(&SpectralBins::zeros(1024), &stored), 0.0);
    }

    #[test]
    fn test_different_voice_scores_lower() {
        let shark = voiced(&[20, 40, 60]);
        let seal = voiced(&[400, 600, 800]);
        let stored = features::extract(&[shark.clone()]);

        let m = matcher();
        let same = m.score(&shark, &stored);
        let other = m.score(&seal, &stored);
        assert!(other < same, "other {} should be below same {}", other, same);
    }

    #[test]
    fn test_score_is_in_unit_range() {
        let m = matcher();
        let stored = features::extract(&[voiced(&[10, 500, 900])]);
        for centers in [[5, 50, 500], [100, 101, 102], [700, 800, 1000]] {
            let score = m.score(&voiced(&centers), &stored);
            assert!((0.0..=1.0).contains(&score));
        }
    }

    #[test]
    fn test_empty_stored_profile_is_degenerate_not_error() {
        let live = voiced(&[30, 90, 200]);
        let score = matcher().score(&live, &FrequencyCharacteristics::default());
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_peak_overlap() {
        assert_eq!(peak_overlap(&[10, 50], &[12, 80, 120], 2), 1.0 / 3.0);
        assert_eq!(peak_overlap(&[10], &[13], 2), 0.0);
        assert_eq!(peak_overlap(&[], &[13], 2), 0.0);
        assert_eq!(peak_overlap(&[13], &[], 2), 0.0);
        assert_eq!(peak_overlap(&[5, 9], &[5, 9], 2), 1.0);
    }

    #[test]
    fn test_closeness() {
        assert_eq!(closeness(100.0, 100.0), 1.0);
        assert_eq!(closeness(150.0, 100.0), 0.5);
        assert_eq!(closeness(300.0, 100.0), 0.0);
        assert_eq!(closeness(5.0, 0.0), 0.0);
    }

    #[test]
    fn test_feedback_levels() {
        assert_eq!(MatchFeedback::from_score(0.75), MatchFeedback::Strong);
        assert_eq!(MatchFeedback::from_score(0.6), MatchFeedback::Weak);
        assert_eq!(MatchFeedback::from_score(0.3), MatchFeedback::Weak);
        assert_eq!(MatchFeedback::from_score(0.2), MatchFeedback::None);
        assert_eq!(MatchFeedback::from_score(0.0), MatchFeedback::None);
    }
}
