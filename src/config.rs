//! Configuration management for dynamic parameter tuning
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling fast iteration without recompilation. Volume gates, debounce
//! timing, analyzer smoothing and matching weights can all be adjusted via
//! the config file. Missing sections or fields fall back to the defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::AudioError;
use crate::participant::Participant;

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub analyzer: AnalyzerConfig,
    pub calibration: CalibrationConfig,
    pub matching: MatchingConfig,
}

/// Frequency-domain transform parameters for live sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// FFT window size in samples (bin count is half of this)
    pub fft_size: usize,
    /// Exponential blend factor between consecutive frames (0.0 = no smoothing)
    pub smoothing: f32,
    /// Level mapped to byte value 0
    pub min_decibels: f32,
    /// Level mapped to byte value 255
    pub max_decibels: f32,
    /// Capacity of the capture ring buffer in samples
    pub ring_capacity: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            smoothing: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
            ring_capacity: 48_000,
        }
    }
}

impl AnalyzerConfig {
    /// Number of spectral bins produced per frame
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }
}

/// Calibration gate and sampling configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Normalized volume a capture must exceed to be accepted
    pub volume_threshold: f32,
    /// Minimum time between two accepted samples
    pub min_sample_gap_ms: u64,
    /// Raw readings averaged into one accepted sample
    pub readings_per_sample: usize,
    /// Window over which the readings are spread
    pub reading_window_ms: u64,
    /// Accepted samples the caller should gather before finishing
    pub samples_needed: usize,
    /// Cadence at which the caller should poll capture_sample
    pub capture_interval_ms: u64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            volume_threshold: 0.2,
            min_sample_gap_ms: 500,
            readings_per_sample: 3,
            reading_window_ms: 100,
            samples_needed: 5,
            capture_interval_ms: 16,
        }
    }
}

/// Frequency range assigned to one participant for band-energy detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyRange {
    pub min_hz: f32,
    pub max_hz: f32,
}

/// Match scoring and band-energy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub peak_weight: f32,
    pub centroid_weight: f32,
    pub rolloff_weight: f32,
    pub zero_crossing_weight: f32,
    /// Bins a live peak may drift from a stored peak and still count
    pub peak_tolerance_bins: usize,
    /// Band energy both participants must reach to count as simultaneous
    pub energy_threshold: f32,
    /// Factor by which a band must beat the other band to dominate
    pub dominance_ratio: f32,
    /// Scores above this are a strong match
    pub strong_match_score: f32,
    /// Scores above this are a weak match
    pub weak_match_score: f32,
    /// Suggested minimum time between two feedback effects in the UI
    pub feedback_cooldown_ms: u64,
    /// Cadence at which the caller should poll match_score
    pub match_interval_ms: u64,
    pub shark_range: FrequencyRange,
    pub seal_range: FrequencyRange,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            peak_weight: 0.4,
            centroid_weight: 0.2,
            rolloff_weight: 0.2,
            zero_crossing_weight: 0.2,
            peak_tolerance_bins: 2,
            energy_threshold: 0.2,
            dominance_ratio: 1.5,
            strong_match_score: 0.6,
            weak_match_score: 0.2,
            feedback_cooldown_ms: 300,
            match_interval_ms: 50,
            // Low growl
            shark_range: FrequencyRange {
                min_hz: 100.0,
                max_hz: 400.0,
            },
            // High bark
            seal_range: FrequencyRange {
                min_hz: 800.0,
                max_hz: 2000.0,
            },
        }
    }
}

impl MatchingConfig {
    /// Frequency range used for a participant's band energy
    pub fn range_for(&self, participant: Participant) -> FrequencyRange {
        match participant {
            Participant::Shark => self.shark_range,
            Participant::Seal => self.seal_range,
        }
    }
}

impl EngineConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The loaded configuration, or the defaults if the file is missing,
    /// malformed, or fails validation
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                return Self::default();
            }
        };

        match serde_json::from_str::<EngineConfig>(&contents) {
            Ok(config) => match config.validate() {
                Ok(()) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Rejected configuration from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default asset location
    pub fn load() -> Self {
        Self::load_from_file("assets/voice_config.json")
    }

    /// Check that every value is usable by the engine
    pub fn validate(&self) -> Result<(), AudioError> {
        let invalid = |reason: String| Err(AudioError::InvalidConfig { reason });

        if !self.analyzer.fft_size.is_power_of_two() || self.analyzer.fft_size < 32 {
            return invalid(format!(
                "fft_size must be a power of two >= 32, got {}",
                self.analyzer.fft_size
            ));
        }
        if !(0.0..1.0).contains(&self.analyzer.smoothing) {
            return invalid(format!(
                "smoothing must be in [0, 1), got {}",
                self.analyzer.smoothing
            ));
        }
        if self.analyzer.min_decibels >= self.analyzer.max_decibels {
            return invalid(format!(
                "min_decibels ({}) must be below max_decibels ({})",
                self.analyzer.min_decibels, self.analyzer.max_decibels
            ));
        }
        if self.analyzer.ring_capacity < self.analyzer.fft_size {
            return invalid(format!(
                "ring_capacity ({}) must hold at least one fft window ({})",
                self.analyzer.ring_capacity, self.analyzer.fft_size
            ));
        }
        if self.calibration.readings_per_sample == 0 {
            return invalid("readings_per_sample must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.calibration.volume_threshold) {
            return invalid(format!(
                "volume_threshold must be in [0, 1], got {}",
                self.calibration.volume_threshold
            ));
        }
        for (participant, range) in [
            (Participant::Shark, self.matching.shark_range),
            (Participant::Seal, self.matching.seal_range),
        ] {
            if range.min_hz < 0.0 || range.min_hz > range.max_hz {
                return invalid(format!(
                    "{} range {}..{} Hz is empty or negative",
                    participant, range.min_hz, range.max_hz
                ));
            }
        }
        Ok(())
    }
}
