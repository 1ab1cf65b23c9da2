//! Fixture utilities for deterministic tests and the CLI harness.
//!
//! Two kinds of fixtures live here:
//! - synthetic spectra (voiced resonances, filled bands, seeded noise) that
//!   stand in for microphone frames in tests and the scripted backend;
//! - WAV loading plus an offline analysis pass that runs the live analyzer
//!   and feature extractor over a recording.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;

use crate::analysis::features::{self, FrequencyCharacteristics, SpectralBins};
use crate::audio::SpectrumAnalyzer;
use crate::config::{AnalyzerConfig, FrequencyRange};

/// Engine-facing sample rate used by synthetic fixtures.
pub const FIXTURE_SAMPLE_RATE: u32 = 48_000;

/// Half-width in bins of a synthetic resonance hump.
const HUMP_RADIUS: usize = 4;

/// Spectrum with resonance humps centred on `centers` over a flat floor.
///
/// Humps fall off linearly from 250 at the centre, so each centre is a
/// strict local maximum and survives the formant smoother.
pub fn resonant_spectrum(bin_count: usize, centers: &[usize], floor: f32) -> SpectralBins {
    let mut magnitudes = vec![floor; bin_count];
    for &center in centers {
        for distance in 0..=HUMP_RADIUS {
            let value = 250.0 - distance as f32 * 30.0;
            for idx in [center.saturating_sub(distance), center + distance] {
                if idx < bin_count {
                    magnitudes[idx] = magnitudes[idx].max(value);
                }
            }
        }
    }
    SpectralBins::new(magnitudes)
}

/// Bin index of a frequency, using the band-energy mapping.
pub fn bin_for_hz(hz: f32, bin_count: usize, sample_rate: u32) -> usize {
    let nyquist = sample_rate as f32 / 2.0;
    ((hz / nyquist * bin_count as f32).floor() as usize).min(bin_count.saturating_sub(1))
}

/// Voiced spectrum whose resonances sit inside `range`.
///
/// Three humps at 25%, 50% and 75% of the range, over a floor loud enough
/// to clear the default calibration volume gate.
pub fn voice_in_range(range: FrequencyRange, bin_count: usize, sample_rate: u32) -> SpectralBins {
    let span = range.max_hz - range.min_hz;
    let centers: Vec<usize> = [0.25f32, 0.5, 0.75]
        .iter()
        .map(|f| bin_for_hz(range.min_hz + span * f, bin_count, sample_rate))
        .collect();
    resonant_spectrum(bin_count, &centers, 80.0)
}

/// Spectrum with every bin of each range set to `level`, silence elsewhere.
pub fn band_spectrum(
    ranges: &[FrequencyRange],
    bin_count: usize,
    sample_rate: u32,
    level: u8,
) -> SpectralBins {
    let mut bytes = vec![0u8; bin_count];
    for range in ranges {
        let start = bin_for_hz(range.min_hz, bin_count, sample_rate);
        let end = bin_for_hz(range.max_hz, bin_count, sample_rate);
        for b in bytes.iter_mut().take(end + 1).skip(start) {
            *b = level;
        }
    }
    SpectralBins::from_bytes(&bytes)
}

/// Seeded uniform noise in [0, max).
pub fn noise_spectrum(bin_count: usize, max: f32, seed: u64) -> SpectralBins {
    let mut rng = StdRng::seed_from_u64(seed);
    SpectralBins::new((0..bin_count).map(|_| rng.gen_range(0.0..max)).collect())
}

/// Pure sine wave, for analyzer and WAV fixtures.
pub fn sine_wave(freq_hz: f32, sample_rate: u32, len: usize, amplitude: f32) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            amplitude * (2.0 * std::f32::consts::PI * freq_hz * t).sin()
        })
        .collect()
}

/// Result of running the analyzer over a recording.
#[derive(Debug, Clone, Serialize)]
pub struct WavAnalysis {
    pub sample_rate: u32,
    pub frames: usize,
    /// Loudest frame's normalized volume
    pub peak_volume: f32,
    /// Features of the bin-wise average of all frames
    pub characteristics: FrequencyCharacteristics,
    /// Average spectrum itself, as bytes
    #[serde(skip)]
    pub average: SpectralBins,
}

/// Analyze mono samples in hops of half an FFT window.
pub fn analyze_samples(samples: &[f32], sample_rate: u32, config: &AnalyzerConfig) -> WavAnalysis {
    let mut analyzer = SpectrumAnalyzer::new(config);
    let hop = (config.fft_size / 2).max(1);

    let mut frames = Vec::new();
    let mut end = config.fft_size.min(samples.len());
    while end > 0 {
        frames.push(analyzer.process(&samples[..end]));
        if end == samples.len() {
            break;
        }
        end = (end + hop).min(samples.len());
    }

    let peak_volume = frames.iter().map(|f| f.volume()).fold(0.0, f32::max);
    let average = SpectralBins::average(&frames);

    WavAnalysis {
        sample_rate,
        frames: frames.len(),
        peak_volume,
        characteristics: features::extract_one(&average),
        average,
    }
}

/// Load a WAV file and analyze it.
pub fn analyze_wav(path: &Path, config: &AnalyzerConfig) -> Result<WavAnalysis> {
    let (samples, sample_rate) = read_wav(path)?;
    if samples.is_empty() {
        return Err(anyhow!("{} contains no samples", path.display()));
    }
    Ok(analyze_samples(&samples, sample_rate, config))
}

/// Decode a WAV file to mono f32 samples, keeping the first channel.
pub fn read_wav(path: &Path) -> Result<(Vec<f32>, u32)> {
    let mut reader =
        hound::WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;
    let sample_rate = spec.sample_rate;

    let interleaved = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|sample| sample.map_err(|err| anyhow!(err)))
            .collect::<Result<Vec<f32>>>()?,
        hound::SampleFormat::Int => {
            let max = ((1i64 << (spec.bits_per_sample - 1)) - 1) as f32;
            match spec.bits_per_sample {
                8 | 16 | 24 | 32 => reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|value| value as f32 / max).map_err(|err| anyhow!(err)))
                    .collect::<Result<Vec<f32>>>()?,
                other => {
                    return Err(anyhow!(
                        "Unsupported bits per sample {} in {}",
                        other,
                        path.display()
                    ))
                }
            }
        }
    };

    let samples = interleaved.into_iter().step_by(channels).collect();
    Ok((samples, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::band_energy::band_energy;
    use crate::config::MatchingConfig;

    #[test]
    fn test_resonant_spectrum_peaks_at_centers() {
        let bins = resonant_spectrum(256, &[20, 100, 200], 10.0);
        let features = features::extract_one(&bins);
        assert_eq!(features.peak_frequencies, vec![20, 100, 200]);
    }

    #[test]
    fn test_voice_in_range_lands_in_band() {
        let config = MatchingConfig::default();
        let shark = voice_in_range(config.shark_range, 1024, FIXTURE_SAMPLE_RATE);

        let in_band = band_energy(&shark, config.shark_range, FIXTURE_SAMPLE_RATE);
        let out_band = band_energy(&shark, config.seal_range, FIXTURE_SAMPLE_RATE);
        assert!(in_band > out_band);
        assert!(shark.volume() > 0.2);
    }

    #[test]
    fn test_noise_is_seeded() {
        assert_eq!(noise_spectrum(64, 255.0, 3), noise_spectrum(64, 255.0, 3));
        assert_ne!(noise_spectrum(64, 255.0, 3), noise_spectrum(64, 255.0, 4));
    }

    #[test]
    fn test_analyze_samples_finds_tone() {
        let config = AnalyzerConfig {
            smoothing: 0.0,
            ..AnalyzerConfig::default()
        };
        // 100 bins * 48000 / 2048 = 2343.75 Hz, well under clipping
        let samples = sine_wave(2343.75, FIXTURE_SAMPLE_RATE, 8192, 0.001);
        let analysis = analyze_samples(&samples, FIXTURE_SAMPLE_RATE, &config);

        assert!(analysis.frames >= 4);
        assert_eq!(analysis.average.len(), 1024);
        assert!(analysis.characteristics.peak_frequencies.contains(&100));
    }

    #[test]
    fn test_analyze_empty_samples() {
        let analysis = analyze_samples(&[], FIXTURE_SAMPLE_RATE, &AnalyzerConfig::default());
        assert_eq!(analysis.frames, 0);
        assert_eq!(analysis.characteristics, FrequencyCharacteristics::default());
    }
}
