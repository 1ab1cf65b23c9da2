// Analyzer module - time domain samples to byte-scale magnitude spectra
//
// Each live source owns one SpectrumAnalyzer. A frame is computed as:
//
// 1. Take the most recent fft_size samples (zero-padded at the front if
//    fewer have arrived)
// 2. Apply a Blackman window
// 3. FFT, magnitude |X[k]| / fft_size for the first fft_size / 2 bins
// 4. Exponential smoothing against the previous frame:
//    s[k] = τ·s_prev[k] + (1 - τ)·|X[k]|
// 5. Convert to dB and map [min_decibels, max_decibels] onto [0, 255]
//
// The smoothing state is per-analyzer, so two participants never blend
// into each other's spectra.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::analysis::features::{SpectralBins, MAX_MAGNITUDE};
use crate::config::AnalyzerConfig;

/// Blackman window coefficients (alpha = 0.16)
const BLACKMAN_A0: f32 = 0.42;
const BLACKMAN_A1: f32 = 0.5;
const BLACKMAN_A2: f32 = 0.08;

/// Stateful FFT analyzer with frame-to-frame smoothing
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    /// Blackman window (pre-computed)
    window: Vec<f32>,
    /// Scratch buffer reused across frames
    buffer: Vec<Complex<f32>>,
    /// Smoothed linear magnitudes from the previous frame
    smoothed: Vec<f32>,
    smoothing: f32,
    min_decibels: f32,
    max_decibels: f32,
}

impl SpectrumAnalyzer {
    /// Create an analyzer for the given configuration
    ///
    /// The configuration is expected to have passed `EngineConfig::validate`.
    pub fn new(config: &AnalyzerConfig) -> Self {
        let fft_size = config.fft_size;
        let fft = FftPlanner::new().plan_fft_forward(fft_size);

        let window = (0..fft_size)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / fft_size as f32;
                BLACKMAN_A0 - BLACKMAN_A1 * phase.cos() + BLACKMAN_A2 * (2.0 * phase).cos()
            })
            .collect();

        Self {
            fft,
            fft_size,
            window,
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            smoothed: vec![0.0; fft_size / 2],
            smoothing: config.smoothing,
            min_decibels: config.min_decibels,
            max_decibels: config.max_decibels,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of bins per frame (half the FFT size)
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Compute one spectrum frame from the most recent samples
    ///
    /// # Arguments
    /// * `samples` - Mono samples, oldest first; only the last fft_size are used
    pub fn process(&mut self, samples: &[f32]) -> SpectralBins {
        let recent = &samples[samples.len().saturating_sub(self.fft_size)..];
        let pad = self.fft_size - recent.len();

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = if i < pad { 0.0 } else { recent[i - pad] };
            let value = if sample.is_finite() { sample } else { 0.0 };
            *slot = Complex::new(value * self.window[i], 0.0);
        }

        self.fft.process(&mut self.buffer);

        let scale = 1.0 / self.fft_size as f32;
        let range = self.max_decibels - self.min_decibels;
        let mut magnitudes = Vec::with_capacity(self.bin_count());

        for (k, prev) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.buffer[k].norm() * scale;
            *prev = self.smoothing * *prev + (1.0 - self.smoothing) * magnitude;

            let byte = if *prev > 0.0 {
                let db = 20.0 * prev.log10();
                MAX_MAGNITUDE * (db - self.min_decibels) / range
            } else {
                0.0
            };
            magnitudes.push(byte.floor());
        }

        tracing::trace!(bins = magnitudes.len(), "spectrum frame");

        // SpectralBins::new clamps into [0, 255]
        SpectralBins::new(magnitudes)
    }

    /// Forget the smoothing history
    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|s| *s = 0.0);
    }
}
