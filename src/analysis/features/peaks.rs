// Peaks module - Peak and formant picking on magnitude spectra
//
// Both detectors are deliberately simple noise filters rather than full
// peak-picking algorithms: a bin counts when it is strictly greater than both
// neighbours and above a fixed magnitude floor. Tests rely on this exact rule.

/// Minimum magnitude (byte scale) for a peak or formant
pub const MAGNITUDE_FLOOR: f32 = 50.0;

/// Maximum number of peaks reported
pub const MAX_PEAKS: usize = 3;

/// Maximum number of formants reported
pub const MAX_FORMANTS: usize = 3;

/// Formants are only searched below this bin
pub const FORMANT_SEARCH_BINS: usize = 4000;

/// Bins skipped after an accepted formant so one resonance is not found twice
pub const FORMANT_SKIP_BINS: usize = 10;

/// Half-width of the moving average used before formant picking (5 points)
const SMOOTHING_RADIUS: usize = 2;

#[inline]
fn is_strict_local_max(bins: &[f32], i: usize) -> bool {
    bins[i] > bins[i - 1] && bins[i] > bins[i + 1]
}

/// Find up to 3 peak bins, earliest first
pub fn find_peaks(bins: &[f32]) -> Vec<usize> {
    if bins.len() < 3 {
        return Vec::new();
    }

    (1..bins.len() - 1)
        .filter(|&i| bins[i] > MAGNITUDE_FLOOR && is_strict_local_max(bins, i))
        .take(MAX_PEAKS)
        .collect()
}

/// 5-point moving average; edge bins average over the neighbours they have
pub fn smooth(bins: &[f32]) -> Vec<f32> {
    (0..bins.len())
        .map(|i| {
            let start = i.saturating_sub(SMOOTHING_RADIUS);
            let end = (i + SMOOTHING_RADIUS + 1).min(bins.len());
            let window = &bins[start..end];
            window.iter().sum::<f32>() / window.len() as f32
        })
        .collect()
}

/// Find up to 3 formant bins in the smoothed spectrum
///
/// Only the first 4000 bins are searched. After a formant is accepted the
/// next 10 bins are skipped.
pub fn find_formants(bins: &[f32]) -> Vec<usize> {
    let smoothed = smooth(bins);
    let limit = smoothed.len().min(FORMANT_SEARCH_BINS + 1);
    if limit < 3 {
        return Vec::new();
    }

    let mut formants = Vec::with_capacity(MAX_FORMANTS);
    let mut i = 1;
    while i < limit - 1 && formants.len() < MAX_FORMANTS {
        if smoothed[i] > MAGNITUDE_FLOOR && is_strict_local_max(&smoothed, i) {
            formants.push(i);
            i += FORMANT_SKIP_BINS + 1;
        } else {
            i += 1;
        }
    }

    formants
}
