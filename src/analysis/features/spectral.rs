// Spectral module - Scalar features of one magnitude spectrum
//
// All features here work in the bin-index domain: the input is the byte-scale
// spectrum a source already produced, not time-domain audio. Every function is
// total; a silent spectrum yields zeros instead of dividing by zero.

/// Spectral rolloff threshold (85% of spectral energy)
pub const ROLLOFF_THRESHOLD: f32 = 0.85;

/// Mean magnitude across all bins
pub fn average_energy(bins: &[f32]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    bins.iter().sum::<f32>() / bins.len() as f32
}

/// Compute spectral centroid (energy-weighted mean bin index)
///
/// Formula: centroid = Σ(i × |X[i]|) / Σ|X[i]|
///
/// Returns 0 when the spectrum carries no energy.
pub fn centroid(bins: &[f32]) -> f32 {
    let weighted_sum: f32 = bins
        .iter()
        .enumerate()
        .map(|(i, &mag)| i as f32 * mag)
        .sum();
    let magnitude_sum: f32 = bins.iter().sum();

    if magnitude_sum > 0.0 {
        weighted_sum / magnitude_sum
    } else {
        0.0
    }
}

/// Compute spectral rolloff with the standard 85% threshold
pub fn rolloff(bins: &[f32]) -> usize {
    rolloff_at(bins, ROLLOFF_THRESHOLD)
}

/// Smallest bin index at which cumulative energy reaches `threshold` of total
///
/// Bins are scanned in increasing index order. A silent spectrum has rolloff 0.
/// If rounding keeps the cumulative sum just short of the target, the last bin
/// is returned.
pub fn rolloff_at(bins: &[f32], threshold: f32) -> usize {
    let total_energy: f32 = bins.iter().sum();
    if total_energy <= 0.0 {
        return 0;
    }

    let target = threshold * total_energy;
    let mut cumulative = 0.0;
    for (i, &mag) in bins.iter().enumerate() {
        cumulative += mag;
        if cumulative >= target {
            return i;
        }
    }

    bins.len() - 1
}

/// Fraction of adjacent bins whose deviation from the mean changes sign
///
/// Normalized by the spectrum length. A bin exactly at the mean counts as
/// non-negative, so a flat spectrum has rate 0.
pub fn zero_crossing_rate(bins: &[f32]) -> f32 {
    if bins.len() < 2 {
        return 0.0;
    }

    let mean = average_energy(bins);
    let crossings = bins
        .windows(2)
        .filter(|pair| (pair[0] - mean >= 0.0) != (pair[1] - mean >= 0.0))
        .count();

    crossings as f32 / bins.len() as f32
}
