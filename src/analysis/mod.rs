// Analysis module - spectral features and profile matching
//
// Everything here is pure and synchronous: it operates on SpectralBins
// snapshots that a spectrum source already produced.
//
// Pipeline:
// - features: SpectralBins → FrequencyCharacteristics
// - matcher: live SpectralBins × stored FrequencyCharacteristics → score
// - band_energy: SpectralBins → per-participant band energy

pub mod band_energy;
pub mod features;
pub mod matcher;

pub use band_energy::{band_energy, bin_range, BandReading};
pub use features::{extract, FrequencyCharacteristics, SpectralBins};
pub use matcher::{MatchFeedback, Matcher};
