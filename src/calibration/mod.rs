// Calibration module - voice profile capture workflow
//
// This module provides two main components:
// 1. CalibrationEngine: Gates and collects samples for one participant
// 2. Profile: The stored result used by the matcher
//
// The calibration workflow:
// 1. Start a session for a participant
// 2. Poll capture_sample until enough samples are accepted (default 5)
// 3. Finish to turn the samples into a Profile

pub mod procedure;
pub mod state;

pub use procedure::{CalibrationEngine, CalibrationProgress};
pub use state::Profile;
