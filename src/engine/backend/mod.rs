//! Backend abstractions for the reusable engine core.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::audio::SpectrumSource;
use crate::error::AudioError;
use crate::participant::Participant;

/// Trait implemented by spectrum source providers.
///
/// A backend acquires one capture device per participant. The call may block
/// (device enumeration, permission prompts); the engine runs it on tokio's
/// blocking pool.
pub trait SpectrumBackend: Send + Sync {
    fn open(&self, participant: Participant) -> Result<Box<dyn SpectrumSource>, AudioError>;
}

/// Trait representing a monotonic time source used for calibration debounce.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Instant;
}

/// Default time source backed by `Instant::now`.
#[derive(Default)]
pub struct SystemTimeSource {
    _unit: (),
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Time source that only moves when told to.
///
/// Lets tests step past (or stay inside) the calibration debounce window
/// without sleeping.
pub struct ManualTimeSource {
    start: Instant,
    offset: Mutex<Duration>,
}

impl ManualTimeSource {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut offset) = self.offset.lock() {
            *offset += by;
        }
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Default for ManualTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Instant {
        let offset = self.offset.lock().map(|o| *o).unwrap_or_default();
        self.start + offset
    }
}

#[cfg(not(target_os = "android"))]
mod cpal;
#[cfg(not(target_os = "android"))]
pub use cpal::CpalBackend;

mod desktop_stub;
pub use desktop_stub::ScriptedBackend;
