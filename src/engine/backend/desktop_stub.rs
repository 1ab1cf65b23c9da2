use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::audio::{ScriptedFeed, ScriptedSpectrumSource, SpectrumSource};
use crate::error::AudioError;
use crate::participant::Participant;

use super::SpectrumBackend;

/// Scripted backend used for deterministic testing and CLI tooling.
///
/// Every participant has a [`ScriptedFeed`]; sources opened for that
/// participant replay its frames. Opening can be made to fail to exercise
/// the capture-unavailable path.
pub struct ScriptedBackend {
    feeds: HashMap<Participant, ScriptedFeed>,
    sample_rate: u32,
    bin_count: usize,
    unavailable: Mutex<Option<String>>,
    opens: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(sample_rate: u32, bin_count: usize) -> Self {
        Self {
            feeds: Participant::ALL
                .into_iter()
                .map(|p| (p, ScriptedFeed::new()))
                .collect(),
            sample_rate,
            bin_count,
            unavailable: Mutex::new(None),
            opens: AtomicUsize::new(0),
        }
    }

    /// Feed driving the given participant's sources
    pub fn feed(&self, participant: Participant) -> ScriptedFeed {
        self.feeds
            .get(&participant)
            .cloned()
            .unwrap_or_default()
    }

    /// Make every following `open` fail (`Some`) or succeed again (`None`)
    pub fn set_unavailable(&self, reason: Option<&str>) {
        if let Ok(mut unavailable) = self.unavailable.lock() {
            *unavailable = reason.map(str::to_string);
        }
    }

    /// Number of successful opens so far
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn bin_count(&self) -> usize {
        self.bin_count
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new(48_000, 1024)
    }
}

impl SpectrumBackend for ScriptedBackend {
    fn open(&self, participant: Participant) -> Result<Box<dyn SpectrumSource>, AudioError> {
        let unavailable = self
            .unavailable
            .lock()
            .map_err(|_| AudioError::LockPoisoned {
                component: "scripted_backend".to_string(),
            })?
            .clone();
        if let Some(reason) = unavailable {
            return Err(AudioError::CaptureUnavailable { reason });
        }

        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSpectrumSource::new(
            self.feed(participant),
            self.sample_rate,
            self.bin_count,
        )))
    }
}
