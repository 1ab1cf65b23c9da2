// CalibrationEngine - gated sample collection for one participant at a time
//
// The engine moves between two states:
// - Idle: no session; capture_sample returns None
// - Capturing: a session for one participant accumulates accepted samples
//
// A capture is accepted only when the live volume exceeds the gate and the
// previous accepted sample is at least min_sample_gap old. An accepted capture
// averages several readings spread over a short window, so a single noisy
// frame does not define a profile. finish turns the samples into a Profile
// and always ends the session.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::analysis::features::SpectralBins;
use crate::audio::SpectrumSource;
use crate::calibration::state::Profile;
use crate::config::CalibrationConfig;
use crate::engine::backend::TimeSource;
use crate::error::CalibrationError;
use crate::participant::Participant;

/// Progress information for the active calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CalibrationProgress {
    /// Participant being calibrated
    pub participant: Participant,
    /// Accepted samples so far
    pub samples_collected: usize,
    /// Samples the caller should gather before finishing
    pub samples_needed: usize,
}

impl CalibrationProgress {
    pub fn is_complete(&self) -> bool {
        self.samples_collected >= self.samples_needed
    }
}

/// Transient state of one calibration run
#[derive(Debug)]
struct CalibrationSession {
    /// Distinguishes restarts for the same participant
    generation: u64,
    participant: Participant,
    samples: Vec<SpectralBins>,
    last_accepted: Option<Instant>,
}

/// Holds the recording flag for the duration of one accepted capture
///
/// Dropping the guard clears the flag, so an abandoned capture future never
/// blocks later captures.
struct RecordingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RecordingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RecordingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// CalibrationEngine manages the sample collection workflow
pub struct CalibrationEngine {
    config: CalibrationConfig,
    time: Arc<dyn TimeSource>,
    session: Mutex<Option<CalibrationSession>>,
    /// Held only through `RecordingGuard`
    recording: AtomicBool,
    next_generation: AtomicU64,
}

impl CalibrationEngine {
    /// Create a new calibration engine
    ///
    /// # Arguments
    /// * `config` - Volume gate, debounce and reading parameters
    /// * `time` - Clock used for the debounce window
    pub fn new(config: CalibrationConfig, time: Arc<dyn TimeSource>) -> Self {
        Self {
            config,
            time,
            session: Mutex::new(None),
            recording: AtomicBool::new(false),
            next_generation: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    fn lock_session(&self) -> Result<MutexGuard<'_, Option<CalibrationSession>>, CalibrationError> {
        self.session.lock().map_err(|_| CalibrationError::StatePoisoned)
    }

    /// Begin calibrating `participant`, discarding any previous session
    pub fn start(&self, participant: Participant) -> Result<(), CalibrationError> {
        let mut session = self.lock_session()?;
        if let Some(previous) = session.as_ref() {
            log::warn!(
                "[Calibration] Restarting: discarding {} samples for {}",
                previous.samples.len(),
                previous.participant
            );
        }
        *session = Some(CalibrationSession {
            generation: self.next_generation.fetch_add(1, Ordering::Relaxed),
            participant,
            samples: Vec::new(),
            last_accepted: None,
        });

        log::info!("[Calibration] Started for {}", participant);
        Ok(())
    }

    /// Begin calibrating unless a session is already active
    ///
    /// # Errors
    /// `AlreadyInProgress` naming the participant currently being calibrated
    pub fn try_start(&self, participant: Participant) -> Result<(), CalibrationError> {
        {
            let session = self.lock_session()?;
            if let Some(active) = session.as_ref() {
                return Err(CalibrationError::AlreadyInProgress {
                    participant: active.participant,
                });
            }
        }
        self.start(participant)
    }

    /// Try to capture one calibration sample from `source`
    ///
    /// # Returns
    /// * `Ok(Some(sample))` - Sample accepted and stored
    /// * `Ok(None)` - Idle, already recording, too quiet, or inside the
    ///   debounce window; state is unchanged
    pub async fn capture_sample(
        &self,
        source: &dyn SpectrumSource,
    ) -> Result<Option<SpectralBins>, CalibrationError> {
        if self.recording.load(Ordering::Acquire) {
            return Ok(None);
        }

        let (generation, participant, last_accepted) = {
            let session = self.lock_session()?;
            match session.as_ref() {
                Some(s) => (s.generation, s.participant, s.last_accepted),
                None => return Ok(None),
            }
        };

        let volume = source.read().volume();
        if volume <= self.config.volume_threshold {
            return Ok(None);
        }

        let gap = Duration::from_millis(self.config.min_sample_gap_ms);
        if let Some(last) = last_accepted {
            if self.time.now().saturating_duration_since(last) <= gap {
                return Ok(None);
            }
        }

        let Some(_guard) = RecordingGuard::acquire(&self.recording) else {
            return Ok(None);
        };

        let sample = self.take_readings(source).await;

        let mut session = self.lock_session()?;
        match session.as_mut() {
            Some(s) if s.generation == generation => {
                s.samples.push(sample.clone());
                s.last_accepted = Some(self.time.now());
                log::info!(
                    "[Calibration] Accepted sample {} for {} (volume {:.3})",
                    s.samples.len(),
                    participant,
                    volume
                );
                Ok(Some(sample))
            }
            _ => {
                log::debug!(
                    "[Calibration] Session for {} ended while recording; sample dropped",
                    participant
                );
                Ok(None)
            }
        }
    }

    /// Average `readings_per_sample` reads spread over the reading window
    async fn take_readings(&self, source: &dyn SpectrumSource) -> SpectralBins {
        let count = self.config.readings_per_sample.max(1);
        let spacing = Duration::from_millis(self.config.reading_window_ms) / count as u32;

        let mut readings = Vec::with_capacity(count);
        for i in 0..count {
            if i > 0 {
                tokio::time::sleep(spacing).await;
            }
            readings.push(source.read());
        }

        SpectralBins::average(&readings)
    }

    /// End calibration and build the participant's profile
    ///
    /// The session is destroyed whatever the outcome.
    ///
    /// # Errors
    /// * `NotInProgress` - No session is active
    /// * `ParticipantMismatch` - The session belongs to another participant
    /// * `NoSamplesCollected` - The session accepted no samples
    pub fn finish(&self, participant: Participant) -> Result<Profile, CalibrationError> {
        let session = self
            .lock_session()?
            .take()
            .ok_or(CalibrationError::NotInProgress)?;

        if session.participant != participant {
            return Err(CalibrationError::ParticipantMismatch {
                expected: session.participant,
                actual: participant,
            });
        }

        let count = session.samples.len();
        let profile = Profile::from_samples(participant, session.samples)
            .ok_or(CalibrationError::NoSamplesCollected { participant })?;

        log::info!(
            "[Calibration] Finished for {} with {} samples (centroid {:.1}, peaks {:?})",
            participant,
            count,
            profile.characteristics.spectral_centroid,
            profile.characteristics.peak_frequencies
        );
        Ok(profile)
    }

    /// Discard the active session, if any
    ///
    /// # Returns
    /// The participant whose calibration was cancelled
    pub fn cancel(&self) -> Result<Option<Participant>, CalibrationError> {
        let cancelled = self.lock_session()?.take().map(|s| s.participant);
        if let Some(participant) = cancelled {
            log::info!("[Calibration] Cancelled for {}", participant);
        }
        Ok(cancelled)
    }

    /// Progress of the active session, or `None` when idle
    pub fn progress(&self) -> Result<Option<CalibrationProgress>, CalibrationError> {
        Ok(self.lock_session()?.as_ref().map(|s| CalibrationProgress {
            participant: s.participant,
            samples_collected: s.samples.len(),
            samples_needed: self.config.samples_needed,
        }))
    }

    /// Participant currently being calibrated
    pub fn active_participant(&self) -> Result<Option<Participant>, CalibrationError> {
        Ok(self.lock_session()?.as_ref().map(|s| s.participant))
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::Acquire)
    }

    /// Poison the session lock, as a panic inside a locked section would
    #[cfg(test)]
    pub(crate) fn poison_session(&self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _session = self.session.lock();
            panic!("poisoning calibration session");
        }));
    }
}

#[cfg(test)]
#[path = "procedure_tests.rs"]
mod tests;
