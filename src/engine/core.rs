//! VoiceEngine: orchestration layer for the shark vs. seal voice duel.
//!
//! The engine wires a spectrum backend, the session registry, the
//! calibration engine and the matcher behind one `&self` API that a game
//! loop can poll every tick. It also owns the single global calibration
//! slot: only one participant can be calibrated at a time.
//!
//! Locks are only ever held for short synchronous sections. The two
//! asynchronous operations (`open` and `capture_sample`) clone what they
//! need out of the registry before awaiting.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::analysis::band_energy::{band_energy, BandReading};
use crate::analysis::features::SpectralBins;
use crate::analysis::matcher::{MatchFeedback, Matcher};
use crate::audio::SpectrumReading;
use crate::calibration::{CalibrationEngine, CalibrationProgress, Profile};
use crate::config::{EngineConfig, FrequencyRange};
use crate::engine::backend::{ScriptedBackend, SpectrumBackend, SystemTimeSource, TimeSource};
#[cfg(not(target_os = "android"))]
use crate::engine::backend::CpalBackend;
use crate::error::{log_audio_error, log_calibration_error, AudioError, CalibrationError};
use crate::managers::SessionRegistry;
use crate::participant::Participant;

/// Sample rate assumed for participants without an open source.
const FALLBACK_SAMPLE_RATE: u32 = 48_000;

/// VoiceEngine orchestrates capture, calibration and matching.
pub struct VoiceEngine {
    config: EngineConfig,
    backend: Arc<dyn SpectrumBackend>,
    registry: SessionRegistry,
    calibration: CalibrationEngine,
    matcher: Matcher,
    progress_tx: broadcast::Sender<CalibrationProgress>,
}

impl VoiceEngine {
    /// Create a VoiceEngine with platform defaults.
    ///
    /// Loads `assets/voice_config.json` (falling back to defaults) and uses
    /// the live microphone backend.
    pub fn new() -> Self {
        let config = EngineConfig::load();
        let backend = Self::create_backend(&config);
        Self::with_backend(config, backend, Arc::new(SystemTimeSource::default()))
    }

    /// Create a VoiceEngine with an explicit backend and clock.
    pub fn with_backend(
        config: EngineConfig,
        backend: Arc<dyn SpectrumBackend>,
        time_source: Arc<dyn TimeSource>,
    ) -> Self {
        let calibration = CalibrationEngine::new(config.calibration.clone(), time_source);
        let matcher = Matcher::new(config.matching.clone(), config.calibration.volume_threshold);
        let (progress_tx, _) = broadcast::channel(32);

        Self {
            config,
            backend,
            registry: SessionRegistry::new(),
            calibration,
            matcher,
            progress_tx,
        }
    }

    /// Engine driven by scripted frames instead of a microphone.
    ///
    /// Pass a `ManualTimeSource` to step the sample debounce by hand.
    pub fn scripted(
        config: EngineConfig,
        backend: Arc<ScriptedBackend>,
        time_source: Arc<dyn TimeSource>,
    ) -> Self {
        Self::with_backend(config, backend, time_source)
    }

    #[cfg(not(target_os = "android"))]
    fn create_backend(config: &EngineConfig) -> Arc<dyn SpectrumBackend> {
        Arc::new(CpalBackend::new(config.analyzer.clone()))
    }

    #[cfg(target_os = "android")]
    fn create_backend(config: &EngineConfig) -> Arc<dyn SpectrumBackend> {
        log::warn!("[VoiceEngine] No live capture on this platform; using scripted backend");
        Arc::new(ScriptedBackend::new(
            FALLBACK_SAMPLE_RATE,
            config.analyzer.bin_count(),
        ))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ====================================================================
    // CAPTURE
    // ====================================================================

    /// Begin listening for a participant.
    ///
    /// Device acquisition runs on tokio's blocking pool; the caller is
    /// suspended until the device is ready or has failed.
    ///
    /// # Errors
    /// - `AlreadyOpen` if the participant is already listening
    /// - `CaptureUnavailable` if the device could not be acquired
    pub async fn open(&self, participant: Participant) -> Result<(), AudioError> {
        if self.registry.is_open(participant)? {
            let err = AudioError::AlreadyOpen { participant };
            log_audio_error(&err, "open");
            return Err(err);
        }

        let backend = Arc::clone(&self.backend);
        let source = tokio::task::spawn_blocking(move || backend.open(participant))
            .await
            .map_err(|e| AudioError::CaptureUnavailable {
                reason: format!("Device open task failed: {}", e),
            })?
            .inspect_err(|err| log_audio_error(err, "open"))?;

        self.registry.register(participant, source)
    }

    /// Stop listening for a participant. The stored profile is kept.
    pub fn close(&self, participant: Participant) -> Result<(), AudioError> {
        self.registry.close(participant)?;
        Ok(())
    }

    pub fn is_open(&self, participant: Participant) -> Result<bool, AudioError> {
        self.registry.is_open(participant)
    }

    /// Current spectrum and volume for a participant.
    pub fn read(&self, participant: Participant) -> Result<SpectrumReading, AudioError> {
        let source = self.registry.source(participant)?;
        Ok(SpectrumReading::new(source.read()))
    }

    /// Sample rate of a participant's device.
    pub fn sample_rate(&self, participant: Participant) -> Result<u32, AudioError> {
        Ok(self.registry.source(participant)?.sample_rate())
    }

    /// Band assigned to each participant, for colouring a visualizer.
    pub fn frequency_ranges(&self) -> [(Participant, FrequencyRange); 2] {
        Participant::ALL.map(|p| (p, self.config.matching.range_for(p)))
    }

    // ====================================================================
    // CALIBRATION
    // ====================================================================

    /// Start calibrating a participant.
    ///
    /// # Errors
    /// - `Audio(NotOpen)` if the participant is not listening
    /// - `AlreadyInProgress` if any participant is being calibrated
    pub fn start_calibration(&self, participant: Participant) -> Result<(), CalibrationError> {
        if !self.registry.is_open(participant)? {
            let err = CalibrationError::from(AudioError::NotOpen { participant });
            log_calibration_error(&err, "start_calibration");
            return Err(err);
        }

        self.calibration
            .try_start(participant)
            .inspect_err(|err| log_calibration_error(err, "start_calibration"))?;

        self.publish_progress()
    }

    /// Try to capture one sample for the participant being calibrated.
    ///
    /// Intended to be polled at `calibration.capture_interval_ms`.
    ///
    /// # Returns
    /// The accepted sample, or `None` when idle, quiet, debounced or busy
    pub async fn capture_sample(&self) -> Result<Option<SpectralBins>, CalibrationError> {
        let Some(participant) = self.calibration.active_participant()? else {
            return Ok(None);
        };
        let source = self.registry.source(participant)?;

        let sample = self.calibration.capture_sample(source.as_ref()).await?;
        if sample.is_some() {
            self.publish_progress()?;
        }
        Ok(sample)
    }

    /// Finish calibration and store the participant's profile.
    ///
    /// The calibration session ends whatever the outcome. On failure any
    /// previously stored profile is left untouched.
    pub fn finish_calibration(&self, participant: Participant) -> Result<Profile, CalibrationError> {
        let profile = self
            .calibration
            .finish(participant)
            .inspect_err(|err| log_calibration_error(err, "finish_calibration"))?;

        self.registry.store_profile(profile.clone())?;
        Ok(profile)
    }

    /// Abandon the active calibration, if any.
    pub fn cancel_calibration(&self) -> Result<Option<Participant>, CalibrationError> {
        self.calibration.cancel()
    }

    pub fn calibration_progress(&self) -> Result<Option<CalibrationProgress>, CalibrationError> {
        self.calibration.progress()
    }

    /// Receive a progress update on start and after every accepted sample.
    pub fn subscribe_calibration_progress(&self) -> broadcast::Receiver<CalibrationProgress> {
        self.progress_tx.subscribe()
    }

    fn publish_progress(&self) -> Result<(), CalibrationError> {
        if let Some(progress) = self.calibration.progress()? {
            // No subscribers is fine
            let _ = self.progress_tx.send(progress);
        }
        Ok(())
    }

    /// Install a synthetic profile so the game can skip calibration.
    pub fn set_dummy_profile(&self, participant: Participant) -> Result<(), AudioError> {
        let (bin_count, sample_rate) = match self.registry.source(participant) {
            Ok(source) => (source.bin_count(), source.sample_rate()),
            Err(_) => (self.config.analyzer.bin_count(), FALLBACK_SAMPLE_RATE),
        };

        log::warn!("[VoiceEngine] Using dummy profile for {}", participant);
        self.registry.store_profile(Profile::dummy(
            participant,
            self.config.matching.range_for(participant),
            bin_count,
            sample_rate,
        ))
    }

    pub fn is_calibrated(&self, participant: Participant) -> Result<bool, AudioError> {
        self.registry.has_profile(participant)
    }

    /// Whether every participant has a profile (gates starting the game).
    pub fn all_calibrated(&self) -> Result<bool, AudioError> {
        for participant in Participant::ALL {
            if !self.registry.has_profile(participant)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn profile(&self, participant: Participant) -> Result<Option<Profile>, AudioError> {
        self.registry.profile(participant)
    }

    // ====================================================================
    // MATCHING
    // ====================================================================

    /// Similarity in [0, 1] of the participant's live sound to their profile.
    ///
    /// A participant without a profile scores 0.
    pub fn match_score(&self, participant: Participant) -> Result<f32, AudioError> {
        let source = self.registry.source(participant)?;
        let Some(profile) = self.registry.profile(participant)? else {
            return Ok(0.0);
        };

        Ok(self.matcher.score(&source.read(), &profile.characteristics))
    }

    /// Feedback level for the participant's current match score.
    pub fn match_feedback(&self, participant: Participant) -> Result<MatchFeedback, AudioError> {
        let score = self.match_score(participant)?;
        Ok(self.matcher.feedback(score))
    }

    /// Normalized energy in the participant's own band, from their source.
    pub fn band_energy(&self, participant: Participant) -> Result<f32, AudioError> {
        let source = self.registry.source(participant)?;
        Ok(band_energy(
            &source.read(),
            self.config.matching.range_for(participant),
            source.sample_rate(),
        ))
    }

    /// Band energies of both participants and whether they overlap.
    ///
    /// A participant without an open source contributes zero energy.
    pub fn simultaneous(&self) -> Result<BandReading, AudioError> {
        let energy = |participant: Participant| match self.band_energy(participant) {
            Ok(energy) => Ok(energy),
            Err(AudioError::NotOpen { .. }) => Ok(0.0),
            Err(err) => Err(err),
        };

        Ok(BandReading::new(
            energy(Participant::Shark)?,
            energy(Participant::Seal)?,
            &self.config.matching,
        ))
    }

    // ====================================================================
    // CLEANUP
    // ====================================================================

    /// Release a participant's source and forget their profile.
    ///
    /// Also cancels the participant's calibration if it is running.
    ///
    /// The source is released even when the calibration state is poisoned;
    /// that failure is reported afterwards.
    pub fn cleanup(&self, participant: Participant) -> Result<(), AudioError> {
        let cancelled = self
            .calibration
            .active_participant()
            .and_then(|active| match active {
                Some(active) if active == participant => self.calibration.cancel().map(|_| ()),
                _ => Ok(()),
            })
            .map_err(|err| calibration_failure(err, "cleanup"));

        self.registry.cleanup(participant)?;
        cancelled
    }

    /// Release everything.
    pub fn cleanup_all(&self) -> Result<(), AudioError> {
        let cancelled = self
            .calibration
            .cancel()
            .map(|_| ())
            .map_err(|err| calibration_failure(err, "cleanup_all"));

        self.registry.cleanup_all()?;
        cancelled
    }
}

/// Log a calibration failure hit during cleanup and report it as an audio error.
fn calibration_failure(err: CalibrationError, context: &str) -> AudioError {
    log_calibration_error(&err, context);
    match err {
        CalibrationError::Audio(audio) => audio,
        _ => AudioError::LockPoisoned {
            component: "calibration_session".to_string(),
        },
    }
}

impl Default for VoiceEngine {
    fn default() -> Self {
        Self::new()
    }
}
