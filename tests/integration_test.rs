//! Integration tests for the VoiceEngine public API
//!
//! These tests drive a whole duel through the scripted backend:
//! - Opening both participants and reading their spectra
//! - Calibrating both players and gating the game on it
//! - Live match scores for the right and the wrong voice
//! - Simultaneous band energy and cleanup
//!
//! Note: live microphone capture is exercised by the CLI, not here.

use std::sync::Arc;

use voice_duel::config::{CalibrationConfig, EngineConfig};
use voice_duel::engine::{ManualTimeSource, ScriptedBackend};
use voice_duel::error::{AudioError, ErrorCode};
use voice_duel::fixtures;
use voice_duel::{MatchFeedback, Participant, SpectralBins, VoiceEngine};

const SAMPLE_RATE: u32 = 48_000;
const BINS: usize = 1024;

fn setup() -> (VoiceEngine, Arc<ScriptedBackend>, Arc<ManualTimeSource>) {
    let config = EngineConfig {
        calibration: CalibrationConfig {
            reading_window_ms: 0,
            ..CalibrationConfig::default()
        },
        ..EngineConfig::default()
    };
    let backend = Arc::new(ScriptedBackend::new(SAMPLE_RATE, BINS));
    let time = Arc::new(ManualTimeSource::new());
    let engine = VoiceEngine::with_backend(config, backend.clone(), time.clone());
    (engine, backend, time)
}

fn voice(engine: &VoiceEngine, participant: Participant) -> SpectralBins {
    fixtures::voice_in_range(
        engine.config().matching.range_for(participant),
        BINS,
        SAMPLE_RATE,
    )
}

async fn calibrate(
    engine: &VoiceEngine,
    backend: &ScriptedBackend,
    time: &ManualTimeSource,
    participant: Participant,
) {
    backend.feed(participant).set(voice(engine, participant));
    engine.start_calibration(participant).unwrap();

    let needed = engine.config().calibration.samples_needed;
    for _ in 0..needed {
        let sample = engine.capture_sample().await.unwrap();
        assert!(sample.is_some(), "voiced capture should be accepted");
        time.advance_ms(600);
    }

    let progress = engine.calibration_progress().unwrap().unwrap();
    assert!(progress.is_complete());
    engine.finish_calibration(participant).unwrap();
    backend.feed(participant).clear();
}

/// Full two-player flow: open, calibrate both, play
#[tokio::test]
async fn test_full_duel_flow() {
    let (engine, backend, time) = setup();

    for participant in Participant::ALL {
        engine.open(participant).await.unwrap();
    }
    assert!(!engine.all_calibrated().unwrap());

    calibrate(&engine, &backend, &time, Participant::Shark).await;
    assert!(!engine.all_calibrated().unwrap());
    calibrate(&engine, &backend, &time, Participant::Seal).await;
    assert!(engine.all_calibrated().unwrap());

    // Each player makes their own sound
    backend
        .feed(Participant::Shark)
        .set(voice(&engine, Participant::Shark));
    backend
        .feed(Participant::Seal)
        .set(voice(&engine, Participant::Seal));
    let shark_self = engine.match_score(Participant::Shark).unwrap();
    let seal_self = engine.match_score(Participant::Seal).unwrap();
    assert!(shark_self >= 0.9, "shark self match {}", shark_self);
    assert!(seal_self >= 0.9, "seal self match {}", seal_self);
    assert_eq!(
        engine.match_feedback(Participant::Seal).unwrap(),
        MatchFeedback::Strong
    );

    // The seal imitates the shark
    backend
        .feed(Participant::Seal)
        .set(voice(&engine, Participant::Shark));
    let seal_as_shark = engine.match_score(Participant::Seal).unwrap();
    assert!(
        seal_as_shark < seal_self,
        "imitation {} should score below the real voice {}",
        seal_as_shark,
        seal_self
    );

    // Both fall silent
    backend.feed(Participant::Shark).clear();
    backend.feed(Participant::Seal).clear();
    for participant in Participant::ALL {
        assert_eq!(engine.match_score(participant).unwrap(), 0.0);
        assert_eq!(
            engine.match_feedback(participant).unwrap(),
            MatchFeedback::None
        );
    }

    engine.cleanup_all().unwrap();
    assert!(!engine.all_calibrated().unwrap());
}

#[tokio::test]
async fn test_simultaneous_band_energy() {
    let (engine, backend, _time) = setup();
    let matching = engine.config().matching.clone();
    engine.open(Participant::Shark).await.unwrap();
    engine.open(Participant::Seal).await.unwrap();

    // Nobody is making a sound
    let reading = engine.simultaneous().unwrap();
    assert_eq!(reading.shark, 0.0);
    assert_eq!(reading.seal, 0.0);
    assert!(!reading.simultaneous);
    assert_eq!(reading.dominant(&matching), None);

    // Only the seal barks
    backend.feed(Participant::Seal).set(fixtures::band_spectrum(
        &[matching.seal_range],
        BINS,
        SAMPLE_RATE,
        220,
    ));
    let reading = engine.simultaneous().unwrap();
    assert!(!reading.simultaneous);
    assert_eq!(reading.dominant(&matching), Some(Participant::Seal));

    // Both at once
    backend.feed(Participant::Shark).set(fixtures::band_spectrum(
        &[matching.shark_range],
        BINS,
        SAMPLE_RATE,
        220,
    ));
    let reading = engine.simultaneous().unwrap();
    assert!(reading.simultaneous);
    assert!(engine.band_energy(Participant::Shark).unwrap() > matching.energy_threshold);
    assert!(engine.band_energy(Participant::Seal).unwrap() > matching.energy_threshold);
}

#[tokio::test]
async fn test_errors_carry_codes() {
    let (engine, backend, _time) = setup();

    let err = engine.read(Participant::Shark).unwrap_err();
    assert_eq!(err.code(), 1002);
    assert!(err.to_string().contains("shark"));

    backend.set_unavailable(Some("device busy"));
    let err = engine.open(Participant::Seal).await.unwrap_err();
    assert!(matches!(err, AudioError::CaptureUnavailable { .. }));
    assert_eq!(err.code(), 1001);

    backend.set_unavailable(None);
    engine.open(Participant::Seal).await.unwrap();
    assert!(engine.is_open(Participant::Seal).unwrap());
}

#[tokio::test]
async fn test_dummy_profiles_allow_play_without_calibration() {
    let (engine, backend, _time) = setup();
    engine.open(Participant::Shark).await.unwrap();

    engine.set_dummy_profile(Participant::Shark).unwrap();
    engine.set_dummy_profile(Participant::Seal).unwrap();
    assert!(engine.all_calibrated().unwrap());

    // The dummy profile is a synthetic voice in the shark's own band
    backend
        .feed(Participant::Shark)
        .set(voice(&engine, Participant::Shark));
    let score = engine.match_score(Participant::Shark).unwrap();
    assert!(score >= 0.9, "dummy profile match {}", score);
}

#[tokio::test]
async fn test_close_keeps_profile_and_reopen_matches() {
    let (engine, backend, time) = setup();
    engine.open(Participant::Shark).await.unwrap();
    calibrate(&engine, &backend, &time, Participant::Shark).await;

    engine.close(Participant::Shark).unwrap();
    assert!(engine.is_calibrated(Participant::Shark).unwrap());
    assert!(matches!(
        engine.match_score(Participant::Shark),
        Err(AudioError::NotOpen { .. })
    ));

    engine.open(Participant::Shark).await.unwrap();
    backend
        .feed(Participant::Shark)
        .set(voice(&engine, Participant::Shark));
    assert!(engine.match_score(Participant::Shark).unwrap() >= 0.9);
    assert_eq!(backend.open_count(), 2);
}
