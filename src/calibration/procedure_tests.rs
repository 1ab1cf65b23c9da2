use super::*;
use crate::audio::{ScriptedFeed, ScriptedSpectrumSource};
use crate::engine::backend::ManualTimeSource;

const BINS: usize = 64;

fn loud(level: u8) -> SpectralBins {
    SpectralBins::from_bytes(&[level; BINS])
}

fn quiet() -> SpectralBins {
    SpectralBins::from_bytes(&[10; BINS])
}

/// Calibration config without the reading delay, for fast tests
fn fast_config() -> CalibrationConfig {
    CalibrationConfig {
        reading_window_ms: 0,
        ..CalibrationConfig::default()
    }
}

fn setup(config: CalibrationConfig) -> (CalibrationEngine, Arc<ManualTimeSource>, ScriptedFeed, ScriptedSpectrumSource) {
    let time = Arc::new(ManualTimeSource::new());
    let engine = CalibrationEngine::new(config, time.clone());
    let feed = ScriptedFeed::new();
    let source = ScriptedSpectrumSource::new(feed.clone(), 48_000, BINS);
    (engine, time, feed, source)
}

fn collected(engine: &CalibrationEngine) -> usize {
    engine
        .progress()
        .unwrap()
        .map(|p| p.samples_collected)
        .unwrap_or(0)
}

#[tokio::test]
async fn test_idle_engine_captures_nothing() {
    let (engine, _time, feed, source) = setup(fast_config());
    feed.set(loud(200));

    assert_eq!(engine.capture_sample(&source).await.unwrap(), None);
    assert!(engine.progress().unwrap().is_none());
}

#[tokio::test]
async fn test_quiet_capture_is_rejected() {
    let (engine, _time, feed, source) = setup(fast_config());
    engine.start(Participant::Shark).unwrap();
    feed.set(quiet());

    assert_eq!(engine.capture_sample(&source).await.unwrap(), None);
    assert_eq!(collected(&engine), 0);
}

#[tokio::test]
async fn test_debounce_window() {
    let (engine, time, feed, source) = setup(fast_config());
    engine.start(Participant::Shark).unwrap();
    feed.set(loud(200));

    // No previous sample: the gap counts as satisfied
    assert!(engine.capture_sample(&source).await.unwrap().is_some());

    // Immediately again: inside the window
    assert_eq!(engine.capture_sample(&source).await.unwrap(), None);

    // Exactly at the gap is still too soon
    time.advance_ms(500);
    assert_eq!(engine.capture_sample(&source).await.unwrap(), None);

    time.advance_ms(1);
    assert!(engine.capture_sample(&source).await.unwrap().is_some());
    assert_eq!(collected(&engine), 2);
}

#[tokio::test]
async fn test_accepted_sample_averages_readings() {
    let (engine, _time, feed, source) = setup(fast_config());
    engine.start(Participant::Seal).unwrap();

    // First frame passes the gate, the next three are the readings
    feed.push(loud(250));
    feed.push(loud(90));
    feed.push(loud(120));
    feed.push(loud(150));

    let sample = engine.capture_sample(&source).await.unwrap().unwrap();
    assert!(sample.as_slice().iter().all(|&m| m == 120.0));
}

#[tokio::test]
async fn test_recording_lock_rejects_overlapping_capture() {
    let config = CalibrationConfig {
        reading_window_ms: 30,
        ..CalibrationConfig::default()
    };
    let (engine, _time, feed, source) = setup(config);
    engine.start(Participant::Shark).unwrap();
    feed.set(loud(200));

    let (first, second) = tokio::join!(engine.capture_sample(&source), engine.capture_sample(&source));

    assert!(first.unwrap().is_some());
    assert_eq!(second.unwrap(), None);
    assert!(!engine.is_recording());
    assert_eq!(collected(&engine), 1);
}

#[tokio::test]
async fn test_abandoned_capture_releases_lock() {
    let config = CalibrationConfig {
        reading_window_ms: 1_000,
        ..CalibrationConfig::default()
    };
    let (engine, _time, feed, source) = setup(config);
    engine.start(Participant::Shark).unwrap();
    feed.set(loud(200));

    let result = tokio::time::timeout(Duration::from_millis(20), engine.capture_sample(&source)).await;

    assert!(result.is_err(), "capture should still be mid-recording");
    assert!(!engine.is_recording());
    assert_eq!(collected(&engine), 0);
}

#[test]
fn test_finish_without_samples() {
    let (engine, _time, _feed, _source) = setup(fast_config());
    engine.start(Participant::Seal).unwrap();

    assert_eq!(
        engine.finish(Participant::Seal),
        Err(CalibrationError::NoSamplesCollected {
            participant: Participant::Seal
        })
    );
    // Session is gone either way
    assert!(engine.progress().unwrap().is_none());
    assert_eq!(engine.finish(Participant::Seal), Err(CalibrationError::NotInProgress));
}

#[tokio::test]
async fn test_finish_builds_profile() {
    let (engine, time, feed, source) = setup(fast_config());
    engine.start(Participant::Shark).unwrap();
    feed.set(SpectralBins::from_bytes(&{
        let mut bytes = [100u8; BINS];
        bytes[20] = 240;
        bytes
    }));

    for _ in 0..3 {
        assert!(engine.capture_sample(&source).await.unwrap().is_some());
        time.advance_ms(600);
    }

    let profile = engine.finish(Participant::Shark).unwrap();
    assert_eq!(profile.participant, Participant::Shark);
    assert_eq!(profile.sample_count(), 3);
    assert_eq!(profile.characteristics.peak_frequencies, vec![20]);
    assert!(engine.active_participant().unwrap().is_none());
}

#[tokio::test]
async fn test_finish_for_other_participant_is_mismatch() {
    let (engine, _time, feed, source) = setup(fast_config());
    engine.start(Participant::Shark).unwrap();
    feed.set(loud(200));
    engine.capture_sample(&source).await.unwrap();

    assert_eq!(
        engine.finish(Participant::Seal),
        Err(CalibrationError::ParticipantMismatch {
            expected: Participant::Shark,
            actual: Participant::Seal,
        })
    );
    assert!(engine.progress().unwrap().is_none());
}

#[test]
fn test_try_start_refuses_second_session() {
    let (engine, _time, _feed, _source) = setup(fast_config());
    engine.try_start(Participant::Shark).unwrap();

    assert_eq!(
        engine.try_start(Participant::Seal),
        Err(CalibrationError::AlreadyInProgress {
            participant: Participant::Shark
        })
    );
    assert_eq!(engine.active_participant().unwrap(), Some(Participant::Shark));
}

#[tokio::test]
async fn test_start_clears_previous_samples() {
    let (engine, _time, feed, source) = setup(fast_config());
    engine.start(Participant::Shark).unwrap();
    feed.set(loud(200));
    engine.capture_sample(&source).await.unwrap();
    assert_eq!(collected(&engine), 1);

    engine.start(Participant::Shark).unwrap();
    assert_eq!(collected(&engine), 0);
}

#[tokio::test]
async fn test_restart_mid_recording_drops_stale_sample() {
    let config = CalibrationConfig {
        reading_window_ms: 60,
        ..CalibrationConfig::default()
    };
    let (engine, _time, feed, source) = setup(config);
    engine.start(Participant::Shark).unwrap();
    feed.set(loud(200));

    let restart = async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(engine.is_recording());
        engine.cancel().unwrap();
        engine.start(Participant::Shark).unwrap();

        // The first capture still owns the recording lock
        let overlapping = engine.capture_sample(&source).await.unwrap();
        (overlapping, engine.is_recording())
    };
    let (stale, (overlapping, still_recording)) =
        tokio::join!(engine.capture_sample(&source), restart);

    assert_eq!(stale.unwrap(), None);
    assert_eq!(overlapping, None);
    assert!(still_recording);
    assert!(!engine.is_recording());
    assert_eq!(collected(&engine), 0);

    assert!(engine.capture_sample(&source).await.unwrap().is_some());
    assert_eq!(collected(&engine), 1);
}

#[test]
fn test_cancel() {
    let (engine, _time, _feed, _source) = setup(fast_config());
    assert_eq!(engine.cancel().unwrap(), None);

    engine.start(Participant::Seal).unwrap();
    assert_eq!(engine.cancel().unwrap(), Some(Participant::Seal));
    assert!(engine.progress().unwrap().is_none());
}

#[test]
fn test_progress_reports_needed_samples() {
    let (engine, _time, _feed, _source) = setup(fast_config());
    engine.start(Participant::Seal).unwrap();

    let progress = engine.progress().unwrap().unwrap();
    assert_eq!(progress.participant, Participant::Seal);
    assert_eq!(progress.samples_needed, 5);
    assert!(!progress.is_complete());
}
