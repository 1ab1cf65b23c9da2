use std::path::PathBuf;
use std::process::Command;

use serde_json::Value;
use voice_duel::fixtures;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_voice_duel_cli"))
}

/// Write a mono 16-bit sine recording into the system temp dir.
fn write_sine_wav(name: &str, freq_hz: f32) -> PathBuf {
    let path =
        std::env::temp_dir().join(format!("voice_duel_{}_{}.wav", name, std::process::id()));
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: fixtures::FIXTURE_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).expect("create wav");
    for sample in fixtures::sine_wave(freq_hz, fixtures::FIXTURE_SAMPLE_RATE, 24_000, 0.5) {
        writer
            .write_sample((sample * i16::MAX as f32) as i16)
            .expect("write sample");
    }
    writer.finalize().expect("finalize wav");
    path
}

#[test]
fn config_prints_defaults_for_missing_file() {
    let output = cli()
        .args(["--config", "does/not/exist.json", "config"])
        .output()
        .expect("failed to run voice_duel_cli config");
    assert!(
        output.status.success(),
        "CLI exited with {:?}",
        output.status.code()
    );

    let json: Value = serde_json::from_slice(&output.stdout).expect("config JSON payload");
    assert_eq!(json["calibration"]["samples_needed"], 5);
    assert_eq!(json["calibration"]["min_sample_gap_ms"], 500);
    assert_eq!(json["matching"]["shark_range"]["min_hz"], 100.0);
}

#[test]
fn analyze_wav_reports_features() {
    let path = write_sine_wav("analyze", 1000.0);
    let output = cli()
        .arg("analyze")
        .arg(&path)
        .output()
        .expect("failed to run voice_duel_cli analyze");
    let _ = std::fs::remove_file(&path);
    assert!(
        output.status.success(),
        "CLI exited with {:?}",
        output.status.code()
    );

    let json: Value = serde_json::from_slice(&output.stdout).expect("analysis JSON payload");
    assert_eq!(json["analysis"]["sample_rate"], 48_000);
    assert!(json["analysis"]["frames"].as_u64().unwrap_or_default() > 1);
    assert!(json["analysis"]["characteristics"]["spectral_centroid"].is_number());
    assert!(json["bands"]["seal"].is_number());
}

#[test]
fn analyze_missing_file_fails() {
    let output = cli()
        .args(["analyze", "does/not/exist.wav"])
        .output()
        .expect("failed to run voice_duel_cli analyze");
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
}
