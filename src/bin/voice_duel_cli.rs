use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use voice_duel::analysis::BandReading;
use voice_duel::engine::{CpalBackend, SystemTimeSource};
use voice_duel::fixtures;
use voice_duel::{EngineConfig, MatchFeedback, Participant, VoiceEngine};

#[derive(Parser, Debug)]
#[command(
    name = "voice_duel_cli",
    about = "Microphone, calibration and analysis harness for the voice duel engine"
)]
struct Cli {
    /// Configuration file (defaults to assets/voice_config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print live band energies from the default microphone
    Monitor {
        #[arg(long, default_value_t = 10_000)]
        duration_ms: u64,
        #[arg(long, default_value_t = 100)]
        interval_ms: u64,
    },
    /// Calibrate one participant, then print live match scores
    Calibrate {
        #[arg(long, default_value = "shark")]
        participant: Participant,
        /// Give up collecting samples after this long
        #[arg(long, default_value_t = 30_000)]
        timeout_ms: u64,
        /// How long to print match scores after calibrating
        #[arg(long, default_value_t = 10_000)]
        test_ms: u64,
    },
    /// Run the analyzer and feature extractor over a WAV file
    Analyze {
        wav: PathBuf,
    },
    /// Print the effective configuration as JSON
    Config,
}

fn main() -> ExitCode {
    // Reports go to stdout, logs to stderr
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load_from_file(path),
        None => EngineConfig::load(),
    };

    match cli.command {
        Commands::Monitor {
            duration_ms,
            interval_ms,
        } => runtime()?.block_on(monitor(config, duration_ms, interval_ms)),
        Commands::Calibrate {
            participant,
            timeout_ms,
            test_ms,
        } => runtime()?.block_on(calibrate(config, participant, timeout_ms, test_ms)),
        Commands::Analyze { wav } => analyze(&config, &wav),
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")
}

fn live_engine(config: EngineConfig) -> VoiceEngine {
    let backend = Arc::new(CpalBackend::new(config.analyzer.clone()));
    VoiceEngine::with_backend(config, backend, Arc::new(SystemTimeSource::default()))
}

/// One microphone hears both players: report both bands from it
async fn monitor(config: EngineConfig, duration_ms: u64, interval_ms: u64) -> Result<()> {
    let matching = config.matching.clone();
    let engine = live_engine(config);
    let listener = Participant::Shark;
    engine
        .open(listener)
        .await
        .context("opening the default microphone")?;
    let sample_rate = engine.sample_rate(listener)?;

    println!("listening at {} Hz for {} ms", sample_rate, duration_ms);
    let deadline = Instant::now() + Duration::from_millis(duration_ms);
    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));

    while Instant::now() < deadline {
        ticker.tick().await;
        let reading = engine.read(listener)?;
        let bands = BandReading::from_spectrum(&reading.bins, sample_rate, &matching);
        let dominant = bands
            .dominant(&matching)
            .map(|p| p.display_name())
            .unwrap_or("-");
        println!(
            "volume {:>5.3}  shark {:>5.3}  seal {:>5.3}  both {:<5}  dominant {}",
            reading.volume, bands.shark, bands.seal, bands.simultaneous, dominant
        );
    }

    engine.cleanup_all()?;
    Ok(())
}

async fn calibrate(
    config: EngineConfig,
    participant: Participant,
    timeout_ms: u64,
    test_ms: u64,
) -> Result<()> {
    let capture_interval = Duration::from_millis(config.calibration.capture_interval_ms.max(1));
    let match_interval = Duration::from_millis(config.matching.match_interval_ms.max(1));
    let cooldown = Duration::from_millis(config.matching.feedback_cooldown_ms);
    let needed = config.calibration.samples_needed;

    let engine = live_engine(config);
    engine
        .open(participant)
        .await
        .with_context(|| format!("opening microphone for {}", participant))?;
    engine.start_calibration(participant)?;

    println!(
        "{}: make your sound! ({} samples needed)",
        participant.display_name(),
        needed
    );
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    let mut collected = 0;
    while collected < needed {
        if Instant::now() >= deadline {
            engine.cancel_calibration()?;
            bail!("timed out after {} of {} samples", collected, needed);
        }
        if engine.capture_sample().await?.is_some() {
            collected += 1;
            println!("got {} of {} samples", collected, needed);
        }
        tokio::time::sleep(capture_interval).await;
    }

    let profile = engine.finish_calibration(participant)?;
    println!(
        "calibrated: {}",
        serde_json::to_string_pretty(&profile.characteristics)?
    );

    println!("now testing for {} ms", test_ms);
    let deadline = Instant::now() + Duration::from_millis(test_ms);
    let mut last_feedback: Option<Instant> = None;
    while Instant::now() < deadline {
        let score = engine.match_score(participant)?;
        let feedback = engine.match_feedback(participant)?;
        let cooled = last_feedback.map_or(true, |t| t.elapsed() >= cooldown);
        if feedback != MatchFeedback::None && cooled {
            println!("score {:>5.3}  {:?}", score, feedback);
            last_feedback = Some(Instant::now());
        }
        tokio::time::sleep(match_interval).await;
    }

    engine.cleanup_all()?;
    Ok(())
}

fn analyze(config: &EngineConfig, wav: &Path) -> Result<()> {
    let analysis = fixtures::analyze_wav(wav, &config.analyzer)?;
    let bands =
        BandReading::from_spectrum(&analysis.average, analysis.sample_rate, &config.matching);

    let report = serde_json::json!({
        "analysis": analysis,
        "bands": bands,
        "dominant": bands.dominant(&config.matching),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
