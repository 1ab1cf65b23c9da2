// Live microphone source backed by cpal
//
// The cpal stream is built and owned by a dedicated capture thread, because
// cpal::Stream is not Send on every host. The audio callback pushes mono
// samples into a lock-free rtrb ring buffer; `read` drains the ring into a
// sliding window and runs the analyzer on demand.
//
// Only an input stream is ever built. Nothing is routed to the speakers, so
// the microphone never echoes back to the players.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use rtrb::{Consumer, Producer, RingBuffer};

use super::analyzer::SpectrumAnalyzer;
use super::source::SpectrumSource;
use crate::analysis::features::SpectralBins;
use crate::config::AnalyzerConfig;
use crate::error::AudioError;
use crate::participant::Participant;

/// Sample rate requested from the device when it supports it
const PREFERRED_SAMPLE_RATE: u32 = 48_000;

/// Analysis-side state, touched only under the source's mutex
struct CaptureState {
    consumer: Consumer<f32>,
    /// Most recent samples, at most fft_size long
    window: VecDeque<f32>,
    analyzer: SpectrumAnalyzer,
    /// Last computed frame; `None` until audio arrives
    last_frame: Option<SpectralBins>,
}

/// One participant's microphone plus spectrum analyzer
pub struct CpalSpectrumSource {
    participant: Participant,
    sample_rate: u32,
    bin_count: usize,
    fft_size: usize,
    state: Mutex<CaptureState>,
    closed: AtomicBool,
    stop_tx: Mutex<Option<mpsc::Sender<()>>>,
    capture_thread: Mutex<Option<JoinHandle<()>>>,
}

impl CpalSpectrumSource {
    /// Acquire the default input device and start capturing
    ///
    /// Blocks until the capture thread reports that the stream is playing
    /// (or failed to start). This may wait on an OS permission prompt, so
    /// async callers should run it on a blocking thread.
    ///
    /// # Errors
    /// `AudioError::CaptureUnavailable` if there is no input device, its
    /// configuration cannot be read, or the stream fails to build or play.
    pub fn open(participant: Participant, config: &AnalyzerConfig) -> Result<Self, AudioError> {
        let (producer, consumer) = RingBuffer::<f32>::new(config.ring_capacity);
        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, AudioError>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name(format!("capture-{}", participant))
            .spawn(move || match start_input_stream(producer) {
                Ok((stream, sample_rate)) => {
                    let _ = ready_tx.send(Ok(sample_rate));
                    // Park until close() signals or the source is dropped
                    let _ = stop_rx.recv();
                    drop(stream);
                    log::debug!("[CpalSource] Capture stream for {} released", participant);
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                }
            })
            .map_err(|e| AudioError::CaptureUnavailable {
                reason: format!("Failed to spawn capture thread: {}", e),
            })?;

        let sample_rate = match ready_rx.recv() {
            Ok(Ok(rate)) => rate,
            Ok(Err(err)) => {
                let _ = handle.join();
                return Err(err);
            }
            Err(_) => {
                let _ = handle.join();
                return Err(AudioError::CaptureUnavailable {
                    reason: "Capture thread exited before reporting".to_string(),
                });
            }
        };

        log::info!(
            "[CpalSource] Opened microphone for {} at {} Hz (fft {}, smoothing {})",
            participant,
            sample_rate,
            config.fft_size,
            config.smoothing
        );

        Ok(Self {
            participant,
            sample_rate,
            bin_count: config.bin_count(),
            fft_size: config.fft_size,
            state: Mutex::new(CaptureState {
                consumer,
                window: VecDeque::with_capacity(config.fft_size),
                analyzer: SpectrumAnalyzer::new(config),
                last_frame: None,
            }),
            closed: AtomicBool::new(false),
            stop_tx: Mutex::new(Some(stop_tx)),
            capture_thread: Mutex::new(Some(handle)),
        })
    }

    pub fn participant(&self) -> Participant {
        self.participant
    }
}

impl SpectrumSource for CpalSpectrumSource {
    fn read(&self) -> SpectralBins {
        if self.closed.load(Ordering::Acquire) {
            return SpectralBins::zeros(self.bin_count);
        }

        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(_) => {
                log::error!("[CpalSource] Capture state lock poisoned for {}", self.participant);
                return SpectralBins::zeros(self.bin_count);
            }
        };
        let state = &mut *state;

        let mut received = 0usize;
        while let Ok(sample) = state.consumer.pop() {
            if state.window.len() == self.fft_size {
                state.window.pop_front();
            }
            state.window.push_back(sample);
            received += 1;
        }

        if received > 0 {
            let frame = state.analyzer.process(state.window.make_contiguous());
            state.last_frame = Some(frame);
        }

        match &state.last_frame {
            Some(frame) => frame.clone(),
            None => SpectralBins::zeros(self.bin_count),
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn bin_count(&self) -> usize {
        self.bin_count
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Ok(mut stop_tx) = self.stop_tx.lock() {
            if let Some(tx) = stop_tx.take() {
                let _ = tx.send(());
            }
        }
        if let Ok(mut thread) = self.capture_thread.lock() {
            if let Some(handle) = thread.take() {
                if handle.join().is_err() {
                    log::warn!("[CpalSource] Capture thread for {} panicked", self.participant);
                }
            }
        }

        log::info!("[CpalSource] Closed microphone for {}", self.participant);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Drop for CpalSpectrumSource {
    fn drop(&mut self) {
        self.close();
    }
}

/// Build and play an input stream on the default device (capture thread only)
fn start_input_stream(producer: Producer<f32>) -> Result<(cpal::Stream, u32), AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| AudioError::CaptureUnavailable {
            reason: "No default input device found".to_string(),
        })?;

    let config = choose_input_config(&device, PREFERRED_SAMPLE_RATE)?;
    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    let stream_config: cpal::StreamConfig = config.clone().into();

    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => build_stream::<f32>,
        cpal::SampleFormat::I16 => build_stream::<i16>,
        cpal::SampleFormat::U16 => build_stream::<u16>,
        other => {
            return Err(AudioError::UnsupportedFormat {
                format: format!("{:?}", other),
            })
        }
    }(&device, &stream_config, channels, producer)?;

    stream.play().map_err(|e| AudioError::CaptureUnavailable {
        reason: format!("Input start failed: {}", e),
    })?;

    Ok((stream, sample_rate))
}

/// Pick an input configuration, preferring the target rate and f32 samples
fn choose_input_config(
    device: &cpal::Device,
    target_rate: u32,
) -> Result<cpal::SupportedStreamConfig, AudioError> {
    let ranges = device
        .supported_input_configs()
        .map_err(|e| AudioError::CaptureUnavailable {
            reason: format!("Failed to query input configs: {}", e),
        })?;

    let mut best: Option<cpal::SupportedStreamConfig> = None;
    let mut best_score = i32::MIN;
    for range in ranges {
        let min = range.min_sample_rate().0;
        let max = range.max_sample_rate().0;
        let rate = if (min..=max).contains(&target_rate) {
            target_rate
        } else {
            max
        };
        let cfg = range.with_sample_rate(cpal::SampleRate(rate));

        let mut score = 0;
        if cfg.sample_rate().0 == target_rate {
            score += 2;
        }
        if cfg.sample_format() == cpal::SampleFormat::F32 {
            score += 1;
        }

        if score > best_score {
            best_score = score;
            best = Some(cfg);
        }
    }

    match best {
        Some(cfg) => Ok(cfg),
        None => device
            .default_input_config()
            .map_err(|e| AudioError::CaptureUnavailable {
                reason: format!("Failed to get default input config: {}", e),
            }),
    }
}

/// Build an input stream that pushes the first channel of each frame
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    mut producer: Producer<f32>,
) -> Result<cpal::Stream, AudioError>
where
    T: Sample + SizedSample,
    f32: FromSample<T>,
{
    let channels = channels.max(1);
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                for frame in data.chunks(channels) {
                    // Ring full: the reader fell behind, drop the newest sample
                    let _ = producer.push(frame[0].to_sample::<f32>());
                }
            },
            |err| log::error!("[CpalSource] Input stream error: {}", err),
            None,
        )
        .map_err(|e| AudioError::CaptureUnavailable {
            reason: format!("Failed to build input stream: {}", e),
        })
}
