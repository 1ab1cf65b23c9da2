//! Scripted spectrum source for desktop testing
//!
//! This module provides a SpectrumSource that plays back pre-built frames
//! instead of listening to a microphone. It lets the calibration and matching
//! paths run under `cargo test` and in the CLI without audio hardware.
//!
//! # Usage
//! Frames are pushed into a [`ScriptedFeed`]. Every `read` consumes the next
//! queued frame; once the queue is empty the last frame is held, like a
//! microphone that keeps hearing the same sound.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::source::SpectrumSource;
use crate::analysis::features::SpectralBins;

#[derive(Default)]
struct FeedState {
    queue: VecDeque<SpectralBins>,
    current: Option<SpectralBins>,
}

/// Shared frame queue feeding one participant's scripted sources
///
/// Cloning a feed yields another handle to the same queue, so a test can keep
/// pushing frames after the engine has opened the source.
#[derive(Clone, Default)]
pub struct ScriptedFeed {
    state: Arc<Mutex<FeedState>>,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a frame behind any frames not yet read
    pub fn push(&self, frame: SpectralBins) {
        if let Ok(mut state) = self.state.lock() {
            state.queue.push_back(frame);
        }
    }

    /// Drop queued frames and hold `frame` from now on
    pub fn set(&self, frame: SpectralBins) {
        if let Ok(mut state) = self.state.lock() {
            state.queue.clear();
            state.current = Some(frame);
        }
    }

    /// Drop everything; reads return silence again
    pub fn clear(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.queue.clear();
            state.current = None;
        }
    }

    /// Frames queued but not yet read
    pub fn pending(&self) -> usize {
        self.state.lock().map(|s| s.queue.len()).unwrap_or(0)
    }

    /// Advance to the next queued frame (if any) and return the current one
    fn advance(&self) -> Option<SpectralBins> {
        let mut state = self.state.lock().ok()?;
        if let Some(next) = state.queue.pop_front() {
            state.current = Some(next);
        }
        state.current.clone()
    }
}

/// SpectrumSource that replays frames from a [`ScriptedFeed`]
pub struct ScriptedSpectrumSource {
    feed: ScriptedFeed,
    sample_rate: u32,
    bin_count: usize,
    closed: AtomicBool,
}

impl ScriptedSpectrumSource {
    pub fn new(feed: ScriptedFeed, sample_rate: u32, bin_count: usize) -> Self {
        Self {
            feed,
            sample_rate,
            bin_count,
            closed: AtomicBool::new(false),
        }
    }
}

impl SpectrumSource for ScriptedSpectrumSource {
    fn read(&self) -> SpectralBins {
        if self.closed.load(Ordering::Acquire) {
            return SpectralBins::zeros(self.bin_count);
        }
        self.feed
            .advance()
            .unwrap_or_else(|| SpectralBins::zeros(self.bin_count))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn bin_count(&self) -> usize {
        self.bin_count
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
