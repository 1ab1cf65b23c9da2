//! Engine module housing the voice duel core.
//!
//! This module exposes trait-based backends (`backend`) and the `VoiceEngine`
//! orchestration layer (`core`) used by the game and the CLI.

pub mod backend;
pub mod core;

#[cfg(not(target_os = "android"))]
pub use backend::CpalBackend;
pub use backend::{ManualTimeSource, ScriptedBackend, SpectrumBackend, SystemTimeSource, TimeSource};
pub use core::VoiceEngine;
