// Managers Module
//
// Focused manager classes, one concern each:
// - SessionRegistry: per-participant spectrum sources and voice profiles

pub mod session_registry;

pub use session_registry::{SessionRegistry, SourceHandle};
