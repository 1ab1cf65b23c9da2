// Participant - the fixed set of players that own a microphone and a profile

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A player in the duel.
///
/// The shark makes low growling sounds, the seal makes high-pitched barks.
/// Every per-player collection in the crate is keyed by this enum, so there is
/// no freeform identifier and nothing is created on first access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Participant {
    Shark,
    Seal,
}

impl Participant {
    /// Both participants in registration order
    pub const ALL: [Participant; 2] = [Participant::Shark, Participant::Seal];

    /// The opposing participant
    pub fn other(&self) -> Participant {
        match self {
            Participant::Shark => Participant::Seal,
            Participant::Seal => Participant::Shark,
        }
    }

    /// Lowercase identifier used in logs and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Participant::Shark => "shark",
            Participant::Seal => "seal",
        }
    }

    /// Get human-readable name for display
    pub fn display_name(&self) -> &'static str {
        match self {
            Participant::Shark => "SHARK",
            Participant::Seal => "SEAL",
        }
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Participant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shark" => Ok(Participant::Shark),
            "seal" => Ok(Participant::Seal),
            other => Err(format!(
                "unknown participant '{}', expected 'shark' or 'seal'",
                other
            )),
        }
    }
}
