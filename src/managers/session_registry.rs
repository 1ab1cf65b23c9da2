// SessionRegistry: Focused manager for per-participant sources and profiles
//
// Single Responsibility: Ownership of each participant's open spectrum
// source and stored voice profile.
//
// Sources are registered explicitly after a successful open; nothing is
// created on first access. Cleanup closes the source and drops both entries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::audio::SpectrumSource;
use crate::calibration::Profile;
use crate::error::{log_audio_error, AudioError};
use crate::participant::Participant;

/// Open source owned by the registry for one participant
pub struct SourceHandle {
    participant: Participant,
    source: Arc<dyn SpectrumSource>,
}

impl SourceHandle {
    pub fn new(participant: Participant, source: Box<dyn SpectrumSource>) -> Self {
        Self {
            participant,
            source: Arc::from(source),
        }
    }

    pub fn participant(&self) -> Participant {
        self.participant
    }

    /// Shared reference to the underlying source
    pub fn source(&self) -> Arc<dyn SpectrumSource> {
        Arc::clone(&self.source)
    }

    /// Release the device; the handle cannot be used afterwards
    pub fn close(self) {
        self.source.close();
    }
}

/// Manages per-participant sources and profiles
///
/// This manager handles:
/// - Registering a freshly opened source (one per participant)
/// - Looking up a participant's source for reads
/// - Storing and retrieving profiles (overwrite, never merge)
/// - Cleanup of one or all participants
#[derive(Default)]
pub struct SessionRegistry {
    sources: Mutex<HashMap<Participant, SourceHandle>>,
    profiles: Mutex<HashMap<Participant, Profile>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_sources(&self) -> Result<MutexGuard<'_, HashMap<Participant, SourceHandle>>, AudioError> {
        self.sources.lock().map_err(|_| AudioError::LockPoisoned {
            component: "session_sources".to_string(),
        })
    }

    fn lock_profiles(&self) -> Result<MutexGuard<'_, HashMap<Participant, Profile>>, AudioError> {
        self.profiles.lock().map_err(|_| AudioError::LockPoisoned {
            component: "session_profiles".to_string(),
        })
    }

    /// Take ownership of an opened source
    ///
    /// # Errors
    /// `AlreadyOpen` if the participant already has a source; the new source
    /// is closed so its device is not leaked.
    pub fn register(
        &self,
        participant: Participant,
        source: Box<dyn SpectrumSource>,
    ) -> Result<(), AudioError> {
        let mut sources = self.lock_sources()?;
        if sources.contains_key(&participant) {
            source.close();
            let err = AudioError::AlreadyOpen { participant };
            log_audio_error(&err, "register");
            return Err(err);
        }

        sources.insert(participant, SourceHandle::new(participant, source));
        log::info!("[Registry] Registered source for {}", participant);
        Ok(())
    }

    /// Source for a participant
    ///
    /// # Errors
    /// `NotOpen` if the participant has no registered source
    pub fn source(&self, participant: Participant) -> Result<Arc<dyn SpectrumSource>, AudioError> {
        self.lock_sources()?
            .get(&participant)
            .map(SourceHandle::source)
            .ok_or(AudioError::NotOpen { participant })
    }

    pub fn is_open(&self, participant: Participant) -> Result<bool, AudioError> {
        Ok(self.lock_sources()?.contains_key(&participant))
    }

    /// Participants with an open source, in participant order
    pub fn open_participants(&self) -> Result<Vec<Participant>, AudioError> {
        let mut participants: Vec<Participant> = self.lock_sources()?.keys().copied().collect();
        participants.sort();
        Ok(participants)
    }

    /// Close a participant's source but keep its profile
    ///
    /// # Returns
    /// Whether a source was open
    pub fn close(&self, participant: Participant) -> Result<bool, AudioError> {
        let handle = self.lock_sources()?.remove(&participant);
        match handle {
            Some(handle) => {
                handle.close();
                log::info!("[Registry] Closed source for {}", participant);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Store a profile, replacing any previous one
    pub fn store_profile(&self, profile: Profile) -> Result<(), AudioError> {
        let participant = profile.participant;
        let previous = self.lock_profiles()?.insert(participant, profile);
        if previous.is_some() {
            log::info!("[Registry] Replaced profile for {}", participant);
        } else {
            log::info!("[Registry] Stored profile for {}", participant);
        }
        Ok(())
    }

    pub fn profile(&self, participant: Participant) -> Result<Option<Profile>, AudioError> {
        Ok(self.lock_profiles()?.get(&participant).cloned())
    }

    pub fn has_profile(&self, participant: Participant) -> Result<bool, AudioError> {
        Ok(self.lock_profiles()?.contains_key(&participant))
    }

    /// Close the participant's source and forget its profile
    ///
    /// Idempotent: cleaning an unknown participant does nothing.
    pub fn cleanup(&self, participant: Participant) -> Result<(), AudioError> {
        self.close(participant)?;
        if self.lock_profiles()?.remove(&participant).is_some() {
            log::debug!("[Registry] Dropped profile for {}", participant);
        }
        Ok(())
    }

    /// Clean up every participant
    pub fn cleanup_all(&self) -> Result<(), AudioError> {
        for participant in Participant::ALL {
            self.cleanup(participant)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::features::SpectralBins;
    use crate::audio::{ScriptedFeed, ScriptedSpectrumSource};

    fn scripted() -> (ScriptedFeed, Box<dyn SpectrumSource>) {
        let feed = ScriptedFeed::new();
        let source = Box::new(ScriptedSpectrumSource::new(feed.clone(), 48_000, 16));
        (feed, source)
    }

    fn profile(participant: Participant, level: u8) -> Profile {
        Profile::from_samples(participant, vec![SpectralBins::from_bytes(&[level; 16])]).unwrap()
    }

    #[test]
    fn test_source_requires_register() {
        let registry = SessionRegistry::new();
        assert!(matches!(
            registry.source(Participant::Shark),
            Err(AudioError::NotOpen {
                participant: Participant::Shark
            })
        ));
    }

    #[test]
    fn test_register_twice_fails() {
        let registry = SessionRegistry::new();
        let (_feed, first) = scripted();
        registry.register(Participant::Seal, first).unwrap();

        let (_feed2, second) = scripted();
        assert_eq!(
            registry.register(Participant::Seal, second),
            Err(AudioError::AlreadyOpen {
                participant: Participant::Seal
            })
        );
        // The original source is untouched
        assert!(!registry.source(Participant::Seal).unwrap().is_closed());
    }

    #[test]
    fn test_close_keeps_profile() {
        let registry = SessionRegistry::new();
        let (_feed, source) = scripted();
        registry.register(Participant::Shark, source).unwrap();
        registry.store_profile(profile(Participant::Shark, 100)).unwrap();

        let held = registry.source(Participant::Shark).unwrap();
        assert!(registry.close(Participant::Shark).unwrap());
        assert!(held.is_closed());
        assert!(!registry.close(Participant::Shark).unwrap());
        assert!(registry.has_profile(Participant::Shark).unwrap());
    }

    #[test]
    fn test_store_profile_overwrites() {
        let registry = SessionRegistry::new();
        registry.store_profile(profile(Participant::Seal, 100)).unwrap();
        registry.store_profile(profile(Participant::Seal, 200)).unwrap();

        let stored = registry.profile(Participant::Seal).unwrap().unwrap();
        assert_eq!(stored.sample_count(), 1);
        assert_eq!(stored.characteristics.avg_energy, 200.0);
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let registry = SessionRegistry::new();
        let (feed, source) = scripted();
        feed.set(SpectralBins::from_bytes(&[50; 16]));
        registry.register(Participant::Shark, source).unwrap();
        registry.store_profile(profile(Participant::Shark, 100)).unwrap();
        let held = registry.source(Participant::Shark).unwrap();

        registry.cleanup(Participant::Shark).unwrap();
        registry.cleanup(Participant::Shark).unwrap();

        assert!(held.is_closed());
        assert_eq!(held.read().as_slice()[0], 0.0);
        assert!(!registry.is_open(Participant::Shark).unwrap());
        assert!(registry.profile(Participant::Shark).unwrap().is_none());
    }

    #[test]
    fn test_cleanup_all() {
        let registry = SessionRegistry::new();
        for participant in Participant::ALL {
            let (_feed, source) = scripted();
            registry.register(participant, source).unwrap();
            registry.store_profile(profile(participant, 80)).unwrap();
        }
        assert_eq!(registry.open_participants().unwrap(), Participant::ALL.to_vec());

        registry.cleanup_all().unwrap();
        assert!(registry.open_participants().unwrap().is_empty());
        assert!(!registry.has_profile(Participant::Seal).unwrap());
    }
}
