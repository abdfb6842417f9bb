//! Attack/release orchestration for one keyboard.
//!
//! `NoteTrigger` owns everything that used to be ambient state in a
//! keyboard player: the backend, the set of held notes and the unlock
//! latch. Construct one per session and drive it from a single thread.

use tracing::{debug, trace};

use crate::audio::{AudioBackend, Pitch};
use crate::error::PitchError;
use crate::pitch::NoteName;
use crate::registry::VoiceRegistry;

pub struct NoteTrigger<B: AudioBackend> {
    backend: B,
    voices: VoiceRegistry<B::Voice>,
    unlocked: bool,
}

impl<B: AudioBackend> NoteTrigger<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            voices: VoiceRegistry::new(),
            unlocked: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    /// Whether `note` is held. Unparseable names are never held.
    pub fn is_active(&self, note: &str) -> bool {
        note.parse::<NoteName>()
            .is_ok_and(|note| self.voices.is_active(&note))
    }

    pub fn active_notes(&self) -> Vec<NoteName> {
        self.voices.active_notes().copied().collect()
    }

    /// Starts `note` unless it is already sounding.
    ///
    /// The first call also unlocks the backend. The unlock is not waited
    /// on; a backend that is not ready yet may queue or drop this first
    /// attack. Returns `Ok(true)` if a new voice was started and
    /// `Ok(false)` if the note was already held.
    pub fn play(&mut self, note: &str) -> Result<bool, PitchError> {
        self.ensure_unlocked();

        let note: NoteName = note.parse()?;
        if self.voices.is_active(&note) {
            trace!(%note, "note already sounding");
            return Ok(false);
        }

        let pitch = Pitch::for_backend(note, self.backend.addressing());
        let at = self.backend.now();
        let voice = self.backend.trigger_attack(pitch, at);
        debug!(%note, at, "attack");

        // Cannot fail: the note was checked inactive above and nothing ran
        // in between.
        let registered = self.voices.register(note, voice);
        debug_assert!(registered.is_ok(), "{note} registered twice");
        Ok(true)
    }

    /// Releases `note` if it is held. The note leaves the held set at once;
    /// its fade-out continues on the backend. Returns whether anything was
    /// released.
    pub fn stop(&mut self, note: &str) -> bool {
        let Ok(note) = note.parse::<NoteName>() else {
            trace!(note, "ignoring stop for unrecognized note");
            return false;
        };

        match self.voices.unregister(&note) {
            Ok(voice) => {
                let at = self.backend.now();
                self.backend.trigger_release(voice, at);
                debug!(%note, at, "release");
                true
            }
            Err(err) => {
                trace!(%err, "ignoring stop");
                false
            }
        }
    }

    /// Empties the held set and releases everything on the backend in the
    /// same step. Returns the notes that were held.
    pub fn release_all(&mut self) -> Vec<NoteName> {
        let released: Vec<NoteName> = self
            .voices
            .clear()
            .into_iter()
            .map(|(note, _)| note)
            .collect();

        let at = self.backend.now();
        self.backend.release_all(at);
        debug!(count = released.len(), at, "release all");
        released
    }

    fn ensure_unlocked(&mut self) {
        if !self.unlocked {
            self.backend.unlock();
            self.unlocked = true;
            debug!("backend unlock requested");
        }
    }
}
