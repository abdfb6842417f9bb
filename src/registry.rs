use std::collections::HashMap;

use crate::error::RegistryError;
use crate::pitch::NoteName;

/// The set of notes currently held, each owning its backend voice handle.
///
/// Membership reflects the logical "held" state: a note leaves the registry
/// as soon as it is released, even while its voice is still fading out.
#[derive(Debug)]
pub struct VoiceRegistry<V> {
    active_notes: HashMap<NoteName, V>,
}

impl<V> VoiceRegistry<V> {
    pub fn new() -> Self {
        Self {
            active_notes: HashMap::new(),
        }
    }

    pub fn is_active(&self, note: &NoteName) -> bool {
        self.active_notes.contains_key(note)
    }

    /// Never overwrites: replacing a live handle would orphan a sounding
    /// voice.
    pub fn register(&mut self, note: NoteName, voice: V) -> Result<(), RegistryError> {
        if self.active_notes.contains_key(&note) {
            return Err(RegistryError::AlreadyActive(note));
        }
        self.active_notes.insert(note, voice);
        Ok(())
    }

    pub fn unregister(&mut self, note: &NoteName) -> Result<V, RegistryError> {
        self.active_notes
            .remove(note)
            .ok_or(RegistryError::NotFound(*note))
    }

    pub fn clear(&mut self) -> Vec<(NoteName, V)> {
        self.active_notes.drain().collect()
    }

    pub fn active_notes(&self) -> impl Iterator<Item = &NoteName> {
        self.active_notes.keys()
    }

    pub fn len(&self) -> usize {
        self.active_notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active_notes.is_empty()
    }
}

impl<V> Default for VoiceRegistry<V> {
    fn default() -> Self {
        Self::new()
    }
}
