//! Backend double shared by the integration tests: records every command
//! and hands out sequential voice ids.

#![allow(dead_code)]

use tonebridge::audio::{Addressing, AudioBackend, Pitch, Timestamp};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Unlock,
    Attack(Pitch, Timestamp),
    Release(u32, Timestamp),
    ReleaseAll(Timestamp),
}

pub struct RecordingBackend {
    pub addressing: Addressing,
    pub now: Timestamp,
    pub next_voice: u32,
    pub calls: Vec<Call>,
}

impl RecordingBackend {
    pub fn new(addressing: Addressing) -> Self {
        Self {
            addressing,
            now: 0.0,
            next_voice: 0,
            calls: Vec::new(),
        }
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|call| pred(call)).count()
    }
}

impl AudioBackend for RecordingBackend {
    type Voice = u32;

    fn addressing(&self) -> Addressing {
        self.addressing
    }

    fn unlock(&mut self) {
        self.calls.push(Call::Unlock);
    }

    fn now(&self) -> Timestamp {
        self.now
    }

    fn trigger_attack(&mut self, pitch: Pitch, at: Timestamp) -> u32 {
        self.calls.push(Call::Attack(pitch, at));
        self.next_voice += 1;
        self.next_voice
    }

    fn trigger_release(&mut self, voice: u32, at: Timestamp) {
        self.calls.push(Call::Release(voice, at));
    }

    fn release_all(&mut self, at: Timestamp) {
        self.calls.push(Call::ReleaseAll(at));
    }
}
