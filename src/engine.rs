use std::ops::ControlFlow;

use crossbeam::channel::{Receiver, RecvError, Sender};
use tracing::{info, warn};

use crate::audio::{
    AudioBackend, Instrument, OscillatorBackend, Render, SamplerBackend, SynthBackend,
};
use crate::output::StreamBackend;
use crate::pitch::NoteName;
use crate::settings::Settings;
use crate::trigger::NoteTrigger;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    PlayNote(String),
    StopNote(String),
    ReleaseAll,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineUpdate {
    NoteStarted { note: NoteName },
    NoteStopped { note: NoteName },
    Released { notes: Vec<NoteName> },
    BackendUnavailable { message: String },
    Error { message: String },
}

/// The UI side of the engine thread.
pub struct EngineHandle {
    pub command_tx: Sender<EngineCommand>,
    pub update_rx: Receiver<EngineUpdate>,
}

impl EngineHandle {
    pub fn play_note(&self, note: impl Into<String>) {
        let _ = self.command_tx.send(EngineCommand::PlayNote(note.into()));
    }

    pub fn stop_note(&self, note: impl Into<String>) {
        let _ = self.command_tx.send(EngineCommand::StopNote(note.into()));
    }

    pub fn release_all(&self) {
        let _ = self.command_tx.send(EngineCommand::ReleaseAll);
    }

    pub fn shutdown(&self) {
        let _ = self.command_tx.send(EngineCommand::Shutdown);
    }
}

/// Starts the engine thread. Every play/stop is handled there, one at a
/// time and in the order sent.
pub fn spawn_engine(settings: Settings) -> EngineHandle {
    let (command_tx, command_rx) = crossbeam::channel::unbounded();
    let (update_tx, update_rx) = crossbeam::channel::unbounded();

    std::thread::spawn(move || {
        engine_thread(settings, command_rx, update_tx);
    });

    EngineHandle {
        command_tx,
        update_rx,
    }
}

fn engine_thread(
    settings: Settings,
    command_rx: Receiver<EngineCommand>,
    update_tx: Sender<EngineUpdate>,
) {
    let sample_rate = settings.sample_rate as f32;
    let volume = settings.volume;

    match settings.instrument {
        Instrument::Oscillator { wave, envelope } => {
            let backend = OscillatorBackend::new(sample_rate, wave, envelope);
            serve(backend, volume, command_rx, update_tx);
        }
        Instrument::Synth { wave, adsr } => {
            let backend = SynthBackend::new(sample_rate, wave, adsr);
            serve(backend, volume, command_rx, update_tx);
        }
        Instrument::Sampler {
            base_path,
            extension,
            release,
        } => {
            let mut backend = SamplerBackend::new(sample_rate, &base_path, &extension, release);
            load_samples(&mut backend, &update_tx);
            serve(backend, volume, command_rx, update_tx);
        }
    }
}

/// Loads the sampler anchors, reporting each one that is missing. The
/// sampler stays usable; missing anchors are silent.
pub fn load_samples(backend: &mut SamplerBackend, update_tx: &Sender<EngineUpdate>) {
    for err in backend.load_anchors() {
        warn!(%err, "sample unavailable");
        let _ = update_tx.send(EngineUpdate::BackendUnavailable {
            message: err.to_string(),
        });
    }
}

fn serve<B>(
    backend: B,
    volume: f32,
    command_rx: Receiver<EngineCommand>,
    update_tx: Sender<EngineUpdate>,
) where
    B: AudioBackend + Render + Send + 'static,
{
    let mut trigger = NoteTrigger::new(StreamBackend::new(backend, volume, update_tx.clone()));
    run_commands(&mut trigger, &command_rx, &update_tx);
    info!("engine stopped");
}

/// Applies commands in arrival order until `Shutdown` or until every
/// sender is gone.
pub fn run_commands<B: AudioBackend>(
    trigger: &mut NoteTrigger<B>,
    command_rx: &Receiver<EngineCommand>,
    update_tx: &Sender<EngineUpdate>,
) {
    loop {
        match command_rx.recv() {
            Ok(command) => {
                if dispatch(trigger, command, update_tx).is_break() {
                    break;
                }
            }
            Err(RecvError) => break,
        }
    }
}

/// Applies one command. Lookup failures become `EngineUpdate::Error` and
/// never stop the loop.
pub fn dispatch<B: AudioBackend>(
    trigger: &mut NoteTrigger<B>,
    command: EngineCommand,
    update_tx: &Sender<EngineUpdate>,
) -> ControlFlow<()> {
    let update = match command {
        EngineCommand::PlayNote(note) => match trigger.play(&note) {
            Ok(true) => note
                .parse()
                .ok()
                .map(|note| EngineUpdate::NoteStarted { note }),
            Ok(false) => None,
            Err(err) => {
                warn!(%err, "cannot play note");
                Some(EngineUpdate::Error {
                    message: err.to_string(),
                })
            }
        },
        EngineCommand::StopNote(note) => {
            if trigger.stop(&note) {
                note.parse().ok().map(|note| EngineUpdate::NoteStopped { note })
            } else {
                None
            }
        }
        EngineCommand::ReleaseAll => Some(EngineUpdate::Released {
            notes: trigger.release_all(),
        }),
        EngineCommand::Shutdown => return ControlFlow::Break(()),
    };

    if let Some(update) = update {
        let _ = update_tx.send(update);
    }
    ControlFlow::Continue(())
}
