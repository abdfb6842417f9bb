//! Audio device output for any rendering backend.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam::channel::Sender;
use parking_lot::Mutex;
use tracing::{error, info};

use crate::audio::{Addressing, AudioBackend, Pitch, Render, Timestamp};
use crate::engine::EngineUpdate;
use crate::error::BackendError;

/// Shares a backend between the control thread and the device callback.
///
/// `unlock` opens the output stream and re-times the backend clock to the
/// device sample rate. Until it succeeds the backend keeps accepting
/// triggers, so voices started early simply become audible once the stream
/// runs. A failure is reported on the update channel and in the
/// log, never to the caller.
pub struct StreamBackend<B> {
    inner: Arc<Mutex<B>>,
    stream: Option<cpal::Stream>,
    volume: f32,
    updates: Sender<EngineUpdate>,
}

impl<B> StreamBackend<B>
where
    B: AudioBackend + Render + Send + 'static,
{
    pub fn new(backend: B, volume: f32, updates: Sender<EngineUpdate>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(backend)),
            stream: None,
            volume,
            updates,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }
}

impl<B> AudioBackend for StreamBackend<B>
where
    B: AudioBackend + Render + Send + 'static,
{
    type Voice = B::Voice;

    fn addressing(&self) -> Addressing {
        self.inner.lock().addressing()
    }

    fn unlock(&mut self) {
        self.inner.lock().unlock();
        if self.stream.is_some() {
            return;
        }

        match open_stream(self.inner.clone(), self.volume) {
            Ok(stream) => {
                info!("audio output started");
                self.stream = Some(stream);
            }
            Err(err) => {
                error!(%err, "audio output unavailable");
                let _ = self.updates.send(EngineUpdate::BackendUnavailable {
                    message: err.to_string(),
                });
            }
        }
    }

    fn now(&self) -> Timestamp {
        self.inner.lock().now()
    }

    fn trigger_attack(&mut self, pitch: Pitch, at: Timestamp) -> B::Voice {
        self.inner.lock().trigger_attack(pitch, at)
    }

    fn trigger_release(&mut self, voice: B::Voice, at: Timestamp) {
        self.inner.lock().trigger_release(voice, at)
    }

    fn release_all(&mut self, at: Timestamp) {
        self.inner.lock().release_all(at)
    }
}

fn open_stream<B>(backend: Arc<Mutex<B>>, volume: f32) -> Result<cpal::Stream, BackendError>
where
    B: Render + Send + 'static,
{
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(BackendError::NoOutputDevice)?;
    let config = device.default_output_config()?;
    let stream_config: cpal::StreamConfig = config.into();
    let num_channels = (stream_config.channels as usize).max(1);
    let device_rate = stream_config.sample_rate as f32;

    // Before the first callback, so every render runs at the device rate.
    backend.lock().set_sample_rate(device_rate);
    info!(sample_rate = device_rate, channels = num_channels, "output config");

    let mut mono: Vec<f32> = Vec::new();
    let stream = device.build_output_stream(
        &stream_config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            let num_frames = data.len() / num_channels;
            mono.resize(num_frames, 0.0);
            backend.lock().render(&mut mono);

            for (frame, sample) in data.chunks_mut(num_channels).zip(&mono) {
                frame.fill(sample * volume);
            }
        },
        |err| error!(%err, "audio stream error"),
        None,
    )?;

    stream.play()?;
    Ok(stream)
}
