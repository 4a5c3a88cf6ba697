//! Playback of a recorded buffer with seek and pause.
//!
//! Audio goes to the default output device when one can be opened at the
//! buffer's sample rate. Otherwise the playhead is driven by a wall clock so
//! scrubbing and the played/unplayed coloring still work without sound.

use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::recording::audio::suppress_alsa_warnings;
use crate::waveform::RecordedBuffer;

/// Playhead that advances with real time while running.
#[derive(Debug, Clone)]
pub struct WallClock {
    duration: f64,
    offset: f64,
    /// Set while running
    anchor: Option<Instant>,
}

impl WallClock {
    pub fn new(duration: f64, now: Instant) -> Self {
        Self {
            duration: duration.max(0.0),
            offset: 0.0,
            anchor: Some(now),
        }
    }

    pub fn time(&self, now: Instant) -> f64 {
        let running = self
            .anchor
            .map_or(0.0, |anchor| now.saturating_duration_since(anchor).as_secs_f64());
        (self.offset + running).min(self.duration)
    }

    pub fn is_paused(&self) -> bool {
        self.anchor.is_none()
    }

    pub fn pause(&mut self, now: Instant) {
        self.offset = self.time(now);
        self.anchor = None;
    }

    /// Resumes, starting over when the end was reached.
    pub fn resume(&mut self, now: Instant) {
        if self.offset >= self.duration {
            self.offset = 0.0;
        }
        self.anchor = Some(now);
    }

    pub fn seek(&mut self, time: f64, now: Instant) {
        self.offset = time.clamp(0.0, self.duration);
        if self.anchor.is_some() {
            self.anchor = Some(now);
        }
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        self.time(now) >= self.duration
    }
}

#[derive(Debug, Default)]
struct Cursor {
    position: usize,
    paused: bool,
}

enum Backend {
    Device {
        // Dropping the stream stops output.
        _stream: cpal::Stream,
        cursor: Arc<Mutex<Cursor>>,
        len: usize,
        sample_rate: u32,
    },
    Clock(WallClock),
}

pub struct Player {
    duration: f64,
    backend: Backend,
}

impl Player {
    /// Starts playing `buffer` from the beginning.
    pub fn open(buffer: &RecordedBuffer) -> Self {
        let duration = buffer.duration();
        let backend = match open_device(buffer) {
            Ok(backend) => backend,
            Err(e) => {
                tracing::warn!("No audio output, using a silent playhead: {e}");
                Backend::Clock(WallClock::new(duration, Instant::now()))
            }
        };
        Self { duration, backend }
    }

    /// A player that never touches the audio system.
    pub fn silent(buffer: &RecordedBuffer) -> Self {
        let duration = buffer.duration();
        Self {
            duration,
            backend: Backend::Clock(WallClock::new(duration, Instant::now())),
        }
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn has_output(&self) -> bool {
        matches!(self.backend, Backend::Device { .. })
    }

    pub fn current_time(&self) -> f64 {
        match &self.backend {
            Backend::Device {
                cursor,
                sample_rate,
                ..
            } => {
                let position = cursor.lock().map(|c| c.position).unwrap_or(0);
                position as f64 / (*sample_rate).max(1) as f64
            }
            Backend::Clock(clock) => clock.time(Instant::now()),
        }
    }

    pub fn is_paused(&self) -> bool {
        match &self.backend {
            Backend::Device { cursor, .. } => cursor.lock().map(|c| c.paused).unwrap_or(true),
            Backend::Clock(clock) => clock.is_paused(),
        }
    }

    pub fn is_finished(&self) -> bool {
        match &self.backend {
            Backend::Device { cursor, len, .. } => {
                cursor.lock().map(|c| c.position >= *len).unwrap_or(true)
            }
            Backend::Clock(clock) => clock.is_finished(Instant::now()),
        }
    }

    pub fn toggle_pause(&mut self) {
        match &mut self.backend {
            Backend::Device { cursor, len, .. } => {
                if let Ok(mut cursor) = cursor.lock() {
                    cursor.paused = !cursor.paused;
                    if !cursor.paused && cursor.position >= *len {
                        cursor.position = 0;
                    }
                }
            }
            Backend::Clock(clock) => {
                let now = Instant::now();
                if clock.is_paused() {
                    clock.resume(now);
                } else {
                    clock.pause(now);
                }
            }
        }
        tracing::debug!("Playback paused: {}", self.is_paused());
    }

    /// Moves the playhead to `time` seconds.
    pub fn seek(&mut self, time: f64) {
        let time = time.clamp(0.0, self.duration);
        match &mut self.backend {
            Backend::Device {
                cursor,
                len,
                sample_rate,
                ..
            } => {
                if let Ok(mut cursor) = cursor.lock() {
                    cursor.position = ((time * *sample_rate as f64) as usize).min(*len);
                }
            }
            Backend::Clock(clock) => clock.seek(time, Instant::now()),
        }
        tracing::debug!("Seek to {:.2}s", time);
    }
}

fn open_device(buffer: &RecordedBuffer) -> Result<Backend> {
    let samples = buffer
        .channel_data(0)
        .ok_or_else(|| anyhow!("Recording has no audio channels"))?;
    let sample_rate = buffer.sample_rate();

    let device = suppress_alsa_warnings(|| {
        cpal::default_host()
            .default_output_device()
            .ok_or_else(|| anyhow!("No audio output device available"))
    })?;
    let default_config = device.default_output_config()?;
    let channels = default_config.channels();
    let config = cpal::StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let cursor = Arc::new(Mutex::new(Cursor::default()));
    let callback_cursor = Arc::clone(&cursor);
    let len = samples.len();
    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            let Ok(mut cursor) = callback_cursor.lock() else {
                data.fill(0.0);
                return;
            };
            for frame in data.chunks_mut(channels as usize) {
                let sample = if !cursor.paused && cursor.position < samples.len() {
                    cursor.position += 1;
                    samples[cursor.position - 1]
                } else {
                    0.0
                };
                frame.fill(sample);
            }
        },
        |err| {
            tracing::error!("Audio output error: {}", err);
        },
        None,
    )?;
    stream.play()?;

    tracing::info!(
        "Playback on {} at {}Hz, {} channel(s)",
        device.name().unwrap_or_else(|_| "Unknown device".to_string()),
        sample_rate,
        channels
    );
    Ok(Backend::Device {
        _stream: stream,
        cursor,
        len,
        sample_rate,
    })
}
