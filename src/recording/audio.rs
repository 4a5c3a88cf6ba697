//! Audio capture from an input device.
//!
//! Captures from the system's default or a configured input device, mixes
//! down to mono and keeps normalized f32 samples in memory. The live view
//! reads new samples each frame through [`AudioRecorder::take_feed`].

use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use hound::WavWriter;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::waveform::RecordedBuffer;

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// Records mono audio with pause and resume support.
pub struct AudioRecorder {
    /// Actual recording sample rate from device
    sample_rate: u32,
    /// Recorded samples, mono, normalized to [-1, 1]
    samples: Arc<Mutex<Vec<f32>>>,
    /// Active audio input stream (kept alive during recording)
    stream: Option<cpal::Stream>,
    is_paused: Arc<Mutex<bool>>,
    /// Device name or "default" to use the system default device
    device_name: String,
    /// Samples already handed out by `take_feed`
    feed_cursor: usize,
}

impl AudioRecorder {
    /// Creates a recorder. The actual sample rate is only known after
    /// [`Self::start_recording`].
    pub fn new(requested_sample_rate: u32, device_name: String) -> Self {
        Self {
            sample_rate: requested_sample_rate,
            samples: Arc::new(Mutex::new(Vec::new())),
            stream: None,
            is_paused: Arc::new(Mutex::new(false)),
            device_name,
            feed_cursor: 0,
        }
    }

    /// Starts recording from the configured input device.
    ///
    /// # Errors
    /// - If the specified device is not available
    /// - If device configuration fails
    /// - If audio stream creation fails
    pub fn start_recording(&mut self) -> Result<()> {
        let device = suppress_alsa_warnings(|| {
            let host = cpal::default_host();

            if self.device_name == "default" {
                host.default_input_device()
                    .ok_or_else(|| anyhow!("No audio input device available"))
            } else {
                find_device_by_name(&host, &self.device_name)
            }
        })?;

        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());
        tracing::info!("Recording device: {}", device_name);

        let device_config = device.default_input_config()?;
        let device_sample_rate = device_config.sample_rate().0;
        let num_channels = device_config.channels() as usize;

        if device_sample_rate != self.sample_rate {
            tracing::warn!(
                "Requested sample rate {}Hz but device uses {}Hz. Recording at device rate.",
                self.sample_rate,
                device_sample_rate
            );
        }
        tracing::debug!(
            "Device configuration: {}Hz, {} channels",
            device_sample_rate,
            num_channels
        );
        self.sample_rate = device_sample_rate;

        let samples_arc = Arc::clone(&self.samples);
        let pause_arc = Arc::clone(&self.is_paused);

        let stream = device.build_input_stream(
            &device_config.into(),
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let is_paused = pause_arc.lock().map(|p| *p).unwrap_or(false);
                if !is_paused {
                    if let Ok(mut samples) = samples_arc.lock() {
                        downmix_into(data, num_channels, &mut samples);
                    }
                }
            },
            |err| {
                tracing::error!("Audio stream error: {}", err);
            },
            None,
        )?;

        stream.play()?;
        self.stream = Some(stream);

        tracing::debug!("Audio stream started");
        Ok(())
    }

    /// Stops the input stream and hands over everything recorded so far.
    pub fn stop_recording(&mut self) -> RecordedBuffer {
        self.stream = None;

        let samples = self
            .samples
            .lock()
            .map(|mut s| std::mem::take(&mut *s))
            .unwrap_or_default();
        self.feed_cursor = 0;

        let duration_secs = samples.len() as f32 / self.sample_rate.max(1) as f32;
        if samples.is_empty() {
            tracing::warn!("Recording stopped with no samples captured");
        } else {
            tracing::info!(
                "Recording stopped: {:.2}s ({} samples at {}Hz)",
                duration_secs,
                samples.len(),
                self.sample_rate
            );
        }
        RecordedBuffer::mono(samples, self.sample_rate)
    }

    /// Returns samples captured since the previous call.
    pub fn take_feed(&mut self) -> Vec<f32> {
        let Ok(samples) = self.samples.lock() else {
            return Vec::new();
        };
        let start = self.feed_cursor.min(samples.len());
        self.feed_cursor = samples.len();
        samples[start..].to_vec()
    }

    pub fn sample_count(&self) -> usize {
        self.samples.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Returns the actual sample rate of the recording.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused.lock().map(|p| *p).unwrap_or(false)
    }

    /// Toggles between paused and recording states.
    pub fn toggle_pause(&self) {
        if let Ok(mut paused) = self.is_paused.lock() {
            *paused = !*paused;
            if *paused {
                tracing::debug!("Recording paused");
            } else {
                tracing::debug!("Recording resumed");
            }
        }
    }
}

/// Appends interleaved device samples to `out` as normalized mono.
fn downmix_into(data: &[i16], num_channels: usize, out: &mut Vec<f32>) {
    let channels = num_channels.max(1);
    out.extend(data.chunks_exact(channels).map(|frame| {
        let sum: i32 = frame.iter().map(|&s| s as i32).sum();
        (sum as f32 / channels as f32) / 32768.0
    }));
}

/// Writes channel 0 of `buffer` as a 16-bit PCM mono WAV file.
pub fn save_wav(buffer: &RecordedBuffer, path: &Path) -> Result<()> {
    let samples = buffer
        .channel_data(0)
        .ok_or_else(|| anyhow!("Recording has no audio channels"))?;

    let wav_spec = hound::WavSpec {
        channels: 1,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, wav_spec)?;
    for &sample in samples.iter() {
        writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;

    let file_size = std::fs::metadata(path)?.len();
    tracing::info!("Audio saved: {} ({} bytes)", path.display(), file_size);
    Ok(())
}

/// Finds an audio input device by name or numeric index.
///
/// # Errors
/// - If no device with the specified name/index is found
fn find_device_by_name(host: &cpal::Host, device_spec: &str) -> Result<cpal::Device> {
    if let Ok(index) = device_spec.parse::<usize>() {
        let devices: Vec<_> = host
            .input_devices()
            .map_err(|e| anyhow!("Failed to enumerate devices: {e}"))?
            .collect();
        let count = devices.len();
        return devices.into_iter().nth(index).ok_or_else(|| {
            anyhow!(
                "Device index {} is out of range (0-{})",
                index,
                count.saturating_sub(1)
            )
        });
    }

    let devices = host
        .input_devices()
        .map_err(|e| anyhow!("Failed to enumerate devices: {e}"))?;
    for device in devices {
        if device.name().is_ok_and(|name| name == device_spec) {
            return Ok(device);
        }
    }

    Err(anyhow!(
        "Audio input device '{device_spec}' not found. Use 'wavebar list-devices' to see available devices."
    ))
}

/// Temporarily redirects stderr to /dev/null to suppress ALSA library warnings on Linux.
#[cfg(target_os = "linux")]
pub(crate) fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let dev_null = OpenOptions::new()
        .write(true)
        .open("/dev/null")
        .map_err(|e| anyhow!("Failed to open /dev/null: {e}"))?;
    let dev_null_fd = dev_null.as_raw_fd();

    let old_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if old_stderr == -1 {
        return Err(anyhow!("Failed to duplicate stderr"));
    }

    let redirect_result = unsafe { libc::dup2(dev_null_fd, libc::STDERR_FILENO) };
    if redirect_result == -1 {
        unsafe { libc::close(old_stderr) };
        return Err(anyhow!("Failed to redirect stderr"));
    }

    let result = f();

    unsafe {
        libc::dup2(old_stderr, libc::STDERR_FILENO);
        libc::close(old_stderr);
    }

    result
}

/// No ALSA outside Linux, nothing to suppress.
#[cfg(not(target_os = "linux"))]
pub(crate) fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    f()
}
