//! WAV decoding into a [`RecordedBuffer`].

use anyhow::{anyhow, Context, Result};
use hound::{SampleFormat, WavReader};
use std::io::Read;
use std::path::Path;

use crate::waveform::RecordedBuffer;

/// Reads a WAV file and deinterleaves it into normalized f32 channels.
///
/// # Errors
/// - If the file cannot be opened or is not a valid WAV file
/// - If the sample format is unsupported
pub fn load_wav(path: &Path) -> Result<RecordedBuffer> {
    let reader =
        WavReader::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let buffer = decode(reader)?;
    tracing::info!(
        "Loaded {}: {} channel(s), {}Hz, {:.2}s",
        path.display(),
        buffer.number_of_channels(),
        buffer.sample_rate(),
        buffer.duration()
    );
    Ok(buffer)
}

fn decode<R: Read>(mut reader: WavReader<R>) -> Result<RecordedBuffer> {
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(anyhow!("WAV file declares no channels"));
    }

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader.samples::<f32>().collect::<Result<_, _>>()?,
        (SampleFormat::Int, bits @ 1..=32) => {
            let scale = (1_i64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
        (format, bits) => {
            return Err(anyhow!("Unsupported WAV sample format: {format:?} {bits}-bit"));
        }
    };

    let frames = interleaved.len() / channels;
    let mut planar = vec![Vec::with_capacity(frames); channels];
    for frame in interleaved.chunks_exact(channels) {
        for (channel, &sample) in planar.iter_mut().zip(frame) {
            channel.push(sample);
        }
    }
    Ok(RecordedBuffer::from_channels(planar, spec.sample_rate))
}
