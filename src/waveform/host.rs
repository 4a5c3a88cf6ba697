//! The engine's boundary with the control layer that owns recording and
//! playback state.
//!
//! The control layer hands the engine a read-only [`ControlState`] every
//! frame and receives notifications back through [`HostEvents`]. The engine
//! never stores host state of its own beyond what it needs to render.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::bars::Polarity;
use super::surface::Rgba;

/// A decoded, fixed PCM buffer. Channel data is normalized to [-1, 1].
#[derive(Debug, Clone)]
pub struct RecordedBuffer {
    channels: Vec<Arc<[f32]>>,
    sample_rate: u32,
}

impl RecordedBuffer {
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            channels: vec![Arc::from(samples)],
            sample_rate,
        }
    }

    /// Builds a buffer from deinterleaved channels of equal length.
    pub fn from_channels(channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        Self {
            channels: channels.into_iter().map(Arc::from).collect(),
            sample_rate,
        }
    }

    /// Shared handle to one channel's samples.
    pub fn channel_data(&self, channel: usize) -> Option<Arc<[f32]>> {
        self.channels.get(channel).cloned()
    }

    pub fn number_of_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, |c| c.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }
}

/// Everything the engine reads from the control layer for one frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControlState<'a> {
    /// Most recent window of captured samples
    pub audio_data: &'a [f32],
    pub is_recording_in_progress: bool,
    pub is_paused_recording: bool,
    pub recorded_buffer: Option<&'a RecordedBuffer>,
    /// Playhead in seconds
    pub current_audio_time: f64,
    /// Recorded buffer length in seconds
    pub duration: f64,
    pub is_cleared: bool,
    /// The control layer is still decoding the recorded buffer
    pub is_processing_recorded_audio: bool,
    pub is_available_recorded_audio: bool,
}

impl ControlState<'_> {
    /// The recorded buffer is ready to be shown.
    pub fn has_recorded_buffer(&self) -> bool {
        self.is_available_recorded_audio
            && !self.is_processing_recorded_audio
            && self.recorded_buffer.is_some()
    }
}

/// Notifications the engine sends back to the control layer.
pub trait HostEvents {
    /// The user scrubbed to `time` seconds.
    fn set_current_audio_time(&mut self, time: f64);

    /// A resize-triggered extraction started (`true`) or finished (`false`).
    fn set_processing_on_resize(&mut self, processing: bool);

    /// The first extraction for a new buffer started or finished.
    fn set_processing_audio_on_complete(&mut self, processing: bool);

    /// Requests an idle reset of the drawing surface.
    fn clear_canvas(&mut self);
}

/// Presentation options. Only `bar_width`, `gap`, `polarity` and
/// `normalize` affect extraction; the rest only change how bars are painted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveformOptions {
    /// Bar width in logical pixels, before pixel density scaling
    pub bar_width: u32,
    /// Space between bars as a multiple of `bar_width`
    pub gap: u32,
    /// Corner radius of each bar
    pub rounded: f32,
    /// Frames between committed picks in the live view
    pub speed: u32,
    pub background_color: Rgba,
    /// Live bars and the played part of a recording
    pub main_bar_color: Rgba,
    /// Idle axis and the unplayed part of a recording
    pub secondary_bar_color: Rgba,
    /// Use the whole width for the live view instead of the left half
    pub fullscreen: bool,
    /// Draw the bar that is still being measured at the leading edge
    pub animate_current_pick: bool,
    /// Never show a recorded buffer; reset to idle instead
    pub only_recording: bool,
    pub polarity: Polarity,
    pub normalize: bool,
}

impl Default for WaveformOptions {
    fn default() -> Self {
        Self {
            bar_width: 2,
            gap: 1,
            rounded: 5.0,
            speed: 3,
            background_color: Rgba::TRANSPARENT,
            main_bar_color: Rgba::rgb(255, 255, 255),
            secondary_bar_color: Rgba::rgb(0x5e, 0x5e, 0x5e),
            fullscreen: false,
            animate_current_pick: true,
            only_recording: false,
            polarity: Polarity::Symmetric,
            normalize: false,
        }
    }
}

impl WaveformOptions {
    /// True when switching from `self` to `other` invalidates extracted bars.
    pub fn affects_extraction(&self, other: &WaveformOptions) -> bool {
        self.bar_width != other.bar_width
            || self.gap != other.gap
            || self.polarity != other.polarity
            || self.normalize != other.normalize
    }
}
