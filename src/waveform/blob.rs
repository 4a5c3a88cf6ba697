//! Static waveform for a recorded buffer, recolored around the playhead.

use super::bars::BarSequence;
use super::host::WaveformOptions;
use super::surface::{paint_bar, Surface};

/// Inputs of the last paint; any difference triggers a full redraw.
#[derive(Debug, Clone, PartialEq)]
struct PaintKey {
    revision: u64,
    playhead: f64,
    duration: f64,
    size: (u32, u32),
    options: WaveformOptions,
}

#[derive(Default)]
pub struct BlobRenderer {
    last: Option<PaintKey>,
}

impl BlobRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forces the next [`Self::paint`] to redraw.
    pub fn invalidate(&mut self) {
        self.last = None;
    }

    /// Paints every bar of `bars`. Bars starting before the playhead use the
    /// main color, the rest the secondary color.
    ///
    /// `revision` identifies the bar sequence; paired with the playhead,
    /// duration, surface size and options it decides whether anything
    /// changed since the last paint. Returns whether a redraw happened.
    pub fn paint<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        bars: &BarSequence,
        revision: u64,
        playhead: f64,
        duration: f64,
        options: &WaveformOptions,
    ) -> bool {
        let key = PaintKey {
            revision,
            playhead,
            duration,
            size: surface.size(),
            options: options.clone(),
        };
        if self.last.as_ref() == Some(&key) {
            return false;
        }
        self.last = Some(key);

        surface.clear(options.background_color);
        let (width, height) = surface.size();
        if bars.is_empty() || width == 0 || height == 0 {
            return true;
        }

        let layout = bars.layout();
        let unit = layout.unit() as f64;
        let total_width = bars.width() as f64;
        for (i, bar) in bars.bars().iter().enumerate() {
            let left = i as f64 * unit;
            let color = if is_played(left, total_width, playhead, duration) {
                options.main_bar_color
            } else {
                options.secondary_bar_color
            };
            paint_bar(
                surface,
                left as f32,
                layout.bar_width as f32,
                *bar,
                options.rounded,
                color,
            );
        }
        true
    }

    /// Maps a pointer position on a surface `width` pixels wide to a time.
    pub fn time_at(x: f32, width: u32, duration: f64) -> f64 {
        if width == 0 || !duration.is_finite() || duration <= 0.0 {
            return 0.0;
        }
        (x as f64 / width as f64).clamp(0.0, 1.0) * duration
    }
}

/// A bar counts as played once the playhead moves past its left edge, so the
/// bar under the playhead is already colored as played.
fn is_played(left: f64, total_width: f64, playhead: f64, duration: f64) -> bool {
    if total_width <= 0.0 || !duration.is_finite() || duration <= 0.0 {
        return false;
    }
    left * duration / total_width < playhead
}
