//! Bar extraction: raw samples to a bounded sequence of amplitude bars.
//!
//! Pure functions only. Everything here is safe to run on a background
//! thread; inputs are borrowed and outputs are freshly allocated.

use serde::{Deserialize, Serialize};

/// Logical viewport width below which bars are widened by one pixel.
pub const NARROW_VIEWPORT_WIDTH: f32 = 768.0;

/// Share of half-height the loudest bar is lifted to when normalizing.
const NORMALIZE_HEADROOM: f32 = 0.95;

/// One visual column, in pixels already scaled to the target height.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bar {
    pub above: f32,
    pub below: f32,
}

impl Bar {
    pub const SILENT: Bar = Bar { above: 0.0, below: 0.0 };

    pub fn is_silent(&self) -> bool {
        self.above <= 0.0 && self.below <= 0.0
    }
}

/// How a chunk's samples map onto the two halves of a bar.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    /// Max |sample| mirrored above and below the axis
    #[default]
    Symmetric,
    /// Positive peak above the axis, negative peak below
    Signed,
}

/// Options that change extracted amplitudes but not the bar count.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExtractOptions {
    pub polarity: Polarity,
    /// Lift quiet recordings so the loudest bar reaches 95% of half-height.
    pub normalize: bool,
}

/// Resolved bar geometry in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarLayout {
    /// Bar width in device pixels
    pub bar_width: u32,
    /// Gap between bars, as a multiple of `bar_width`
    pub gap: u32,
}

impl BarLayout {
    pub fn new(bar_width: u32, gap: u32) -> Self {
        Self { bar_width, gap }
    }

    /// Resolves configured bar settings for a viewport.
    ///
    /// Narrow viewports (under 768 logical pixels) get one extra pixel of bar
    /// width whenever there is a gap, then everything is scaled by pixel density.
    pub fn resolve(bar_width: u32, gap: u32, viewport_width: f32, device_pixel_ratio: f32) -> Self {
        let widened = if viewport_width < NARROW_VIEWPORT_WIDTH && gap > 0 {
            bar_width.saturating_add(1)
        } else {
            bar_width
        };
        let dpr = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        Self {
            bar_width: (widened as f32 * dpr).round() as u32,
            gap,
        }
    }

    /// Horizontal pitch of one bar plus its gap.
    pub fn unit(&self) -> u32 {
        self.bar_width.saturating_add(self.gap.saturating_mul(self.bar_width))
    }

    /// Number of bars that fit into `width` pixels.
    pub fn bar_count(&self, width: u32) -> usize {
        match self.unit() {
            0 => 0,
            unit => (width / unit) as usize,
        }
    }
}

/// Immutable output of one extraction pass, tagged with the geometry it
/// was computed for.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSequence {
    bars: Vec<Bar>,
    width: u32,
    height: u32,
    layout: BarLayout,
}

impl BarSequence {
    pub fn empty(width: u32, height: u32, layout: BarLayout) -> Self {
        Self { bars: Vec::new(), width, height, layout }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layout(&self) -> BarLayout {
        self.layout
    }

    /// True when this sequence was extracted for exactly this geometry.
    pub fn matches(&self, width: u32, height: u32, layout: BarLayout) -> bool {
        self.width == width && self.height == height && self.layout == layout
    }
}

/// Downsamples `samples` into `floor(width / unit)` bars for a surface of
/// `width` x `height` pixels.
///
/// Samples are split into contiguous chunks whose lengths differ by at most
/// one. Each chunk contributes its peak, scaled so that 1.0 maps to half the
/// height. Chunks with no samples (more bars than samples) yield silent bars.
/// An empty buffer yields an empty sequence.
pub fn extract_bars(
    samples: &[f32],
    width: u32,
    height: u32,
    layout: BarLayout,
    options: ExtractOptions,
) -> BarSequence {
    let count = layout.bar_count(width);
    if samples.is_empty() || count == 0 {
        return BarSequence::empty(width, height, layout);
    }

    let len = samples.len();
    let mut bars: Vec<Bar> = (0..count)
        .map(|i| {
            let start = i * len / count;
            let end = (i + 1) * len / count;
            peak_bar(&samples[start..end], height, options.polarity)
        })
        .collect();

    if options.normalize {
        normalize(&mut bars, height);
    }

    BarSequence { bars, width, height, layout }
}

/// Peak of one chunk as a bar scaled to `height`.
pub fn peak_bar(chunk: &[f32], height: u32, polarity: Polarity) -> Bar {
    let half = height as f32 / 2.0;
    match polarity {
        Polarity::Symmetric => {
            let peak = chunk
                .iter()
                .map(|&s| sanitize(s).abs())
                .fold(0.0_f32, f32::max);
            let scaled = peak * half;
            Bar { above: scaled, below: scaled }
        }
        Polarity::Signed => {
            let (min, max) = chunk.iter().fold((0.0_f32, 0.0_f32), |(lo, hi), &s| {
                let s = sanitize(s);
                (lo.min(s), hi.max(s))
            });
            Bar { above: max * half, below: -min * half }
        }
    }
}

/// Non-finite samples count as silence; everything else is clamped into [-1, 1].
fn sanitize(sample: f32) -> f32 {
    if sample.is_finite() {
        sample.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

fn normalize(bars: &mut [Bar], height: u32) {
    let target = height as f32 / 2.0 * NORMALIZE_HEADROOM;
    let loudest = bars
        .iter()
        .map(|b| b.above.max(b.below))
        .fold(0.0_f32, f32::max);
    if loudest <= 0.0 || loudest >= target {
        return;
    }

    let factor = target / loudest;
    for bar in bars.iter_mut() {
        bar.above *= factor;
        bar.below *= factor;
    }
}
