//! Live-stream waveform.
//!
//! Amplitudes arrive once per frame while recording. Every `speed` frames the
//! current amplitude is committed as a pick into a fixed-size ring that
//! covers exactly the visible window; between commits the whole window
//! scrolls left a fraction of a bar so motion stays smooth.

use super::bars::{peak_bar, Bar, BarLayout};
use super::host::WaveformOptions;
use super::surface::{paint_bar, BarRect, Surface};

/// Fixed-capacity ring of picks; `None` slots are the gaps between bars.
///
/// Pushing into a full buffer overwrites the oldest slot, so the buffer
/// never grows past the capacity it was sized for.
#[derive(Debug, Clone)]
pub struct PickBuffer {
    slots: Vec<Option<Bar>>,
    head: usize,
    len: usize,
}

impl PickBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            head: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push(&mut self, pick: Option<Bar>) {
        let capacity = self.capacity();
        if capacity == 0 {
            return;
        }
        self.slots[self.head] = pick;
        self.head = (self.head + 1) % capacity;
        self.len = (self.len + 1).min(capacity);
    }

    /// Slots from the most recent commit backwards.
    pub fn iter_newest_first(&self) -> impl Iterator<Item = Option<Bar>> + '_ {
        let capacity = self.capacity();
        (0..self.len).map(move |k| self.slots[(self.head + capacity - 1 - k) % capacity])
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.head = 0;
        self.len = 0;
    }

    /// Changes capacity, keeping the newest entries that still fit.
    pub fn resize(&mut self, capacity: usize) {
        let kept: Vec<Option<Bar>> = self.iter_newest_first().take(capacity).collect();
        *self = PickBuffer::new(capacity);
        for pick in kept.into_iter().rev() {
            self.push(pick);
        }
    }

    /// Rescales stored amplitudes, e.g. after the surface height changed.
    pub fn scale(&mut self, factor: f32) {
        for bar in self.slots.iter_mut().flatten() {
            bar.above *= factor;
            bar.below *= factor;
        }
    }
}

/// Width of the scrolling window: everything when fullscreen, otherwise the
/// left half with the idle axis on the right.
fn visible_width(width: u32, fullscreen: bool) -> u32 {
    if fullscreen {
        width
    } else {
        width / 2
    }
}

pub struct LiveRenderer {
    picks: PickBuffer,
    /// Position within the current unit; 0 commits a pick, the rest are gaps
    phase: u32,
    /// Frames since the last commit
    frames: u32,
    current: Bar,
    width: u32,
    height: u32,
    layout: BarLayout,
    fullscreen: bool,
}

impl Default for LiveRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveRenderer {
    pub fn new() -> Self {
        Self {
            picks: PickBuffer::new(0),
            phase: 0,
            frames: 0,
            current: Bar::SILENT,
            width: 0,
            height: 0,
            layout: BarLayout::new(0, 0),
            fullscreen: false,
        }
    }

    pub fn picks(&self) -> &PickBuffer {
        &self.picks
    }

    /// Adapts the pick buffer to new geometry, keeping the newest picks.
    pub fn configure(&mut self, width: u32, height: u32, layout: BarLayout, fullscreen: bool) {
        let visible = visible_width(width, fullscreen);
        let capacity = match layout.bar_width {
            0 => 0,
            bar_width => visible.div_ceil(bar_width) as usize + 1,
        };
        if capacity != self.picks.capacity() {
            self.picks.resize(capacity);
        }
        if height != self.height && self.height > 0 {
            self.picks.scale(height as f32 / self.height as f32);
        }
        if layout.gap != self.layout.gap {
            self.phase %= layout.gap.saturating_add(1);
        }

        self.width = width;
        self.height = height;
        self.layout = layout;
        self.fullscreen = fullscreen;
    }

    /// Clears picks and cursors for a new recording session.
    pub fn reset(&mut self) {
        self.picks.clear();
        self.phase = 0;
        self.frames = 0;
        self.current = Bar::SILENT;
    }

    /// Feeds one frame of samples. Returns whether a pick was committed.
    pub fn on_feed(&mut self, feed: &[f32], paused: bool, options: &WaveformOptions) -> bool {
        if paused {
            return false;
        }
        self.current = peak_bar(feed, self.height, options.polarity);

        let speed = options.speed.max(1);
        let mut committed = false;
        if self.frames >= speed || feed.is_empty() || self.picks.is_empty() {
            self.commit();
            self.frames = 0;
            committed = true;
        }
        self.frames += 1;
        committed
    }

    fn commit(&mut self) {
        let pick = (self.phase == 0).then_some(self.current);
        self.picks.push(pick);
        self.phase = (self.phase + 1) % self.layout.gap.saturating_add(1);
    }

    /// Repaints the whole visible window.
    pub fn draw<S: Surface + ?Sized>(&self, surface: &mut S, options: &WaveformOptions) {
        let (width, height) = surface.size();
        surface.clear(options.background_color);
        if width == 0 || height == 0 {
            return;
        }

        let visible = visible_width(width, options.fullscreen) as f32;
        if !options.fullscreen {
            surface.fill_bar(
                BarRect {
                    x: visible,
                    y: height as f32 / 2.0 - 1.0,
                    width: width as f32 - visible,
                    height: 2.0,
                },
                0.0,
                options.secondary_bar_color,
            );
        }

        let bar_width = self.layout.bar_width as f32;
        if bar_width <= 0.0 {
            return;
        }
        let speed = options.speed.max(1);
        let offset = bar_width * self.frames.min(speed) as f32 / speed as f32;

        for (k, slot) in self.picks.iter_newest_first().enumerate() {
            let x = visible - (k as f32 + 1.0) * bar_width - offset;
            if x + bar_width <= 0.0 {
                break;
            }
            if let Some(bar) = slot {
                paint_bar(surface, x, bar_width, bar, options.rounded, options.main_bar_color);
            }
        }

        if options.animate_current_pick && self.phase == 0 && offset > 0.0 {
            paint_bar(
                surface,
                visible - offset,
                bar_width,
                self.current,
                options.rounded,
                options.main_bar_color,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::surface::Rgba;
    use crate::waveform::testing::DrawLog;

    fn options(speed: u32, fullscreen: bool) -> WaveformOptions {
        WaveformOptions {
            speed,
            fullscreen,
            animate_current_pick: false,
            background_color: Rgba::rgb(0, 0, 0),
            ..WaveformOptions::default()
        }
    }

    fn pick(amplitude: f32) -> Option<Bar> {
        Some(Bar { above: amplitude, below: amplitude })
    }

    #[test]
    fn test_pick_buffer_wraps_at_capacity() {
        let mut buffer = PickBuffer::new(3);
        for i in 0..10 {
            buffer.push(pick(i as f32));
            assert!(buffer.len() <= 3);
        }
        let newest: Vec<_> = buffer.iter_newest_first().collect();
        assert_eq!(newest, vec![pick(9.0), pick(8.0), pick(7.0)]);
    }

    #[test]
    fn test_pick_buffer_resize_keeps_newest() {
        let mut buffer = PickBuffer::new(5);
        for i in 0..5 {
            buffer.push(pick(i as f32));
        }
        buffer.resize(2);
        assert_eq!(buffer.iter_newest_first().collect::<Vec<_>>(), vec![pick(4.0), pick(3.0)]);
        buffer.resize(4);
        assert_eq!(buffer.len(), 2);
        buffer.push(pick(5.0));
        assert_eq!(
            buffer.iter_newest_first().collect::<Vec<_>>(),
            vec![pick(5.0), pick(4.0), pick(3.0)]
        );
    }

    #[test]
    fn test_zero_capacity_ignores_pushes() {
        let mut buffer = PickBuffer::new(0);
        buffer.push(pick(1.0));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_capacity_follows_visible_width() {
        let mut live = LiveRenderer::new();
        live.configure(100, 40, BarLayout::new(2, 0), true);
        assert_eq!(live.picks().capacity(), 51);
        live.configure(100, 40, BarLayout::new(2, 0), false);
        assert_eq!(live.picks().capacity(), 26);

        let opts = options(1, false);
        for _ in 0..1_000 {
            live.on_feed(&[0.5], false, &opts);
        }
        assert_eq!(live.picks().len(), 26);
    }

    #[test]
    fn test_speed_throttles_commits() {
        let mut live = LiveRenderer::new();
        live.configure(100, 40, BarLayout::new(2, 0), true);
        let opts = options(3, true);
        let commits = (0..10).filter(|_| live.on_feed(&[0.5], false, &opts)).count();
        assert_eq!(commits, 4);
    }

    #[test]
    fn test_empty_feed_commits_every_frame() {
        let mut live = LiveRenderer::new();
        live.configure(100, 40, BarLayout::new(2, 0), true);
        let opts = options(3, true);
        let commits = (0..3).filter(|_| live.on_feed(&[], false, &opts)).count();
        assert_eq!(commits, 3);
        let silent = live.picks().iter_newest_first().all(|p| p == Some(Bar::SILENT));
        assert!(silent);
        assert!(!live.on_feed(&[], true, &opts));
    }

    #[test]
    fn test_huge_gap_does_not_overflow() {
        let mut live = LiveRenderer::new();
        live.configure(100, 40, BarLayout::new(2, u32::MAX), true);
        let opts = options(1, true);
        live.on_feed(&[0.5], false, &opts);
        live.on_feed(&[0.5], false, &opts);
        live.configure(100, 40, BarLayout::new(2, 1), true);
        let slots: Vec<bool> = live.picks().iter_newest_first().map(|p| p.is_some()).collect();
        assert_eq!(slots, vec![false, true]);
    }

    #[test]
    fn test_gap_slots_alternate() {
        let mut live = LiveRenderer::new();
        live.configure(100, 40, BarLayout::new(2, 1), true);
        let opts = options(1, true);
        for _ in 0..4 {
            live.on_feed(&[1.0], false, &opts);
        }
        let slots: Vec<bool> = live.picks().iter_newest_first().map(|p| p.is_some()).collect();
        assert_eq!(slots, vec![false, true, false, true]);
    }

    #[test]
    fn test_commits_are_ordered_by_arrival() {
        let mut live = LiveRenderer::new();
        live.configure(100, 40, BarLayout::new(2, 0), true);
        let opts = options(1, true);
        for amplitude in [0.1, 0.2, 0.3] {
            live.on_feed(&[amplitude], false, &opts);
        }
        let amplitudes: Vec<f32> = live
            .picks()
            .iter_newest_first()
            .map(|p| p.unwrap().above)
            .collect();
        assert_eq!(amplitudes.len(), 3);
        assert!(amplitudes[0] > amplitudes[1] && amplitudes[1] > amplitudes[2]);
    }

    #[test]
    fn test_pause_freezes_buffer() {
        let mut live = LiveRenderer::new();
        live.configure(100, 40, BarLayout::new(2, 0), true);
        let opts = options(1, true);
        live.on_feed(&[0.5], false, &opts);
        for _ in 0..20 {
            assert!(!live.on_feed(&[1.0], true, &opts));
        }
        assert_eq!(live.picks().len(), 1);

        let mut surface = DrawLog::new(100, 40);
        live.draw(&mut surface, &opts);
        assert_eq!(surface.bars().len(), 1);
    }

    #[test]
    fn test_draw_places_newest_at_visible_edge() {
        let mut live = LiveRenderer::new();
        live.configure(100, 40, BarLayout::new(2, 0), false);
        let opts = options(1, false);
        live.on_feed(&[0.5], false, &opts);
        live.on_feed(&[0.25], false, &opts);

        let mut surface = DrawLog::new(100, 40);
        live.draw(&mut surface, &opts);
        let bars = surface.bars();

        // idle axis on the right half, two picks left of it
        assert_eq!(bars.len(), 3);
        let (axis, axis_color) = bars[2];
        assert_eq!((axis.x, axis.width, axis.height), (50.0, 50.0, 2.0));
        assert_eq!(axis_color, opts.secondary_bar_color);

        let (newest, color) = bars[1];
        assert_eq!(color, opts.main_bar_color);
        assert_eq!(newest.x + newest.width, 50.0 - 2.0);
        assert_eq!(newest.height, 10.0);
        assert_eq!(newest.y, 15.0);
    }

    #[test]
    fn test_animated_pick_at_leading_edge() {
        let mut live = LiveRenderer::new();
        live.configure(100, 40, BarLayout::new(2, 0), true);
        let opts = WaveformOptions {
            animate_current_pick: true,
            ..options(2, true)
        };
        live.on_feed(&[0.5], false, &opts);
        let mut surface = DrawLog::new(100, 40);
        live.draw(&mut surface, &opts);
        let bars = surface.bars();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].0.x, 99.0);
    }

    #[test]
    fn test_height_change_rescales_picks() {
        let mut live = LiveRenderer::new();
        live.configure(100, 40, BarLayout::new(2, 0), true);
        live.on_feed(&[1.0], false, &options(1, true));
        live.configure(100, 80, BarLayout::new(2, 0), true);
        let first = live.picks().iter_newest_first().next().flatten().unwrap();
        assert_eq!(first.above, 40.0);
    }

    #[test]
    fn test_reset_clears_session() {
        let mut live = LiveRenderer::new();
        live.configure(100, 40, BarLayout::new(2, 0), true);
        live.on_feed(&[1.0], false, &options(1, true));
        live.reset();
        assert!(live.picks().is_empty());
    }
}
