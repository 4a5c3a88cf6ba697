//! Engine facade: one drawing surface, both rendering modes.
//!
//! The host calls [`WaveformVisualizer::resize`] whenever it has a resize
//! notification and [`WaveformVisualizer::tick`] once per frame with the
//! current control state. Everything else (debouncing, background
//! extraction, picking the right renderer) happens in here.

use std::sync::Arc;
use std::time::Instant;

use super::bars::{BarLayout, BarSequence, ExtractOptions};
use super::blob::BlobRenderer;
use super::geometry::{ContainerSize, Geometry};
use super::host::{ControlState, HostEvents, WaveformOptions};
use super::live::LiveRenderer;
use super::offload::{ExtractionJob, JobOrigin, OffloadCoordinator};
use super::resize::{GeometryChange, ResizeCoordinator, ResizeSignal};
use super::surface::{BarRect, PixelSurface, Surface};

/// What the last tick painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Idle,
    Live,
    Recorded,
}

pub struct WaveformVisualizer {
    options: WaveformOptions,
    resize: ResizeCoordinator,
    offload: OffloadCoordinator,
    live: LiveRenderer,
    blob: BlobRenderer,
    surface: PixelSurface,
    layout: BarLayout,
    viewport_width: f32,
    source: Option<Arc<[f32]>>,
    bars: Option<Arc<BarSequence>>,
    bars_revision: u64,
    was_recording: bool,
    canvas_reset_sent: bool,
    mode: RenderMode,
}

impl WaveformVisualizer {
    pub fn new(options: WaveformOptions, resize: ResizeCoordinator, offload: OffloadCoordinator) -> Self {
        Self {
            options,
            resize,
            offload,
            live: LiveRenderer::new(),
            blob: BlobRenderer::new(),
            surface: PixelSurface::new(0, 0),
            layout: BarLayout::new(0, 0),
            viewport_width: 0.0,
            source: None,
            bars: None,
            bars_revision: 0,
            was_recording: false,
            canvas_reset_sent: false,
            mode: RenderMode::Idle,
        }
    }

    pub fn surface(&self) -> &PixelSurface {
        &self.surface
    }

    pub fn geometry(&self) -> Geometry {
        self.resize.geometry()
    }

    pub fn layout(&self) -> BarLayout {
        self.layout
    }

    pub fn bars(&self) -> Option<&Arc<BarSequence>> {
        self.bars.as_ref()
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn options(&self) -> &WaveformOptions {
        &self.options
    }

    /// Extraction runs off the interactive thread.
    pub fn is_background_extraction(&self) -> bool {
        self.offload.is_background()
    }

    /// A debounced resize or an extraction is still outstanding.
    pub fn is_busy(&self) -> bool {
        self.resize.is_resizing() || self.offload.is_pending()
    }

    /// Sizes the surface for the first time. `viewport_width` is the logical
    /// width of the whole window, used for the narrow-viewport bar policy.
    pub fn mount(&mut self, container: ContainerSize, viewport_width: f32, now: Instant) {
        self.viewport_width = viewport_width;
        let geometry = self.resize.mount(container, now);
        self.apply_geometry(geometry);
    }

    /// Forwards a resize notification.
    pub fn resize(
        &mut self,
        signal: ResizeSignal,
        viewport_width: f32,
        control: &ControlState<'_>,
        events: &mut dyn HostEvents,
        now: Instant,
    ) {
        self.viewport_width = viewport_width;
        let has_buffer = self.shows_recorded_buffer(control);
        if let Some(change) = self.resize.notify(signal, has_buffer, now) {
            self.on_geometry_change(change, events);
        }
    }

    /// Swaps presentation options. Options that change extraction trigger a
    /// fresh pass over the recorded buffer.
    pub fn set_options(&mut self, options: WaveformOptions, events: &mut dyn HostEvents) {
        if options == self.options {
            return;
        }
        let reextract = self.options.affects_extraction(&options);
        self.options = options;
        self.apply_geometry(self.resize.geometry());
        if reextract && self.source.is_some() {
            self.submit(JobOrigin::Resize, events);
        }
    }

    /// Runs one frame: resize timers, extraction bookkeeping, then paints.
    pub fn tick(
        &mut self,
        control: &ControlState<'_>,
        container: ContainerSize,
        events: &mut dyn HostEvents,
        now: Instant,
    ) -> RenderMode {
        let has_buffer = self.shows_recorded_buffer(control);
        if let Some(change) = self.resize.poll(now, container, has_buffer) {
            self.on_geometry_change(change, events);
        }

        if control.is_cleared {
            self.clear();
        }
        if control.is_recording_in_progress && !self.was_recording {
            tracing::debug!("Recording started; resetting live waveform");
            self.live.reset();
        }
        self.was_recording = control.is_recording_in_progress;

        if has_buffer {
            self.track_recorded_buffer(control, events);
        }
        if let Some(bars) = self.offload.poll(events) {
            self.bars = Some(bars);
            self.bars_revision += 1;
        }

        self.mode = self.render(control, events);
        self.mode
    }

    /// Scrubs to the time under pixel column `x`. Returns the new time.
    pub fn seek(
        &mut self,
        x: f32,
        control: &ControlState<'_>,
        events: &mut dyn HostEvents,
    ) -> Option<f64> {
        if !self.shows_recorded_buffer(control) || control.duration <= 0.0 {
            return None;
        }
        let time = BlobRenderer::time_at(x, self.surface.size().0, control.duration);
        events.set_current_audio_time(time);
        Some(time)
    }

    fn shows_recorded_buffer(&self, control: &ControlState<'_>) -> bool {
        !self.options.only_recording && control.has_recorded_buffer()
    }

    fn track_recorded_buffer(&mut self, control: &ControlState<'_>, events: &mut dyn HostEvents) {
        let Some(samples) = control.recorded_buffer.and_then(|b| b.channel_data(0)) else {
            return;
        };

        let is_new = !self
            .source
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, &samples));
        if is_new {
            tracing::info!("New recorded buffer: {} samples", samples.len());
            self.source = Some(samples);
            self.bars = None;
            self.submit(JobOrigin::Initial, events);
            return;
        }

        // Geometry may have moved on while the buffer was hidden.
        let stale = self.bars.as_ref().is_some_and(|bars| {
            let geometry = self.resize.geometry();
            !bars.matches(geometry.pixel_width, geometry.pixel_height, self.layout)
        });
        if stale && !self.offload.is_pending() && !self.resize.is_resizing() {
            self.submit(JobOrigin::Resize, events);
        }
    }

    fn submit(&mut self, origin: JobOrigin, events: &mut dyn HostEvents) {
        let Some(samples) = self.source.clone() else {
            return;
        };
        let job = ExtractionJob {
            samples,
            geometry: self.resize.geometry(),
            layout: self.layout,
            options: ExtractOptions {
                polarity: self.options.polarity,
                normalize: self.options.normalize,
            },
        };
        self.offload.submit(job, origin, events);
    }

    fn on_geometry_change(&mut self, change: GeometryChange, events: &mut dyn HostEvents) {
        self.apply_geometry(change.geometry);
        if change.recompute && self.source.is_some() {
            self.submit(JobOrigin::Resize, events);
        }
    }

    fn apply_geometry(&mut self, geometry: Geometry) {
        self.surface.resize(geometry.pixel_width, geometry.pixel_height);
        self.layout = BarLayout::resolve(
            self.options.bar_width,
            self.options.gap,
            self.viewport_width,
            geometry.device_pixel_ratio,
        );
        self.live.configure(
            geometry.pixel_width,
            geometry.pixel_height,
            self.layout,
            self.options.fullscreen,
        );
        self.blob.invalidate();
    }

    fn clear(&mut self) {
        if self.source.is_some() || !self.live.picks().is_empty() {
            tracing::debug!("Waveform cleared");
        }
        self.source = None;
        self.bars = None;
        self.live.reset();
        self.blob.invalidate();
    }

    fn render(&mut self, control: &ControlState<'_>, events: &mut dyn HostEvents) -> RenderMode {
        if self.options.only_recording && control.is_available_recorded_audio {
            if !self.canvas_reset_sent {
                self.canvas_reset_sent = true;
                events.clear_canvas();
            }
            self.paint_idle();
            return RenderMode::Idle;
        }
        self.canvas_reset_sent = false;

        if control.is_recording_in_progress {
            self.live
                .on_feed(control.audio_data, control.is_paused_recording, &self.options);
            self.live.draw(&mut self.surface, &self.options);
            return RenderMode::Live;
        }

        if self.shows_recorded_buffer(control) {
            // Bars extracted for an older geometry wait for their replacement.
            let (width, height) = self.surface.size();
            let current = self
                .bars
                .as_ref()
                .filter(|bars| bars.matches(width, height, self.layout));
            if let Some(bars) = current {
                self.blob.paint(
                    &mut self.surface,
                    bars,
                    self.bars_revision,
                    control.current_audio_time,
                    control.duration,
                    &self.options,
                );
                return RenderMode::Recorded;
            }
        }

        self.paint_idle();
        RenderMode::Idle
    }

    fn paint_idle(&mut self) {
        self.blob.invalidate();
        self.surface.clear(self.options.background_color);
        let (width, height) = self.surface.size();
        if width == 0 || height == 0 {
            return;
        }
        self.surface.fill_bar(
            BarRect {
                x: 0.0,
                y: height as f32 / 2.0 - 1.0,
                width: width as f32,
                height: 2.0,
            },
            0.0,
            self.options.secondary_bar_color,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::host::RecordedBuffer;
    use crate::waveform::resize::{ResizeStrategy, DEFAULT_DEBOUNCE};
    use crate::waveform::surface::Rgba;
    use crate::waveform::testing::{EventLog, HostEvent};
    use std::time::Duration;

    fn visualizer(options: WaveformOptions) -> WaveformVisualizer {
        WaveformVisualizer::new(
            options,
            ResizeCoordinator::new(ResizeStrategy::Observer, DEFAULT_DEBOUNCE, 1.0),
            OffloadCoordinator::inline(),
        )
    }

    fn recording() -> RecordedBuffer {
        let samples = (0..48_000).map(|i| (i as f32 * 0.003).sin() * 0.7).collect();
        RecordedBuffer::mono(samples, 48_000)
    }

    fn playback(buffer: &RecordedBuffer, time: f64) -> ControlState<'_> {
        ControlState {
            recorded_buffer: Some(buffer),
            current_audio_time: time,
            duration: buffer.duration(),
            is_available_recorded_audio: true,
            ..ControlState::default()
        }
    }

    fn submissions(events: &EventLog) -> usize {
        events
            .events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    HostEvent::ProcessingOnResize(true) | HostEvent::ProcessingAudioOnComplete(true)
                )
            })
            .count()
    }

    #[test]
    fn test_recorded_buffer_is_extracted_once() {
        let buffer = recording();
        let mut viz = visualizer(WaveformOptions::default());
        let mut events = EventLog::default();
        let container = ContainerSize::new(400.0, 200.0);
        let now = Instant::now();
        viz.mount(container, 1024.0, now);

        let control = playback(&buffer, 0.0);
        assert_eq!(viz.tick(&control, container, &mut events, now), RenderMode::Recorded);
        assert_eq!(viz.bars().unwrap().len(), 100);
        viz.tick(&control, container, &mut events, now);
        assert_eq!(submissions(&events), 1);
    }

    #[test]
    fn test_resize_during_playback_reextracts_once() {
        let buffer = recording();
        let mut viz = visualizer(WaveformOptions::default());
        let mut events = EventLog::default();
        let start = Instant::now();
        let small = ContainerSize::new(400.0, 200.0);
        let large = ContainerSize::new(800.0, 200.0);
        viz.mount(small, 1024.0, start);

        let control = playback(&buffer, 0.25);
        viz.tick(&control, small, &mut events, start);
        let before = viz.bars().unwrap().clone();

        for step in 0..5u64 {
            let at = start + Duration::from_millis(20 * step);
            viz.resize(ResizeSignal::Layout(large), 1024.0, &control, &mut events, at);
            viz.tick(&control, large, &mut events, at);
        }
        assert!(viz.is_busy());
        assert!(Arc::ptr_eq(viz.bars().unwrap(), &before));

        let settled = start + Duration::from_millis(80) + DEFAULT_DEBOUNCE;
        viz.tick(&control, large, &mut events, settled);
        viz.tick(&control, large, &mut events, settled + Duration::from_secs(1));

        let after = viz.bars().unwrap();
        assert_eq!(before.len(), 100);
        assert_eq!(after.len(), 200);
        assert_eq!(viz.surface().size(), (800, 200));
        assert_eq!(submissions(&events), 2);
        assert!(events.events.contains(&HostEvent::ProcessingOnResize(false)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_background_resize_never_paints_old_bars() {
        let samples = (0..4_800_000).map(|i| (i as f32 * 0.003).sin() * 0.7).collect();
        let buffer = RecordedBuffer::mono(samples, 48_000);
        let options = WaveformOptions {
            background_color: Rgba::rgb(0, 0, 0),
            rounded: 0.0,
            ..WaveformOptions::default()
        };
        let mut viz = WaveformVisualizer::new(
            options.clone(),
            ResizeCoordinator::new(ResizeStrategy::Observer, DEFAULT_DEBOUNCE, 1.0),
            OffloadCoordinator::new(),
        );
        let mut events = EventLog::default();
        let start = Instant::now();
        let small = ContainerSize::new(400.0, 200.0);
        let large = ContainerSize::new(800.0, 200.0);
        viz.mount(small, 1024.0, start);

        let control = playback(&buffer, buffer.duration());
        let mut at = start;
        for _ in 0..2_000 {
            viz.tick(&control, small, &mut events, at);
            if viz.bars().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
            at += Duration::from_millis(5);
        }
        assert_eq!(viz.bars().unwrap().len(), 100);

        viz.resize(ResizeSignal::Layout(large), 1024.0, &control, &mut events, at);
        at += DEFAULT_DEBOUNCE;
        let mode = viz.tick(&control, large, &mut events, at);
        assert_eq!(viz.surface().size(), (800, 200));
        if viz.bars().is_some_and(|bars| bars.width() == 400) {
            // Old bars are held back until the new extraction lands.
            assert_eq!(mode, RenderMode::Idle);
            assert_ne!(viz.surface().pixel(396, 100), Some(options.main_bar_color));
        }

        for _ in 0..2_000 {
            if viz.bars().is_some_and(|bars| bars.width() == 800) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
            at += Duration::from_millis(5);
            viz.tick(&control, large, &mut events, at);
        }
        assert_eq!(viz.tick(&control, large, &mut events, at), RenderMode::Recorded);
        assert_eq!(viz.bars().unwrap().len(), 200);
        assert_eq!(viz.surface().pixel(796, 100), Some(options.main_bar_color));
        assert_eq!(submissions(&events), 2);
    }

    #[test]
    fn test_stale_bars_are_not_painted() {
        let buffer = recording();
        let mut viz = visualizer(WaveformOptions::default());
        let mut events = EventLog::default();
        let container = ContainerSize::new(400.0, 200.0);
        let now = Instant::now();
        viz.mount(container, 1024.0, now);
        let control = playback(&buffer, 0.0);
        viz.tick(&control, container, &mut events, now);

        viz.apply_geometry(Geometry::from_container(ContainerSize::new(800.0, 200.0), 1.0));
        assert_eq!(viz.render(&control, &mut events), RenderMode::Idle);
        assert_eq!(viz.bars().unwrap().width(), 400);
    }

    #[test]
    fn test_live_mode_resizes_without_extraction() {
        let mut viz = visualizer(WaveformOptions::default());
        let mut events = EventLog::default();
        let now = Instant::now();
        viz.mount(ContainerSize::new(100.0, 40.0), 1024.0, now);

        let feed = [0.5_f32; 64];
        let control = ControlState {
            audio_data: &feed,
            is_recording_in_progress: true,
            ..ControlState::default()
        };
        assert_eq!(
            viz.tick(&control, ContainerSize::new(100.0, 40.0), &mut events, now),
            RenderMode::Live
        );
        viz.resize(
            ResizeSignal::Layout(ContainerSize::new(200.0, 40.0)),
            1024.0,
            &control,
            &mut events,
            now,
        );
        assert_eq!(viz.surface().size(), (200, 40));
        assert!(events.events.is_empty());
    }

    #[test]
    fn test_playhead_paints_played_bars() {
        let buffer = recording();
        let options = WaveformOptions {
            background_color: Rgba::rgb(0, 0, 0),
            rounded: 0.0,
            ..WaveformOptions::default()
        };
        let mut viz = visualizer(options.clone());
        let mut events = EventLog::default();
        let container = ContainerSize::new(400.0, 200.0);
        let now = Instant::now();
        viz.mount(container, 1024.0, now);

        let control = playback(&buffer, buffer.duration() / 2.0);
        viz.tick(&control, container, &mut events, now);
        let surface = viz.surface();
        assert_eq!(surface.pixel(0, 100), Some(options.main_bar_color));
        assert_eq!(surface.pixel(396, 100), Some(options.secondary_bar_color));
        assert_eq!(surface.pixel(2, 100), Some(Rgba::rgb(0, 0, 0)));
    }

    #[test]
    fn test_seek_reports_time() {
        let buffer = recording();
        let mut viz = visualizer(WaveformOptions::default());
        let mut events = EventLog::default();
        let container = ContainerSize::new(400.0, 200.0);
        let now = Instant::now();
        viz.mount(container, 1024.0, now);
        let control = playback(&buffer, 0.0);
        viz.tick(&control, container, &mut events, now);

        assert_eq!(viz.seek(100.0, &control, &mut events), Some(0.25));
        assert_eq!(events.events.last(), Some(&HostEvent::CurrentAudioTime(0.25)));
        assert_eq!(viz.seek(100.0, &ControlState::default(), &mut events), None);
    }

    #[test]
    fn test_only_recording_resets_canvas() {
        let buffer = recording();
        let mut viz = visualizer(WaveformOptions {
            only_recording: true,
            ..WaveformOptions::default()
        });
        let mut events = EventLog::default();
        let container = ContainerSize::new(400.0, 200.0);
        let now = Instant::now();
        viz.mount(container, 1024.0, now);

        let control = playback(&buffer, 0.0);
        assert_eq!(viz.tick(&control, container, &mut events, now), RenderMode::Idle);
        viz.tick(&control, container, &mut events, now);
        assert_eq!(events.events, vec![HostEvent::ClearCanvas]);
        assert!(viz.bars().is_none());
    }

    #[test]
    fn test_clear_drops_bars() {
        let buffer = recording();
        let mut viz = visualizer(WaveformOptions::default());
        let mut events = EventLog::default();
        let container = ContainerSize::new(400.0, 200.0);
        let now = Instant::now();
        viz.mount(container, 1024.0, now);
        viz.tick(&playback(&buffer, 0.0), container, &mut events, now);
        assert!(viz.bars().is_some());

        let cleared = ControlState {
            is_cleared: true,
            ..ControlState::default()
        };
        assert_eq!(viz.tick(&cleared, container, &mut events, now), RenderMode::Idle);
        assert!(viz.bars().is_none());
    }

    #[test]
    fn test_option_change_reextracts() {
        let buffer = recording();
        let mut viz = visualizer(WaveformOptions::default());
        let mut events = EventLog::default();
        let container = ContainerSize::new(400.0, 200.0);
        let now = Instant::now();
        viz.mount(container, 1024.0, now);
        let control = playback(&buffer, 0.0);
        viz.tick(&control, container, &mut events, now);

        viz.set_options(
            WaveformOptions {
                gap: 3,
                ..WaveformOptions::default()
            },
            &mut events,
        );
        viz.tick(&control, container, &mut events, now);
        assert_eq!(viz.bars().unwrap().len(), 50);
        assert_eq!(submissions(&events), 2);
    }

    #[test]
    fn test_narrow_viewport_widens_bars() {
        let mut viz = visualizer(WaveformOptions::default());
        viz.mount(ContainerSize::new(300.0, 100.0), 320.0, Instant::now());
        assert_eq!(viz.layout(), BarLayout::new(3, 1));
    }
}
