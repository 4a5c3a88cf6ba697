//! Interactive session shared by `record` and `play`.
//!
//! Owns the control-layer state the engine reads each frame (recorder,
//! recorded buffer, player) and applies what the engine reports back.

use anyhow::Context;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::WavebarConfig;
use crate::playback::Player;
use crate::recording::{save_wav, AudioRecorder};
use crate::ui::canvas::{container_for, surface_x};
use crate::ui::terminal::split;
use crate::ui::{Footer, Input, Status, WavebarTui};
use crate::waveform::{
    ControlState, HostEvents, OffloadCoordinator, RecordedBuffer, ResizeCoordinator,
    ResizeEnvironment, ResizeSignal, WaveformVisualizer,
};
use ratatui::layout::Rect;

const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Terminal cells map one to one onto surface pixels horizontally.
const DEVICE_PIXEL_RATIO: f32 = 1.0;

/// What the session opens with.
pub enum Start {
    Record,
    Play(RecordedBuffer),
}

/// Engine notifications, collected for the frame loop to act on.
#[derive(Debug, Default)]
struct HostFlags {
    processing_on_resize: bool,
    processing_on_complete: bool,
    seek_to: Option<f64>,
    canvas_resets: u32,
}

impl HostEvents for HostFlags {
    fn set_current_audio_time(&mut self, time: f64) {
        self.seek_to = Some(time);
    }

    fn set_processing_on_resize(&mut self, processing: bool) {
        tracing::trace!("Processing on resize: {processing}");
        self.processing_on_resize = processing;
    }

    fn set_processing_audio_on_complete(&mut self, processing: bool) {
        tracing::trace!("Processing recorded audio: {processing}");
        self.processing_on_complete = processing;
    }

    fn clear_canvas(&mut self) {
        self.canvas_resets += 1;
        tracing::debug!("Canvas reset requested");
    }
}

enum Phase {
    Idle,
    Recording(AudioRecorder),
    Review {
        buffer: RecordedBuffer,
        player: Player,
    },
}

struct Session {
    phase: Phase,
    flags: HostFlags,
    /// Most recent chunk of live samples
    feed: Vec<f32>,
    /// Raised for exactly one frame after a clear or a new recording
    cleared: bool,
    device: String,
    sample_rate: u32,
    output: Option<PathBuf>,
    quit: bool,
}

impl Session {
    fn new(config: &WavebarConfig, output: Option<PathBuf>) -> Self {
        Self {
            phase: Phase::Idle,
            flags: HostFlags::default(),
            feed: Vec::new(),
            cleared: false,
            device: config.audio.device.clone(),
            sample_rate: config.audio.sample_rate,
            output,
            quit: false,
        }
    }

    fn start_recording(&mut self) -> anyhow::Result<()> {
        let mut recorder = AudioRecorder::new(self.sample_rate, self.device.clone());
        recorder
            .start_recording()
            .context("Failed to start recording")?;
        self.phase = Phase::Recording(recorder);
        self.feed.clear();
        self.cleared = true;
        Ok(())
    }

    fn stop_recording(&mut self) -> anyhow::Result<()> {
        let Phase::Recording(recorder) = &mut self.phase else {
            return Ok(());
        };
        let buffer = recorder.stop_recording();
        self.feed.clear();
        if buffer.is_empty() {
            self.phase = Phase::Idle;
            return Ok(());
        }
        if let Some(path) = &self.output {
            save_wav(&buffer, path)
                .with_context(|| format!("Failed to save recording to {}", path.display()))?;
        }
        self.review(buffer, Player::open);
        Ok(())
    }

    fn review(&mut self, buffer: RecordedBuffer, open: impl FnOnce(&RecordedBuffer) -> Player) {
        let player = open(&buffer);
        self.phase = Phase::Review { buffer, player };
    }

    /// Applies one input. Scrubbing is routed through the visualizer by the
    /// caller since it needs the pane geometry.
    fn handle(&mut self, input: Input) -> anyhow::Result<()> {
        let recording = matches!(self.phase, Phase::Recording(_));
        match input {
            Input::Quit => self.quit = true,
            Input::Confirm if recording => self.stop_recording()?,
            Input::Record if !recording => self.start_recording()?,
            Input::Clear if matches!(self.phase, Phase::Review { .. }) => {
                tracing::info!("Recording discarded");
                self.phase = Phase::Idle;
                self.cleared = true;
            }
            Input::TogglePause => match &mut self.phase {
                Phase::Recording(recorder) => recorder.toggle_pause(),
                Phase::Review { player, .. } => player.toggle_pause(),
                Phase::Idle => {}
            },
            Input::SeekBy(delta) => {
                if let Phase::Review { player, .. } = &mut self.phase {
                    player.seek(player.current_time() + delta);
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Pulls this frame's live samples, keeping the last chunk when nothing
    /// new arrived.
    fn refresh_feed(&mut self) {
        if let Phase::Recording(recorder) = &mut self.phase {
            let fresh = recorder.take_feed();
            if !fresh.is_empty() {
                self.feed = fresh;
            }
        }
    }

    /// Hands a scrub request from the engine to the player.
    fn apply_seek(&mut self) {
        if let Some(time) = self.flags.seek_to.take() {
            if let Phase::Review { player, .. } = &mut self.phase {
                player.seek(time);
            }
        }
    }

    fn footer(&self, busy: bool) -> Footer {
        let processing =
            busy || self.flags.processing_on_resize || self.flags.processing_on_complete;
        match &self.phase {
            Phase::Idle => Footer {
                status: Status::Idle,
                elapsed: 0.0,
                total: None,
                processing,
                silent_playback: false,
            },
            Phase::Recording(recorder) => Footer {
                status: if recorder.is_paused() {
                    Status::RecordingPaused
                } else {
                    Status::Recording
                },
                elapsed: recorder.sample_count() as f64 / recorder.sample_rate().max(1) as f64,
                total: None,
                processing,
                silent_playback: false,
            },
            Phase::Review { player, .. } => Footer {
                status: if player.is_paused() || player.is_finished() {
                    Status::PlaybackPaused
                } else {
                    Status::Playing
                },
                elapsed: player.current_time(),
                total: Some(player.duration()),
                processing,
                silent_playback: !player.has_output(),
            },
        }
    }
}

/// Builds the engine's view of the control layer.
fn control_state<'a>(phase: &'a Phase, feed: &'a [f32], cleared: bool) -> ControlState<'a> {
    match phase {
        Phase::Idle => ControlState {
            is_cleared: cleared,
            ..ControlState::default()
        },
        Phase::Recording(recorder) => ControlState {
            audio_data: feed,
            is_recording_in_progress: true,
            is_paused_recording: recorder.is_paused(),
            is_cleared: cleared,
            ..ControlState::default()
        },
        Phase::Review { buffer, player } => ControlState {
            recorded_buffer: Some(buffer),
            current_audio_time: player.current_time(),
            duration: player.duration(),
            is_cleared: cleared,
            is_available_recorded_audio: true,
            ..ControlState::default()
        },
    }
}

/// Runs the interactive loop until the user quits.
///
/// `stop` is polled every frame; when it is raised (SIGUSR1) an active
/// recording is stopped as if Enter had been pressed.
pub fn run(
    config: &WavebarConfig,
    start: Start,
    output: Option<PathBuf>,
    stop: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let mut session = Session::new(config, output);
    match start {
        Start::Record => session.start_recording()?,
        Start::Play(buffer) => session.review(buffer, Player::open),
    }

    let mut tui = WavebarTui::new()?;
    let strategy = config.resize.strategy.resolve(ResizeEnvironment::from_env());
    let mut viz = WaveformVisualizer::new(
        config.waveform.clone(),
        ResizeCoordinator::new(strategy, config.resize.debounce(), DEVICE_PIXEL_RATIO),
        OffloadCoordinator::new(),
    );

    let mut pane = tui.waveform_area()?;
    viz.mount(container_for(pane), pane.width as f32, Instant::now());
    tracing::debug!(
        "Entering session loop with {:?} resize strategy (background extraction: {})",
        strategy,
        viz.is_background_extraction()
    );

    let mut frame_count = 0u64;
    while !session.quit {
        if stop.swap(false, Ordering::Relaxed) {
            tracing::info!("Received SIGUSR1: stopping recording via external trigger");
            session.stop_recording()?;
        }

        match tui.next_input(FRAME_INTERVAL)? {
            Some(Input::Scrub(column)) => {
                if let Some(x) = surface_x(pane, column) {
                    let control = control_state(&session.phase, &session.feed, false);
                    viz.seek(x, &control, &mut session.flags);
                }
                session.apply_seek();
            }
            Some(Input::Resize(cols, rows)) => {
                let (area, _) = split(Rect::new(0, 0, cols, rows));
                let control = control_state(&session.phase, &session.feed, false);
                viz.resize(
                    ResizeSignal::Window(container_for(area)),
                    area.width as f32,
                    &control,
                    &mut session.flags,
                    Instant::now(),
                );
            }
            Some(input) => session.handle(input)?,
            None => {}
        }

        let now = Instant::now();
        let area = tui.waveform_area()?;
        if area != pane {
            pane = area;
            let control = control_state(&session.phase, &session.feed, false);
            viz.resize(
                ResizeSignal::Layout(container_for(area)),
                area.width as f32,
                &control,
                &mut session.flags,
                now,
            );
        }

        session.refresh_feed();
        let control = control_state(&session.phase, &session.feed, session.cleared);
        viz.tick(&control, container_for(pane), &mut session.flags, now);
        session.cleared = false;
        session.apply_seek();

        tui.draw(viz.surface(), &session.footer(viz.is_busy()))?;

        frame_count += 1;
        if frame_count.is_multiple_of(600) {
            tracing::debug!("Frame {}: {:?}", frame_count, viz.mode());
        }
    }

    tui.cleanup()?;
    tracing::debug!("Session ended after {} frames", frame_count);
    Ok(())
}
