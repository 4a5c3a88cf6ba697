//! Terminal user interface: waveform pane plus a one-line footer.
//!
//! The pane is a [`CanvasView`] over the engine's pixel surface. Input is
//! translated into [`Input`] values; the command loop decides what they mean
//! for the current session state.

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    text::{Line, Span},
    widgets::Paragraph,
};
use std::io::{stdout, Stdout};
use std::time::Duration;

use super::canvas::CanvasView;
use crate::waveform::PixelSurface;

const FOOTER_HEIGHT: u16 = 1;
const SEEK_STEP_SECS: f64 = 5.0;

/// User input, already mapped from raw terminal events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Input {
    /// Escape, 'q' or Ctrl+C
    Quit,
    /// Enter: stop recording
    Confirm,
    /// Space: pause or resume recording or playback
    TogglePause,
    /// Arrow keys: jump relative to the playhead, in seconds
    SeekBy(f64),
    /// 'r': start a new recording
    Record,
    /// 'c': discard the current recording
    Clear,
    /// Mouse press or drag over a terminal column
    Scrub(u16),
    /// Terminal window resized to columns x rows
    Resize(u16, u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Recording,
    RecordingPaused,
    Playing,
    PlaybackPaused,
}

/// What the footer line shows.
#[derive(Debug, Clone, PartialEq)]
pub struct Footer {
    pub status: Status,
    pub elapsed: f64,
    /// Known for recorded audio only
    pub total: Option<f64>,
    pub processing: bool,
    pub silent_playback: bool,
}

pub struct WavebarTui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    active: bool,
}

impl WavebarTui {
    /// Enters raw mode, the alternate screen and mouse capture.
    ///
    /// # Errors
    /// - If terminal cannot be initialized
    pub fn new() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self {
            terminal,
            active: true,
        })
    }

    /// Area currently available to the waveform pane.
    pub fn waveform_area(&self) -> anyhow::Result<Rect> {
        let size = self.terminal.size()?;
        Ok(split(Rect::new(0, 0, size.width, size.height)).0)
    }

    pub fn draw(&mut self, surface: &PixelSurface, footer: &Footer) -> anyhow::Result<()> {
        let line = footer_line(footer);
        self.terminal.draw(|frame| {
            let (pane, footer_area) = split(frame.area());
            frame.render_widget(CanvasView::new(surface), pane);
            frame.render_widget(
                Paragraph::new(line).style(
                    Style::default()
                        .fg(Color::Rgb(185, 207, 212))
                        .bg(Color::Rgb(0, 0, 0)),
                ),
                footer_area,
            );
        })?;
        Ok(())
    }

    /// Waits up to `timeout` for the next meaningful input.
    pub fn next_input(&mut self, timeout: Duration) -> anyhow::Result<Option<Input>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        Ok(match event::read()? {
            Event::Key(key) => map_key(key),
            Event::Mouse(mouse) => map_mouse(mouse),
            Event::Resize(cols, rows) => Some(Input::Resize(cols, rows)),
            _ => None,
        })
    }

    /// Restores the terminal. Safe to call more than once.
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            DisableMouseCapture,
            LeaveAlternateScreen
        )?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for WavebarTui {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Splits the screen into the waveform pane and the footer row.
pub fn split(area: Rect) -> (Rect, Rect) {
    let footer_height = FOOTER_HEIGHT.min(area.height);
    let pane = Rect {
        height: area.height - footer_height,
        ..area
    };
    let footer = Rect {
        y: area.y + pane.height,
        height: footer_height,
        ..area
    };
    (pane, footer)
}

fn map_key(key: KeyEvent) -> Option<Input> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            tracing::debug!("Ctrl+C pressed");
            Some(Input::Quit)
        }
        KeyCode::Char('q') | KeyCode::Esc => Some(Input::Quit),
        KeyCode::Enter => Some(Input::Confirm),
        KeyCode::Char(' ') => Some(Input::TogglePause),
        KeyCode::Left => Some(Input::SeekBy(-SEEK_STEP_SECS)),
        KeyCode::Right => Some(Input::SeekBy(SEEK_STEP_SECS)),
        KeyCode::Char('r') => Some(Input::Record),
        KeyCode::Char('c') => Some(Input::Clear),
        _ => None,
    }
}

fn map_mouse(mouse: MouseEvent) -> Option<Input> {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) | MouseEventKind::Drag(MouseButton::Left) => {
            Some(Input::Scrub(mouse.column))
        }
        _ => None,
    }
}

/// `m:ss`, clamping negative and non-finite values to zero.
pub fn format_clock(secs: f64) -> String {
    let secs = if secs.is_finite() { secs.max(0.0) as u64 } else { 0 };
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn footer_line(footer: &Footer) -> Line<'static> {
    let indicator = match footer.status {
        Status::Recording => Span::styled("● ", Style::default().fg(Color::Red)),
        Status::RecordingPaused => Span::styled("⏸ ", Style::default().fg(Color::Yellow)),
        Status::Playing => Span::styled("▶ ", Style::default().fg(Color::Green)),
        Status::PlaybackPaused => Span::styled("⏸ ", Style::default().fg(Color::Green)),
        Status::Idle => Span::raw("■ "),
    };

    let clock = match footer.total {
        Some(total) => format!("{} / {}", format_clock(footer.elapsed), format_clock(total)),
        None => format_clock(footer.elapsed),
    };

    let mut spans = vec![indicator, Span::raw(clock)];
    if footer.processing {
        spans.push(Span::styled(
            "  processing…",
            Style::default().add_modifier(Modifier::DIM),
        ));
    }
    if footer.silent_playback {
        spans.push(Span::styled(
            "  (no audio output)",
            Style::default().add_modifier(Modifier::DIM),
        ));
    }
    let hint = match footer.status {
        Status::Recording | Status::RecordingPaused => "  enter stop · space pause · q quit",
        Status::Playing | Status::PlaybackPaused => {
            "  space play/pause · ←/→ seek · click scrub · r record · c clear · q quit"
        }
        Status::Idle => "  r record · q quit",
    };
    spans.push(Span::styled(hint, Style::default().add_modifier(Modifier::DIM)));
    Line::from(spans)
}
