//! Full-screen error display.
//!
//! Used for failures that happen while the terminal is ours (device errors,
//! unreadable files, bad configuration) so the message is not lost when the
//! alternate screen is left.

use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    text::{Line, Span},
    widgets::{Block, Paragraph, Wrap},
};
use std::io::{self, Stdout};

const ERROR_BG: Color = Color::Rgb(160, 20, 20);
const ERROR_FG: Color = Color::Rgb(255, 255, 255);

/// Error screen that waits for a key press before returning.
pub struct ErrorScreen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    active: bool,
}

impl ErrorScreen {
    /// Enters raw mode and the alternate screen.
    ///
    /// # Errors
    /// - If terminal cannot be initialized
    pub fn new() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(ErrorScreen {
            terminal,
            active: true,
        })
    }

    /// Shows `title` and the error chain of `error`, then waits for any key.
    pub fn show(&mut self, title: &str, error: &anyhow::Error) -> anyhow::Result<()> {
        let lines = error_lines(title, error);
        loop {
            self.terminal.draw(|frame| {
                let area = frame.area();
                frame.render_widget(Block::default().style(Style::default().bg(ERROR_BG)), area);

                let text_width = (area.width * 80) / 100;
                let text_height = (lines.len() as u16 + 2).min(area.height);
                let centered = Rect {
                    x: area.x + (area.width - text_width) / 2,
                    y: area.y + area.height.saturating_sub(text_height) / 2,
                    width: text_width,
                    height: text_height,
                };

                let paragraph = Paragraph::new(lines.clone())
                    .style(Style::default().fg(ERROR_FG).bg(ERROR_BG))
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true });
                frame.render_widget(paragraph, centered);
            })?;

            if event::poll(std::time::Duration::from_millis(100))? {
                if let Event::Key(_) = event::read()? {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Restores the terminal. Safe to call more than once.
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for ErrorScreen {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Shows `error` full screen and returns it for propagation.
///
/// Falls back to stderr when the terminal cannot be taken over.
pub fn report(title: &str, error: anyhow::Error) -> anyhow::Error {
    tracing::error!("{title}: {error:#}");
    let shown = ErrorScreen::new().and_then(|mut screen| {
        screen.show(title, &error)?;
        screen.cleanup()
    });
    if shown.is_err() {
        eprintln!("{title}: {error:#}");
    }
    error
}

/// Title line, a blank line, then one line per error in the chain.
fn error_lines(title: &str, error: &anyhow::Error) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(
            title.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::default(),
    ];
    lines.extend(error.chain().map(|cause| Line::from(cause.to_string())));
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        "Press any key to exit",
        Style::default().add_modifier(Modifier::DIM),
    )));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_error_lines_include_chain() {
        let error = Err::<(), _>(anyhow::anyhow!("device busy"))
            .context("Failed to start recording")
            .unwrap_err();
        let lines = error_lines("Recording Error", &error);

        let text: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
        assert_eq!(text[0], "Recording Error");
        assert_eq!(text[2], "Failed to start recording");
        assert_eq!(text[3], "device busy");
        assert_eq!(text.last().map(String::as_str), Some("Press any key to exit"));
    }
}
