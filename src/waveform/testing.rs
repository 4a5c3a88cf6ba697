//! Recording doubles for the engine's seams.

use super::host::HostEvents;
use super::surface::{BarRect, Rgba, Surface};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCall {
    Clear(Rgba),
    Bar { rect: BarRect, radius: f32, color: Rgba },
}

/// Surface that records draw calls instead of rasterizing them.
pub struct DrawLog {
    pub width: u32,
    pub height: u32,
    pub calls: Vec<DrawCall>,
}

impl DrawLog {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, calls: Vec::new() }
    }

    /// Bars painted since the last clear, left to right.
    pub fn bars(&self) -> Vec<(BarRect, Rgba)> {
        let start = self
            .calls
            .iter()
            .rposition(|c| matches!(c, DrawCall::Clear(_)))
            .map_or(0, |i| i + 1);
        let mut bars: Vec<_> = self.calls[start..]
            .iter()
            .filter_map(|c| match c {
                DrawCall::Bar { rect, color, .. } => Some((*rect, *color)),
                DrawCall::Clear(_) => None,
            })
            .collect();
        bars.sort_by(|a, b| a.0.x.total_cmp(&b.0.x));
        bars
    }

    pub fn clears(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, DrawCall::Clear(_))).count()
    }
}

impl Surface for DrawLog {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self, color: Rgba) {
        self.calls.push(DrawCall::Clear(color));
    }

    fn fill_bar(&mut self, rect: BarRect, radius: f32, color: Rgba) {
        self.calls.push(DrawCall::Bar { rect, radius, color });
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostEvent {
    CurrentAudioTime(f64),
    ProcessingOnResize(bool),
    ProcessingAudioOnComplete(bool),
    ClearCanvas,
}

#[derive(Debug, Default)]
pub struct EventLog {
    pub events: Vec<HostEvent>,
}

impl HostEvents for EventLog {
    fn set_current_audio_time(&mut self, time: f64) {
        self.events.push(HostEvent::CurrentAudioTime(time));
    }

    fn set_processing_on_resize(&mut self, processing: bool) {
        self.events.push(HostEvent::ProcessingOnResize(processing));
    }

    fn set_processing_audio_on_complete(&mut self, processing: bool) {
        self.events.push(HostEvent::ProcessingAudioOnComplete(processing));
    }

    fn clear_canvas(&mut self) {
        self.events.push(HostEvent::ClearCanvas);
    }
}
