//! Terminal presentation: the waveform pane, footer and error screen.

pub mod canvas;
pub mod error;
pub mod terminal;

pub use canvas::CanvasView;
pub use error::ErrorScreen;
pub use terminal::{Footer, Input, Status, WavebarTui};
