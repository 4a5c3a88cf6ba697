//! wavebar: audio waveform bars for live recording and recorded playback.
//!
//! The [`waveform`] module is the rendering engine. It turns PCM into bars,
//! scrolls a live view and draws recorded audio with a playhead, all into a
//! pixel surface. The remaining modules make up the terminal application
//! around it.

pub mod app;
pub mod commands;
pub mod config;
pub mod logging;
pub mod playback;
pub mod recording;
pub mod ui;
pub mod waveform;
