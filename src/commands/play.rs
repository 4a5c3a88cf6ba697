//! Playback of a WAV file with the recorded-waveform view.

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::session::{self, Start};
use crate::config::WavebarConfig;
use crate::playback::load_wav;
use crate::ui::error::report;

/// Handles the `play` command.
///
/// # Errors
/// - If the configuration cannot be loaded
/// - If the file is not a readable WAV file
pub async fn handle_play(file: &Path) -> anyhow::Result<()> {
    tracing::info!("Playing {}", file.display());

    let config = WavebarConfig::load().map_err(|e| report("Configuration Error", e))?;
    let buffer = load_wav(file).map_err(|e| report("Playback Error", e))?;

    session::run(
        &config,
        Start::Play(buffer),
        None,
        Arc::new(AtomicBool::new(false)),
    )
    .map_err(|e| report("Playback Error", e))?;
    Ok(())
}
