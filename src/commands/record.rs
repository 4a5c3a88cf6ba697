//! Live recording with a scrolling waveform.
//!
//! Records until Enter (or SIGUSR1), then switches to reviewing the take with
//! playback and scrubbing. Optionally saves the take as a WAV file.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::session::{self, Start};
use crate::config::WavebarConfig;
use crate::ui::error::report;

/// Handles the `record` command.
///
/// # Errors
/// - If the configuration cannot be loaded
/// - If the input device cannot be opened
/// - If the recording cannot be saved to `output`
pub async fn handle_record(output: Option<PathBuf>, fullscreen: bool) -> anyhow::Result<()> {
    tracing::info!("=== wavebar recorder started ===");

    let mut config = WavebarConfig::load().map_err(|e| report("Configuration Error", e))?;
    if fullscreen {
        config.waveform.fullscreen = true;
    }
    tracing::info!(
        "Configuration loaded: device={}, sample_rate={}Hz, bar_width={}, gap={}",
        config.audio.device,
        config.audio.sample_rate,
        config.waveform.bar_width,
        config.waveform.gap
    );

    let stop = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGUSR1, Arc::clone(&stop))
        .map_err(|e| anyhow::anyhow!("Failed to register signal handler: {e}"))?;

    session::run(&config, Start::Record, output, stop)
        .map_err(|e| report("Recording Error", e))?;

    tracing::info!("=== wavebar recorder exited ===");
    Ok(())
}
