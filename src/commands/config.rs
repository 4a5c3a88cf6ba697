//! Configuration file editor command.

use std::path::Path;
use std::process::Command;

use crate::config::{config_path, WavebarConfig};

/// Opens the configuration file in the user's preferred editor, writing the
/// defaults first when the file does not exist yet.
///
/// Tries editors in this order: $EDITOR, nano, vi.
///
/// # Errors
/// - If the default file cannot be written
/// - If no editor can be found or executed
pub fn handle_config() -> anyhow::Result<()> {
    let config_path = config_path()?;
    ensure_config_file(&config_path)?;

    tracing::info!("Opening config file: {}", config_path.display());

    let editor = find_editor()?;
    tracing::debug!("Using editor: {}", editor);

    let status = Command::new(&editor)
        .arg(&config_path)
        .status()
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to open editor '{editor}': {e}. Make sure the editor is installed and accessible."
            )
        })?;

    if !status.success() {
        return Err(anyhow::anyhow!(
            "Editor exited with error code: {}",
            status.code().unwrap_or(-1)
        ));
    }

    // Surface mistakes now rather than on the next recording.
    WavebarConfig::load_from(&config_path)?;
    tracing::info!("Config file edited successfully");
    Ok(())
}

fn ensure_config_file(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        return Ok(());
    }
    tracing::info!("Writing default configuration to {}", path.display());
    WavebarConfig::default().save_to(path)
}

/// Finds the best available editor to use.
fn find_editor() -> anyhow::Result<String> {
    if let Ok(editor) = std::env::var("EDITOR") {
        if !editor.is_empty() {
            return Ok(editor);
        }
    }

    for editor in &["nano", "vi"] {
        if is_editor_available(editor) {
            return Ok(editor.to_string());
        }
    }

    Err(anyhow::anyhow!(
        "No editor found. Please set the $EDITOR environment variable."
    ))
}

/// Checks if an editor is available in the system PATH.
fn is_editor_available(editor: &str) -> bool {
    Command::new("which")
        .arg(editor)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wavebar").join("wavebar.toml");

        ensure_config_file(&path).unwrap();
        assert_eq!(WavebarConfig::load_from(&path).unwrap(), WavebarConfig::default());

        std::fs::write(&path, "[audio]\ndevice = \"1\"\n").unwrap();
        ensure_config_file(&path).unwrap();
        assert_eq!(WavebarConfig::load_from(&path).unwrap().audio.device, "1");
    }
}
