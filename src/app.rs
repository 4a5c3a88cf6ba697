//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to appropriate command handlers.

use crate::commands;
use crate::logging;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

/// Audio waveform recorder and player for the terminal
#[derive(Parser)]
#[command(name = "wavebar")]
#[command(version)]
#[command(about = "Audio waveform recorder and player for the terminal")]
#[command(long_about = "Audio waveform recorder and player for the terminal.\n\nRecords from an input device with a scrolling live waveform, then shows the\nwhole take as bars with a playhead you can scrub with the mouse.\n\nDEFAULT COMMAND:\n    If no command is specified, 'record' is used by default.\n    Record options (-o, --fullscreen) can be used without saying 'record'.\n\nEXAMPLES:\n    # Record, review, and keep the take\n    $ wavebar -o take.wav\n\n    # Use the full width for the live view\n    $ wavebar record --fullscreen\n\n    # Review an existing file\n    $ wavebar play take.wav\n\n    # Stop a recording from another process\n    $ pkill -USR1 wavebar")]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/wavebar/wavebar.toml\n    Logs:               ~/.local/state/wavebar/wavebar.log.*"
)]
struct Cli {
    /// Save the recording as a WAV file (record default command)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Use the whole width for the live waveform (record default command)
    #[arg(long)]
    fullscreen: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record audio with a live waveform (default)
    ///
    /// Press Enter to stop and review, Space to pause/resume, Escape/q to quit.
    #[command(visible_alias = "r")]
    Record {
        /// Save the recording as a WAV file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Use the whole width for the live waveform
        #[arg(long)]
        fullscreen: bool,
    },

    /// Show and play a WAV file
    ///
    /// Click or drag on the waveform to seek, Space to pause, arrows to skip.
    #[command(visible_alias = "p")]
    Play {
        /// Path to the WAV file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Open configuration file in your preferred editor
    ///
    /// Writes the defaults first if the file does not exist yet.
    /// Uses $EDITOR environment variable or falls back to nano/vi.
    #[command(visible_alias = "c")]
    Config,

    /// List available audio devices
    ///
    /// Shows device IDs, names, and configurations to help configure
    /// the correct input device in wavebar.toml.
    #[command(name = "list-devices")]
    ListDevices,

    /// Show recent log entries from the application
    ///
    /// Display the last 50 lines of the most recent log file.
    Logs,

    /// Generate shell completion script
    ///
    /// Examples:
    ///   wavebar completions bash > wavebar.bash
    ///   wavebar completions zsh > _wavebar
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the application based on command-line arguments.
///
/// # Errors
/// - If logging initialization fails
/// - If command execution fails
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Commands that print to the terminal run without file logging.
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "wavebar", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::ListDevices) => return commands::handle_list_devices(),
        Some(Commands::Logs) => return commands::handle_logs(),
        _ => {}
    }

    logging::init_logging()?;

    match cli.command {
        None => commands::handle_record(cli.output, cli.fullscreen).await?,
        Some(Commands::Record { output, fullscreen }) => {
            // Explicit record options take precedence over the top-level ones.
            commands::handle_record(output.or(cli.output), fullscreen || cli.fullscreen).await?
        }
        Some(Commands::Play { file }) => commands::handle_play(&file).await?,
        Some(Commands::Config) => commands::handle_config()?,
        Some(Commands::Completions { .. }) | Some(Commands::ListDevices) | Some(Commands::Logs) => {
            unreachable!("These commands are handled earlier")
        }
    }

    Ok(())
}
