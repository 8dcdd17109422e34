//! Command-line interface definitions for hotkeys-replay.

use std::path::PathBuf;

use clap::Parser;
use logging::LogArgs;

/// Command-line interface for the `hotkeys-replay` binary.
#[derive(Parser, Debug)]
#[command(
    name = "hotkeys-replay",
    about = "Replay a RON script of key events through the hotkey engine",
    version
)]
pub struct Cli {
    /// Logging controls shared across the workspace binaries.
    #[command(flatten)]
    pub log: LogArgs,

    /// Path to the replay script (RON).
    #[arg(value_name = "SCRIPT")]
    pub script: PathBuf,

    /// Only print steps where a hotkey fired.
    #[arg(long)]
    pub fired_only: bool,
}
