//! Command-line interface for hearken
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Hands-free wake-word voice assistant
#[derive(Parser, Debug)]
#[command(name = "hearken", version, about = "Hands-free wake-word voice assistant")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: pipeline stages, -vv: per-frame diagnostics)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Audio input device (e.g., pipewire)
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Language code for transcription (e.g., en, de, cs)
    #[arg(long, value_name = "LANG")]
    pub language: Option<String>,

    /// Segmentation strategy (energy or probability)
    #[arg(long, value_name = "STRATEGY")]
    pub strategy: Option<String>,

    /// Write each captured utterance to this WAV file for inspection
    #[arg(long, value_name = "PATH")]
    pub debug_recording: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available audio input devices
    Devices,

    /// Check configured engines and audio devices
    Check,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}
