//! hearken - Hands-free voice assistant for the Linux desktop
//!
//! Wake-word gated listen/transcribe/respond/speak loop built on
//! pluggable audio sources and external engine commands.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod app;
pub mod assistant;
pub mod audio;
pub mod cancel;
pub mod cli;
pub mod clock;
pub mod config;
pub mod defaults;
pub mod diagnostics;
pub mod error;
pub mod exec;
pub mod llm;
pub mod segment;
pub mod stt;
pub mod tts;
pub mod wake;

// Core traits (source → gate → segment → engines)
pub use audio::source::FrameSource;
pub use exec::{CommandExecutor, SystemCommandExecutor};
pub use llm::Responder;
pub use stt::Transcriber;
pub use tts::Synthesizer;
pub use wake::WakeWordDetector;

// Pipeline
pub use assistant::{Orchestrator, Resources};
pub use cancel::CancelFlag;
pub use segment::{SegmentEvent, SegmentStrategy, UtteranceRecorder};

// Error handling
pub use error::{HearkenError, Result};

// Config
pub use config::{Config, StrategyKind};

/// Build version string with optional git commit hash.
///
/// Returns `"0.3.1+abc1234"` when git hash is available, `"0.3.1"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
