//! Application assembly.
//!
//! Turns a parsed command line into a running assistant: resolve the
//! configuration, acquire every pipeline resource in order, and hand the
//! bundle to the orchestrator. Acquisition failures release whatever was
//! already acquired before the error is reported.

use std::sync::Arc;
use std::time::Duration;

use crate::assistant::{Orchestrator, Resources};
use crate::audio::{CpalFrameSource, FrameSource};
use crate::cli::Cli;
use crate::clock::SystemClock;
use crate::config::{Config, StrategyKind};
use crate::error::{HearkenError, Result};
use crate::exec::{CommandExecutor, SystemCommandExecutor};
use crate::llm::CommandResponder;
use crate::segment::energy::EnergyStrategy;
use crate::segment::probability::ProbabilityStrategy;
use crate::segment::vad::{RmsClassifier, RmsScorer};
use crate::segment::{SegmentStrategy, UtteranceRecorder};
use crate::stt::CommandTranscriber;
use crate::tts::{CommandSynthesizer, PrintSynthesizer, Synthesizer};
use crate::wake::detector::RmsWakeDetector;

/// Resolve the effective configuration for this invocation.
///
/// Precedence, lowest to highest: built-in defaults, the config file,
/// environment overrides, command-line flags.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_default(&path)?.with_env_overrides()?;
    apply_cli_overrides(&mut config, cli)?;
    config.validate()?;
    Ok(config)
}

fn apply_cli_overrides(config: &mut Config, cli: &Cli) -> Result<()> {
    if let Some(device) = &cli.device {
        config.audio.device = Some(device.clone());
    }
    if let Some(language) = &cli.language {
        config.stt.language = language.clone();
    }
    if let Some(strategy) = &cli.strategy {
        config.segment.strategy = strategy.parse()?;
    }
    if let Some(path) = &cli.debug_recording {
        config.assistant.debug_recording = Some(path.clone());
    }
    Ok(())
}

/// How many frames of audio cover `duration_ms` at the configured rate.
fn frames_for_duration(config: &Config, duration_ms: u32) -> usize {
    let frame_ms = (config.audio.frame_length as u64 * 1000 / config.audio.sample_rate as u64)
        .max(1);
    (duration_ms as u64 / frame_ms).max(1) as usize
}

fn build_strategy(config: &Config) -> Box<dyn SegmentStrategy> {
    let silence_frames = frames_for_duration(config, config.segment.silence_duration_ms);
    match config.segment.strategy {
        StrategyKind::Energy => Box::new(EnergyStrategy::new(
            Box::new(RmsClassifier::new(config.segment.vad_threshold)),
            silence_frames,
        )),
        StrategyKind::Probability => Box::new(ProbabilityStrategy::new(
            Box::new(RmsScorer::new(config.segment.vad_threshold)),
            config.segment.speech_probability_threshold,
            silence_frames as u32,
        )),
    }
}

fn require_command(template: Option<&str>, key: &str) -> Result<String> {
    match template {
        Some(t) if !t.trim().is_empty() => Ok(t.to_string()),
        _ => Err(HearkenError::ConfigInvalidValue {
            key: key.to_string(),
            message: "an engine command is required".to_string(),
        }),
    }
}

/// Acquire every pipeline resource in dependency order.
///
/// On any failure the partially-built [`Resources`] is dropped, which
/// releases everything acquired so far in reverse order.
pub fn build_resources(config: &Config) -> Result<Resources> {
    let mut resources = Resources::new();

    let mut device = CpalFrameSource::new(
        config.audio.device.as_deref(),
        config.audio.sample_rate,
        config.audio.frame_length,
    )?;
    device.open()?;
    tracing::info!(device = %device.device_name(), "audio input acquired");
    resources.device = Some(Box::new(device));

    resources.wake = Some(Box::new(RmsWakeDetector::new(
        config.wake.threshold,
        config.wake.min_active_frames,
        config.audio.sample_rate,
        config.audio.frame_length,
    )));

    resources.recorder = Some(UtteranceRecorder::new(
        build_strategy(config),
        Duration::from_secs(config.segment.max_record_secs as u64),
        Arc::new(SystemClock),
    ));

    let executor: Arc<dyn CommandExecutor> = Arc::new(SystemCommandExecutor::new());

    let stt_template = require_command(config.stt.command.as_deref(), "stt.command")?;
    resources.transcriber = Some(Arc::new(CommandTranscriber::new(
        &stt_template,
        executor.clone(),
    )?));

    let llm_template = require_command(config.llm.command.as_deref(), "llm.command")?;
    resources.responder = Some(Arc::new(CommandResponder::new(
        &llm_template,
        executor.clone(),
    )?));

    let synthesizer: Arc<dyn Synthesizer> = match config.tts.command.as_deref() {
        Some(template) if !template.trim().is_empty() => {
            Arc::new(CommandSynthesizer::new(template, executor)?)
        }
        _ => {
            tracing::warn!("no synthesis command configured, replies will be printed");
            Arc::new(PrintSynthesizer)
        }
    };
    resources.synthesizer = Some(synthesizer);

    Ok(resources)
}

/// Run the assistant loop until Ctrl-C.
pub async fn run_assistant(config: Config) -> Result<()> {
    let resources = build_resources(&config)?;
    Orchestrator::new(resources, config).run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults;

    #[test]
    fn silence_budget_covers_the_configured_duration() {
        let config = Config::default();
        // 800ms of 32ms frames
        assert_eq!(frames_for_duration(&config, defaults::SILENCE_DURATION_MS), 25);
    }

    #[test]
    fn silence_budget_is_never_zero() {
        let mut config = Config::default();
        config.segment.silence_duration_ms = 1;
        assert_eq!(frames_for_duration(&config, 1), 1);
    }

    #[test]
    fn missing_stt_command_is_a_config_error() {
        let err = require_command(None, "stt.command").unwrap_err();
        assert!(matches!(
            err,
            HearkenError::ConfigInvalidValue { ref key, .. } if key == "stt.command"
        ));
    }

    #[test]
    fn blank_llm_command_is_a_config_error() {
        let err = require_command(Some("   "), "llm.command").unwrap_err();
        assert!(matches!(err, HearkenError::ConfigInvalidValue { .. }));
    }

    #[test]
    fn cli_overrides_win_over_defaults() {
        use clap::Parser;

        let cli = Cli::try_parse_from([
            "hearken",
            "--device",
            "USB Mic",
            "--language",
            "de",
            "--strategy",
            "probability",
        ])
        .unwrap();
        let mut config = Config::default();
        apply_cli_overrides(&mut config, &cli).unwrap();
        assert_eq!(config.audio.device.as_deref(), Some("USB Mic"));
        assert_eq!(config.stt.language, "de");
        assert_eq!(config.segment.strategy, StrategyKind::Probability);
    }

    #[test]
    fn invalid_strategy_flag_is_rejected() {
        use clap::Parser;

        let cli = Cli::try_parse_from(["hearken", "--strategy", "psychic"]).unwrap();
        let mut config = Config::default();
        assert!(apply_cli_overrides(&mut config, &cli).is_err());
    }
}
