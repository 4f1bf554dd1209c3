use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::defaults;
use crate::error::{HearkenError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub wake: WakeConfig,
    pub segment: SegmentConfig,
    pub stt: SttConfig,
    pub llm: LlmConfig,
    pub tts: TtsConfig,
    pub assistant: AssistantConfig,
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub device: Option<String>,
    pub sample_rate: u32,
    pub frame_length: usize,
}

/// Wake-word gate configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WakeConfig {
    pub threshold: f32,
    pub min_active_frames: usize,
}

/// Utterance segmentation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SegmentConfig {
    pub strategy: StrategyKind,
    pub vad_threshold: f32,
    pub speech_probability_threshold: f32,
    pub silence_duration_ms: u32,
    pub max_record_secs: u32,
}

/// Segmentation strategy selector
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Energy,
    Probability,
}

/// Speech-to-text engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SttConfig {
    pub command: Option<String>,
    pub language: String,
}

/// Response engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub command: Option<String>,
    pub max_tokens: u32,
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TtsConfig {
    pub command: Option<String>,
}

/// Conversation loop configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssistantConfig {
    pub ack_phrase: String,
    pub retry_phrase: String,
    pub fallback_phrase: String,
    pub post_ack_delay_ms: u64,
    pub debug_recording: Option<PathBuf>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: defaults::SAMPLE_RATE,
            frame_length: defaults::FRAME_LENGTH,
        }
    }
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            threshold: defaults::WAKE_THRESHOLD,
            min_active_frames: defaults::WAKE_MIN_ACTIVE_FRAMES,
        }
    }
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Energy,
            vad_threshold: defaults::VAD_THRESHOLD,
            speech_probability_threshold: defaults::SPEECH_PROBABILITY_THRESHOLD,
            silence_duration_ms: defaults::SILENCE_DURATION_MS,
            max_record_secs: defaults::MAX_RECORD_SECS,
        }
    }
}

impl Default for StrategyKind {
    fn default() -> Self {
        StrategyKind::Energy
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            command: None,
            language: defaults::LANGUAGE.to_string(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            command: None,
            max_tokens: defaults::MAX_TOKENS,
        }
    }
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self { command: None }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            ack_phrase: defaults::ACK_PHRASE.to_string(),
            retry_phrase: defaults::RETRY_PHRASE.to_string(),
            fallback_phrase: defaults::FALLBACK_PHRASE.to_string(),
            post_ack_delay_ms: defaults::POST_ACK_DELAY_MS,
            debug_recording: None,
        }
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = HearkenError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "energy" => Ok(StrategyKind::Energy),
            "probability" => Ok(StrategyKind::Probability),
            other => Err(HearkenError::ConfigInvalidValue {
                key: "segment.strategy".to_string(),
                message: format!("unknown strategy '{other}' (expected energy or probability)"),
            }),
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::Energy => write!(f, "energy"),
            StrategyKind::Probability => write!(f, "probability"),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file, or return defaults if the file does
    /// not exist. Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(HearkenError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - HEARKEN_AUDIO_DEVICE → audio.device
    /// - HEARKEN_LANGUAGE → stt.language
    /// - HEARKEN_STRATEGY → segment.strategy
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(device) = std::env::var("HEARKEN_AUDIO_DEVICE")
            && !device.is_empty()
        {
            self.audio.device = Some(device);
        }

        if let Ok(language) = std::env::var("HEARKEN_LANGUAGE")
            && !language.is_empty()
        {
            self.stt.language = language;
        }

        if let Ok(strategy) = std::env::var("HEARKEN_STRATEGY")
            && !strategy.is_empty()
        {
            self.segment.strategy = strategy.parse()?;
        }

        Ok(self)
    }

    /// Reject values the pipeline cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(HearkenError::ConfigInvalidValue {
                key: "audio.sample_rate".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.audio.frame_length == 0 {
            return Err(HearkenError::ConfigInvalidValue {
                key: "audio.frame_length".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.segment.speech_probability_threshold) {
            return Err(HearkenError::ConfigInvalidValue {
                key: "segment.speech_probability_threshold".to_string(),
                message: "must be between 0.0 and 1.0".to_string(),
            });
        }
        if self.segment.silence_duration_ms == 0 {
            return Err(HearkenError::ConfigInvalidValue {
                key: "segment.silence_duration_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.segment.max_record_secs == 0 {
            return Err(HearkenError::ConfigInvalidValue {
                key: "segment.max_record_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/hearken/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .expect("Could not determine config directory")
            .join("hearken")
            .join("config.toml")
    }
}
