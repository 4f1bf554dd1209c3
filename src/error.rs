//! Error types for hearken.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HearkenError {
    // Configuration errors
    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio capture errors
    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio device busy: {device} is already open")]
    AudioDeviceBusy { device: String },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    #[error("Audio playback failed: {message}")]
    AudioPlayback { message: String },

    // Collaborator errors
    #[error("Wake-word detection failed: {message}")]
    WakeWord { message: String },

    #[error("Voice activity detection failed: {message}")]
    VoiceActivity { message: String },

    #[error("Transcription failed: {message}")]
    Transcription { message: String },

    #[error("Response generation failed: {message}")]
    Response { message: String },

    #[error("Speech synthesis failed: {message}")]
    Synthesis { message: String },

    // External engine commands
    #[error("Engine command not found: {command}")]
    EngineNotFound { command: String },

    #[error("Engine command failed: {message}")]
    EngineFailed { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, HearkenError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_audio_device_not_found_display() {
        let error = HearkenError::AudioDeviceNotFound {
            device: "hw:3,0".to_string(),
        };
        assert_eq!(error.to_string(), "Audio device not found: hw:3,0");
    }

    #[test]
    fn test_audio_device_busy_display() {
        let error = HearkenError::AudioDeviceBusy {
            device: "pipewire".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Audio device busy: pipewire is already open"
        );
    }

    #[test]
    fn test_audio_capture_display() {
        let error = HearkenError::AudioCapture {
            message: "buffer overflow".to_string(),
        };
        assert_eq!(error.to_string(), "Audio capture failed: buffer overflow");
    }

    #[test]
    fn test_transcription_display() {
        let error = HearkenError::Transcription {
            message: "engine crashed".to_string(),
        };
        assert_eq!(error.to_string(), "Transcription failed: engine crashed");
    }

    #[test]
    fn test_engine_not_found_display() {
        let error = HearkenError::EngineNotFound {
            command: "whisper-cli".to_string(),
        };
        assert_eq!(error.to_string(), "Engine command not found: whisper-cli");
    }

    #[test]
    fn test_config_invalid_value_display() {
        let error = HearkenError::ConfigInvalidValue {
            key: "segment.silence_duration_ms".to_string(),
            message: "must be positive".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid configuration value for segment.silence_duration_ms: must be positive"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: HearkenError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_str = "invalid = toml = syntax";
        let toml_error = toml::from_str::<toml::Value>(toml_str).unwrap_err();
        let error: HearkenError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<HearkenError>();
        assert_sync::<HearkenError>();
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);
    }
}
