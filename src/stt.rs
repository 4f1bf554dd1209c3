//! Speech-to-text engine boundary.

use crate::audio::wav;
use crate::error::{HearkenError, Result};
use crate::exec::{command_exists, parse_command_template, CommandExecutor};
use std::path::PathBuf;
use std::sync::Arc;

/// Converts a recorded utterance to text.
///
/// An empty string means "nothing intelligible was said" and is not an error;
/// the conversation loop handles it with a retry phrase.
pub trait Transcriber: Send + Sync {
    fn transcribe(&self, audio: &[i16], sample_rate: u32, language: &str) -> Result<String>;
}

impl<T: Transcriber + ?Sized> Transcriber for Arc<T> {
    fn transcribe(&self, audio: &[i16], sample_rate: u32, language: &str) -> Result<String> {
        (**self).transcribe(audio, sample_rate, language)
    }
}

/// Transcriber that shells out to a configured external program.
///
/// The command template is tokenized on whitespace; `{file}`, `{language}`
/// and `{rate}` placeholders are substituted per token. The utterance is
/// written to a temporary WAV file for the duration of the call.
pub struct CommandTranscriber {
    program: String,
    args: Vec<String>,
    executor: Arc<dyn CommandExecutor>,
}

impl CommandTranscriber {
    pub fn new(template: &str, executor: Arc<dyn CommandExecutor>) -> Result<Self> {
        let (program, args) = parse_command_template(template)?;
        if !command_exists(&program) {
            return Err(HearkenError::EngineNotFound { command: program });
        }
        Ok(Self {
            program,
            args,
            executor,
        })
    }

    fn temp_wav_path() -> PathBuf {
        std::env::temp_dir().join(format!("hearken-stt-{}.wav", std::process::id()))
    }
}

impl Transcriber for CommandTranscriber {
    fn transcribe(&self, audio: &[i16], sample_rate: u32, language: &str) -> Result<String> {
        let wav_path = Self::temp_wav_path();
        wav::write_wav(&wav_path, audio, sample_rate)?;

        let file = wav_path.to_string_lossy().to_string();
        let rate = sample_rate.to_string();
        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                arg.replace("{file}", &file)
                    .replace("{language}", language)
                    .replace("{rate}", &rate)
            })
            .collect();

        let result = self
            .executor
            .execute(&self.program, &args, None)
            .map_err(|e| match e {
                HearkenError::EngineNotFound { .. } | HearkenError::EngineFailed { .. } => {
                    HearkenError::Transcription {
                        message: e.to_string(),
                    }
                }
                other => other,
            });

        let _ = std::fs::remove_file(&wav_path);

        result.map(|stdout| stdout.trim().to_string())
    }
}

/// Scripted transcriber for tests.
pub struct MockTranscriber {
    results: std::sync::Mutex<std::collections::VecDeque<Result<String>>>,
    calls: std::sync::Mutex<Vec<usize>>,
}

impl MockTranscriber {
    pub fn new() -> Self {
        Self {
            results: std::sync::Mutex::new(std::collections::VecDeque::new()),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn with_transcription(self, text: &str) -> Self {
        self.results
            .lock()
            .unwrap()
            .push_back(Ok(text.to_string()));
        self
    }

    pub fn with_error(self) -> Self {
        self.results
            .lock()
            .unwrap()
            .push_back(Err(HearkenError::Transcription {
                message: "injected transcription failure".to_string(),
            }));
        self
    }

    /// Sample counts of the utterances passed in, in call order.
    pub fn calls(&self) -> Vec<usize> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Default for MockTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcriber for MockTranscriber {
    fn transcribe(&self, audio: &[i16], _sample_rate: u32, _language: &str) -> Result<String> {
        self.calls.lock().unwrap().push(audio.len());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}
