//! Speech synthesis boundary.

use crate::audio::{playback, wav};
use crate::error::{HearkenError, Result};
use crate::exec::{command_exists, parse_command_template, CommandExecutor};
use std::path::PathBuf;
use std::sync::Arc;

/// Speaks a line of text. Playback is a side effect; the call blocks until
/// the audio has been delivered.
pub trait Synthesizer: Send + Sync {
    fn speak(&self, text: &str) -> Result<()>;
}

impl<T: Synthesizer + ?Sized> Synthesizer for Arc<T> {
    fn speak(&self, text: &str) -> Result<()> {
        (**self).speak(text)
    }
}

/// Synthesizer that shells out to a configured external program.
///
/// Two template shapes are supported:
/// - with a `{file}` placeholder: the program writes a WAV to that path and
///   playback happens here through the default output device;
/// - without one: the program is expected to play the audio itself. `{text}`
///   is substituted when present, otherwise the text is fed on stdin.
pub struct CommandSynthesizer {
    program: String,
    args: Vec<String>,
    executor: Arc<dyn CommandExecutor>,
}

impl CommandSynthesizer {
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
        std::env::temp_dir().join(format!("hearken-tts-{}.wav", std::process::id()))
    }

    fn writes_to_file(&self) -> bool {
        self.args.iter().any(|arg| arg.contains("{file}"))
    }

    fn takes_text_arg(&self) -> bool {
        self.args.iter().any(|arg| arg.contains("{text}"))
    }

    fn run(&self, args: &[String], stdin: Option<&str>) -> Result<String> {
        self.executor
            .execute(&self.program, args, stdin)
            .map_err(|e| match e {
                HearkenError::EngineNotFound { .. } | HearkenError::EngineFailed { .. } => {
                    HearkenError::Synthesis {
                        message: e.to_string(),
                    }
                }
                other => other,
            })
    }
}

impl Synthesizer for CommandSynthesizer {
    fn speak(&self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }

        if self.writes_to_file() {
            let wav_path = Self::temp_wav_path();
            let file = wav_path.to_string_lossy().to_string();
            let args: Vec<String> = self
                .args
                .iter()
                .map(|arg| arg.replace("{file}", &file).replace("{text}", text))
                .collect();
            let stdin = if self.takes_text_arg() {
                None
            } else {
                Some(text)
            };

            let run_result = self.run(&args, stdin);
            let play_result = run_result.and_then(|_| {
                let (samples, rate) = wav::read_wav(&wav_path).map_err(|e| {
                    HearkenError::Synthesis {
                        message: format!("synthesis produced no readable audio: {}", e),
                    }
                })?;
                playback::play_pcm(&samples, rate)
            });

            let _ = std::fs::remove_file(&wav_path);
            return play_result;
        }

        // Self-playing command
        if self.takes_text_arg() {
            let args: Vec<String> = self
                .args
                .iter()
                .map(|arg| arg.replace("{text}", text))
                .collect();
            self.run(&args, None)?;
        } else {
            self.run(&self.args, Some(text))?;
        }
        Ok(())
    }
}

/// Console fallback used when no synthesis command is configured.
/// Replies are printed instead of spoken, keeping the rest of the pipeline
/// usable without an external engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintSynthesizer;

impl Synthesizer for PrintSynthesizer {
    fn speak(&self, text: &str) -> Result<()> {
        if !text.is_empty() {
            println!("{}", text);
        }
        Ok(())
    }
}

/// Recording synthesizer for tests. Optionally fails at scripted call
/// indices, and can trip a cancellation flag after a set number of calls to
/// wind a test conversation down.
pub struct MockSynthesizer {
    spoken: std::sync::Mutex<Vec<String>>,
    fail_on_calls: std::collections::HashSet<usize>,
    cancel_after: Option<(usize, crate::cancel::CancelFlag)>,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self {
            spoken: std::sync::Mutex::new(Vec::new()),
            fail_on_calls: std::collections::HashSet::new(),
            cancel_after: None,
        }
    }

    pub fn with_failure_at(mut self, call_index: usize) -> Self {
        self.fail_on_calls.insert(call_index);
        self
    }

    /// Cancel the given flag once `calls` invocations have completed.
    pub fn cancelling_after(mut self, calls: usize, flag: crate::cancel::CancelFlag) -> Self {
        self.cancel_after = Some((calls, flag));
        self
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

impl Default for MockSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Synthesizer for MockSynthesizer {
    fn speak(&self, text: &str) -> Result<()> {
        let mut spoken = self.spoken.lock().unwrap();
        let call_index = spoken.len();
        spoken.push(text.to_string());
        let total = spoken.len();
        drop(spoken);

        if let Some((calls, flag)) = &self.cancel_after
            && total >= *calls
        {
            flag.cancel();
        }

        if self.fail_on_calls.contains(&call_index) {
            return Err(HearkenError::Synthesis {
                message: "injected synthesis failure".to_string(),
            });
        }
        Ok(())
    }
}
