//! Testable external command execution.
//!
//! The speech engines (transcription, response generation, synthesis) shell
//! out to configured external programs. The `CommandExecutor` trait keeps
//! that seam mockable so the whole pipeline runs under test without any
//! external binaries.

use crate::error::{HearkenError, Result};
use std::io::Write;
use std::process::{Command, Stdio};

/// Trait for executing system commands.
///
/// Object-safe, Send + Sync for use across blocking stage threads.
pub trait CommandExecutor: Send + Sync {
    /// Execute a command with arguments, optionally feeding stdin.
    ///
    /// Returns the stdout of the command on success.
    fn execute(&self, command: &str, args: &[String], stdin: Option<&str>) -> Result<String>;
}

/// Production command executor using std::process::Command.
#[derive(Debug, Clone, Default)]
pub struct SystemCommandExecutor;

impl SystemCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn execute(&self, command: &str, args: &[String], stdin: Option<&str>) -> Result<String> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd.stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HearkenError::EngineNotFound {
                    command: command.to_string(),
                }
            } else {
                HearkenError::EngineFailed {
                    message: format!("Failed to spawn {}: {}", command, e),
                }
            }
        })?;

        if let Some(input) = stdin
            && let Some(mut child_stdin) = child.stdin.take()
        {
            child_stdin
                .write_all(input.as_bytes())
                .map_err(|e| HearkenError::EngineFailed {
                    message: format!("Failed to write stdin to {}: {}", command, e),
                })?;
            // Drop so the child sees EOF
        }

        let output = child
            .wait_with_output()
            .map_err(|e| HearkenError::EngineFailed {
                message: format!("Failed to wait for {}: {}", command, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HearkenError::EngineFailed {
                message: format!(
                    "{} failed with status {:?}: {}",
                    command, output.status, stderr
                ),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Check that a program is resolvable on PATH.
///
/// Used at startup so a misconfigured engine fails acquisition instead of
/// failing the first conversation cycle.
pub fn command_exists(program: &str) -> bool {
    if program.contains('/') {
        return std::path::Path::new(program).exists();
    }
    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&paths).any(|dir| dir.join(program).is_file())
}

/// Split a command template into a program and its argument tokens.
///
/// Templates are whitespace-separated; placeholder substitution (e.g.
/// `{file}`) happens per token in the engine that owns the template.
pub fn parse_command_template(template: &str) -> Result<(String, Vec<String>)> {
    let mut tokens = template.split_whitespace().map(|s| s.to_string());
    let program = tokens.next().ok_or_else(|| HearkenError::ConfigInvalidValue {
        key: "command".to_string(),
        message: "command template is empty".to_string(),
    })?;
    Ok((program, tokens.collect()))
}

/// Mock executor that records invocations and replays scripted responses.
pub struct MockCommandExecutor {
    responses: std::sync::Mutex<std::collections::VecDeque<Result<String>>>,
    invocations: std::sync::Mutex<Vec<(String, Vec<String>, Option<String>)>>,
}

impl MockCommandExecutor {
    pub fn new() -> Self {
        Self {
            responses: std::sync::Mutex::new(std::collections::VecDeque::new()),
            invocations: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn with_response(self, stdout: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(stdout.to_string()));
        self
    }

    pub fn with_failure(self, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(HearkenError::EngineFailed {
                message: message.to_string(),
            }));
        self
    }

    pub fn invocations(&self) -> Vec<(String, Vec<String>, Option<String>)> {
        self.invocations.lock().unwrap().clone()
    }
}

impl Default for MockCommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandExecutor for MockCommandExecutor {
    fn execute(&self, command: &str, args: &[String], stdin: Option<&str>) -> Result<String> {
        self.invocations.lock().unwrap().push((
            command.to_string(),
            args.to_vec(),
            stdin.map(|s| s.to_string()),
        ));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}
