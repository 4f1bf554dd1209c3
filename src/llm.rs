//! Response generation boundary.

use crate::error::{HearkenError, Result};
use crate::exec::{command_exists, parse_command_template, CommandExecutor};
use std::sync::Arc;

/// Generates a spoken reply for a transcribed request.
///
/// An empty string means the engine had nothing to say; the conversation
/// loop substitutes a fixed fallback phrase.
pub trait Responder: Send + Sync {
    fn respond(&self, prompt: &str, max_tokens: u32) -> Result<String>;
}

impl<T: Responder + ?Sized> Responder for Arc<T> {
    fn respond(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        (**self).respond(prompt, max_tokens)
    }
}

/// Responder that shells out to a configured external program.
///
/// The prompt is fed on stdin; `{max_tokens}` in the template is substituted
/// per token. Whatever the program prints on stdout, trimmed, is the reply.
pub struct CommandResponder {
    program: String,
    args: Vec<String>,
    executor: Arc<dyn CommandExecutor>,
}

impl CommandResponder {
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
}

impl Responder for CommandResponder {
    fn respond(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let max_tokens = max_tokens.to_string();
        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.replace("{max_tokens}", &max_tokens))
            .collect();

        let stdout = self
            .executor
            .execute(&self.program, &args, Some(prompt))
            .map_err(|e| match e {
                HearkenError::EngineNotFound { .. } | HearkenError::EngineFailed { .. } => {
                    HearkenError::Response {
                        message: e.to_string(),
                    }
                }
                other => other,
            })?;

        Ok(stdout.trim().to_string())
    }
}

/// Scripted responder for tests.
pub struct MockResponder {
    results: std::sync::Mutex<std::collections::VecDeque<Result<String>>>,
    prompts: std::sync::Mutex<Vec<String>>,
}

impl MockResponder {
    pub fn new() -> Self {
        Self {
            results: std::sync::Mutex::new(std::collections::VecDeque::new()),
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn with_reply(self, text: &str) -> Self {
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
            .push_back(Err(HearkenError::Response {
                message: "injected response failure".to_string(),
            }));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Default for MockResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl Responder for MockResponder {
    fn respond(&self, prompt: &str, _max_tokens: u32) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::MockCommandExecutor;

    #[test]
    fn command_responder_feeds_prompt_on_stdin() {
        let executor = Arc::new(MockCommandExecutor::new().with_response("The lights are on.\n"));
        let responder = CommandResponder::new(
            "sh -n {max_tokens}",
            Arc::clone(&executor) as Arc<dyn CommandExecutor>,
        )
        .unwrap();

        let reply = responder.respond("turn on the lights", 150).unwrap();
        assert_eq!(reply, "The lights are on.");

        let invocations = executor.invocations();
        assert_eq!(invocations[0].1, vec!["-n", "150"]);
        assert_eq!(invocations[0].2.as_deref(), Some("turn on the lights"));
    }

    #[test]
    fn command_responder_rejects_missing_program() {
        let executor: Arc<dyn CommandExecutor> = Arc::new(MockCommandExecutor::new());
        let result = CommandResponder::new("definitely-not-a-real-binary-4501", executor);

        assert!(matches!(result, Err(HearkenError::EngineNotFound { .. })));
    }

    #[test]
    fn command_responder_maps_engine_failure() {
        let executor: Arc<dyn CommandExecutor> =
            Arc::new(MockCommandExecutor::new().with_failure("out of memory"));
        let responder = CommandResponder::new("sh", executor).unwrap();

        let result = responder.respond("hello", 150);
        assert!(matches!(result, Err(HearkenError::Response { .. })));
    }

    #[test]
    fn mock_responder_records_prompts() {
        let responder = MockResponder::new().with_reply("sure");

        assert_eq!(responder.respond("do it", 10).unwrap(), "sure");
        assert_eq!(responder.respond("again", 10).unwrap(), "");
        assert_eq!(responder.prompts(), vec!["do it", "again"]);
    }
}
