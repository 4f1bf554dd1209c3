//! Conversation orchestrator.
//!
//! Runs the wake → acknowledge → record → transcribe → respond → speak loop.
//! Cycles are strictly sequential: a new wake word is only listened for once
//! the previous cycle has fully finished. Blocking stages run on the tokio
//! blocking pool, moving the resources they need in and out of the closure.
//!
//! Within a cycle, collaborator failures are contained: the stage is logged
//! and the cycle is abandoned back to the wake gate. Only a panicking stage
//! is fatal and tears the whole pipeline down.

use crate::assistant::resources::Resources;
use crate::audio::wav;
use crate::cancel::CancelFlag;
use crate::config::Config;
use crate::error::{HearkenError, Result};
use std::fmt;
use std::time::Duration;
use tokio::task::JoinError;

/// Pipeline stage names for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    AwaitWake,
    Ack,
    Record,
    Transcribe,
    Respond,
    Speak,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::AwaitWake => "await_wake",
            Stage::Ack => "ack",
            Stage::Record => "record",
            Stage::Transcribe => "transcribe",
            Stage::Respond => "respond",
            Stage::Speak => "speak",
        };
        write!(f, "{}", name)
    }
}

pub struct Orchestrator {
    resources: Resources,
    config: Config,
    cancel: CancelFlag,
}

impl Orchestrator {
    pub fn new(resources: Resources, config: Config) -> Self {
        Self::with_cancel(resources, config, CancelFlag::new())
    }

    /// Like [`Orchestrator::new`] but shares a caller-provided cancel flag.
    pub fn with_cancel(resources: Resources, config: Config, cancel: CancelFlag) -> Self {
        Self {
            resources,
            config,
            cancel,
        }
    }

    /// Handle for requesting shutdown from outside the loop.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Run conversation cycles until cancellation or a fatal error.
    /// Resources are released in reverse acquisition order on every exit path.
    pub async fn run(mut self) -> Result<()> {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown requested");
                cancel.cancel();
            }
        });

        let outcome = self.run_loop().await;
        if let Err(e) = &outcome {
            tracing::error!("assistant loop failed: {}", e);
        }
        self.resources.release();
        outcome
    }

    async fn run_loop(&mut self) -> Result<()> {
        while !self.cancel.is_cancelled() {
            self.run_cycle().await?;
        }
        tracing::info!("conversation loop stopped");
        Ok(())
    }

    /// One conversation cycle. `Err` is fatal; contained stage failures
    /// return `Ok` and fall back to the wake gate.
    async fn run_cycle(&mut self) -> Result<()> {
        tracing::info!(stage = %Stage::AwaitWake, "listening for wake word");

        let mut device = self.take_device()?;
        let mut wake = self
            .resources
            .wake
            .take()
            .ok_or_else(|| missing("wake detector"))?;
        let cancel = self.cancel.clone();
        let (device, wake, waited) = tokio::task::spawn_blocking(move || {
            let waited =
                crate::wake::gate::wait_for_wake_word(device.as_mut(), wake.as_mut(), &cancel);
            (device, wake, waited)
        })
        .await
        .map_err(join_error)?;
        self.resources.device = Some(device);
        self.resources.wake = Some(wake);

        match waited {
            Ok(Some(keyword)) => {
                tracing::info!(stage = %Stage::AwaitWake, keyword, "wake word heard");
            }
            Ok(None) => return Ok(()), // cancelled while waiting
            Err(e) => {
                tracing::warn!(stage = %Stage::AwaitWake, "wake gate failed: {}", e);
                return Ok(());
            }
        }

        tracing::debug!(stage = %Stage::Ack, "acknowledging");
        self.speak_line(self.config.assistant.ack_phrase.clone())
            .await?;
        tokio::time::sleep(Duration::from_millis(self.config.assistant.post_ack_delay_ms)).await;

        tracing::info!(stage = %Stage::Record, "recording");
        let mut device = self.take_device()?;
        let mut recorder = self
            .resources
            .recorder
            .take()
            .ok_or_else(|| missing("recorder"))?;
        let cancel = self.cancel.clone();
        let (device, recorder, recorded) = tokio::task::spawn_blocking(move || {
            let recorded = recorder.record(device.as_mut(), &cancel);
            (device, recorder, recorded)
        })
        .await
        .map_err(join_error)?;
        self.resources.device = Some(device);
        self.resources.recorder = Some(recorder);

        let utterance = match recorded {
            Ok(utterance) => utterance,
            Err(e) => {
                tracing::warn!(stage = %Stage::Record, "recording failed: {}", e);
                return Ok(());
            }
        };

        if self.cancel.is_cancelled() {
            // A cut-short capture is discarded, not transcribed
            return Ok(());
        }
        if utterance.is_empty() {
            tracing::warn!(stage = %Stage::Record, "no speech captured, back to wake word");
            return Ok(());
        }
        tracing::debug!(
            stage = %Stage::Record,
            duration_ms = utterance.duration_ms(),
            "utterance captured"
        );

        let sample_rate = utterance.sample_rate();
        let samples = wav::normalize_peak(utterance.samples());

        if let Some(path) = &self.config.assistant.debug_recording {
            match wav::write_wav(path, &samples, sample_rate) {
                Ok(()) => tracing::debug!(path = %path.display(), "debug recording written"),
                Err(e) => tracing::warn!("failed to write debug recording: {}", e),
            }
        }

        tracing::info!(stage = %Stage::Transcribe, "transcribing");
        let transcriber = self
            .resources
            .transcriber
            .clone()
            .ok_or_else(|| missing("transcriber"))?;
        let language = self.config.stt.language.clone();
        let transcribed = tokio::task::spawn_blocking(move || {
            transcriber.transcribe(&samples, sample_rate, &language)
        })
        .await
        .map_err(join_error)?;

        let text = match transcribed {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(stage = %Stage::Transcribe, "transcription failed: {}", e);
                return Ok(());
            }
        };
        if text.is_empty() {
            tracing::info!(stage = %Stage::Transcribe, "nothing understood");
            self.speak_line(self.config.assistant.retry_phrase.clone())
                .await?;
            return Ok(());
        }
        tracing::info!(stage = %Stage::Transcribe, text = %text, "request transcribed");

        tracing::info!(stage = %Stage::Respond, "generating reply");
        let responder = self
            .resources
            .responder
            .clone()
            .ok_or_else(|| missing("responder"))?;
        let max_tokens = self.config.llm.max_tokens;
        let prompt = text.clone();
        let responded =
            tokio::task::spawn_blocking(move || responder.respond(&prompt, max_tokens))
                .await
                .map_err(join_error)?;

        let reply = match responded {
            Ok(reply) if !reply.is_empty() => reply,
            Ok(_) => {
                tracing::info!(stage = %Stage::Respond, "empty reply, using fallback");
                self.config.assistant.fallback_phrase.clone()
            }
            Err(e) => {
                tracing::warn!(stage = %Stage::Respond, "response generation failed: {}", e);
                self.config.assistant.fallback_phrase.clone()
            }
        };

        tracing::info!(stage = %Stage::Speak, "speaking reply");
        self.speak_line(reply).await?;

        Ok(())
    }

    fn take_device(&mut self) -> Result<Box<dyn crate::audio::source::FrameSource>> {
        self.resources
            .device
            .take()
            .ok_or_else(|| missing("audio device"))
    }

    /// Speak one line on the blocking pool. Synthesis failures are contained;
    /// only a panicked stage propagates.
    async fn speak_line(&mut self, text: String) -> Result<()> {
        let synthesizer = self
            .resources
            .synthesizer
            .clone()
            .ok_or_else(|| missing("synthesizer"))?;
        let spoken = tokio::task::spawn_blocking(move || synthesizer.speak(&text))
            .await
            .map_err(join_error)?;
        if let Err(e) = spoken {
            tracing::warn!(stage = %Stage::Speak, "synthesis failed: {}", e);
        }
        Ok(())
    }
}

fn missing(what: &str) -> HearkenError {
    HearkenError::Other(format!("{} not acquired", what))
}

fn join_error(e: JoinError) -> HearkenError {
    if e.is_panic() {
        let payload = e.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        HearkenError::Other(format!("pipeline stage panicked: {}", message))
    } else {
        HearkenError::Other("pipeline stage was aborted".to_string())
    }
}
