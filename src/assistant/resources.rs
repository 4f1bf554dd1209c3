//! Long-lived pipeline resources.
//!
//! Resources are acquired once at startup in a fixed order (audio device,
//! wake detector, recorder, transcriber, responder, synthesizer) and released
//! exactly once in the reverse order. Release is idempotent; dropping the
//! struct releases whatever is still held, which also covers acquisition
//! failures partway through startup.

use crate::audio::source::FrameSource;
use crate::llm::Responder;
use crate::segment::UtteranceRecorder;
use crate::stt::Transcriber;
use crate::tts::Synthesizer;
use crate::wake::detector::WakeWordDetector;
use std::sync::Arc;

#[derive(Default)]
pub struct Resources {
    pub device: Option<Box<dyn FrameSource>>,
    pub wake: Option<Box<dyn WakeWordDetector>>,
    pub recorder: Option<UtteranceRecorder>,
    pub transcriber: Option<Arc<dyn Transcriber>>,
    pub responder: Option<Arc<dyn Responder>>,
    pub synthesizer: Option<Arc<dyn Synthesizer>>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Release everything still held, in reverse acquisition order.
    /// Safe to call any number of times.
    pub fn release(&mut self) {
        if self.synthesizer.take().is_some() {
            tracing::debug!("released synthesizer");
        }
        if self.responder.take().is_some() {
            tracing::debug!("released responder");
        }
        if self.transcriber.take().is_some() {
            tracing::debug!("released transcriber");
        }
        if self.recorder.take().is_some() {
            tracing::debug!("released recorder");
        }
        if self.wake.take().is_some() {
            tracing::debug!("released wake detector");
        }
        if let Some(mut device) = self.device.take() {
            if let Err(e) = device.close() {
                tracing::warn!("failed to close audio device: {}", e);
            }
            tracing::debug!("released audio device");
        }
    }

    /// True once every slot has been released.
    pub fn is_released(&self) -> bool {
        self.device.is_none()
            && self.wake.is_none()
            && self.recorder.is_none()
            && self.transcriber.is_none()
            && self.responder.is_none()
            && self.synthesizer.is_none()
    }
}

impl Drop for Resources {
    fn drop(&mut self) {
        self.release();
    }
}
