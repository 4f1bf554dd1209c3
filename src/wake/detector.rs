//! Wake-word detector seam.

use crate::error::Result;
use crate::segment::vad::calculate_rms;

/// Per-frame wake-word detection.
///
/// `process` returns the index of the matched keyword, or a negative value
/// when no keyword was heard in this frame. Detectors expect frames of
/// exactly `frame_length()` samples at `sample_rate()` Hz.
pub trait WakeWordDetector: Send {
    fn process(&mut self, frame: &[i16]) -> Result<i32>;
    fn sample_rate(&self) -> u32;
    fn frame_length(&self) -> usize;
}

/// Energy-burst wake detector.
///
/// Fires (keyword index 0) after a run of consecutive frames whose RMS level
/// exceeds the threshold. A crude stand-in for a real keyword model, but it
/// keeps the pipeline usable without one: any short loud utterance wakes it.
pub struct RmsWakeDetector {
    threshold: f32,
    min_active_frames: usize,
    active_frames: usize,
    sample_rate: u32,
    frame_length: usize,
}

impl RmsWakeDetector {
    pub fn new(
        threshold: f32,
        min_active_frames: usize,
        sample_rate: u32,
        frame_length: usize,
    ) -> Self {
        Self {
            threshold,
            min_active_frames: min_active_frames.max(1),
            active_frames: 0,
            sample_rate,
            frame_length,
        }
    }
}

impl WakeWordDetector for RmsWakeDetector {
    fn process(&mut self, frame: &[i16]) -> Result<i32> {
        if calculate_rms(frame) > self.threshold {
            self.active_frames += 1;
        } else {
            self.active_frames = 0;
        }

        if self.active_frames >= self.min_active_frames {
            self.active_frames = 0;
            return Ok(0);
        }
        Ok(-1)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn frame_length(&self) -> usize {
        self.frame_length
    }
}

/// Scripted detector for tests.
pub struct MockWakeDetector {
    results: std::collections::VecDeque<Result<i32>>,
    processed: usize,
}

impl MockWakeDetector {
    pub fn new() -> Self {
        Self {
            results: std::collections::VecDeque::new(),
            processed: 0,
        }
    }

    /// Script a non-matching frame.
    pub fn with_silence(mut self, count: usize) -> Self {
        for _ in 0..count {
            self.results.push_back(Ok(-1));
        }
        self
    }

    /// Script a keyword match at the given index.
    pub fn with_match(mut self, keyword_index: i32) -> Self {
        self.results.push_back(Ok(keyword_index));
        self
    }

    /// Script a transient processing failure.
    pub fn with_error(mut self) -> Self {
        self.results
            .push_back(Err(crate::error::HearkenError::WakeWord {
                message: "injected detector failure".to_string(),
            }));
        self
    }

    pub fn processed(&self) -> usize {
        self.processed
    }
}

impl Default for MockWakeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl WakeWordDetector for MockWakeDetector {
    fn process(&mut self, _frame: &[i16]) -> Result<i32> {
        self.processed += 1;
        self.results.pop_front().unwrap_or(Ok(-1))
    }

    fn sample_rate(&self) -> u32 {
        crate::defaults::SAMPLE_RATE
    }

    fn frame_length(&self) -> usize {
        crate::defaults::FRAME_LENGTH
    }
}
