//! Voice activity primitives.
//!
//! Two seams: a binary classifier (speech / not speech) for the energy
//! strategy, and a probability scorer for the probabilistic strategy. The
//! built-in implementations are RMS-based; model-backed ones plug in behind
//! the same traits.

use crate::error::Result;

/// Binary voice activity decision per frame.
pub trait SpeechClassifier: Send {
    fn is_speech(&mut self, frame: &[i16]) -> Result<bool>;
}

/// Per-frame speech probability in [0.0, 1.0].
pub trait SpeechScorer: Send {
    fn speech_probability(&mut self, frame: &[i16]) -> Result<f32>;
}

/// Calculate the RMS (Root Mean Square) level of audio samples.
///
/// Samples are normalized to [-1.0, 1.0] before squaring, so the result is
/// comparable across bit depths.
pub fn calculate_rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples
        .iter()
        .map(|&sample| {
            let normalized = sample as f64 / i16::MAX as f64;
            normalized * normalized
        })
        .sum();

    let mean_square = sum_squares / samples.len() as f64;
    mean_square.sqrt() as f32
}

/// RMS-threshold classifier. A frame is speech when its RMS level exceeds
/// the threshold.
pub struct RmsClassifier {
    threshold: f32,
}

impl RmsClassifier {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }
}

impl SpeechClassifier for RmsClassifier {
    fn is_speech(&mut self, frame: &[i16]) -> Result<bool> {
        Ok(calculate_rms(frame) > self.threshold)
    }
}

/// RMS-derived probability scorer.
///
/// Maps the RMS level onto [0.0, 1.0] so the probabilistic strategy can run
/// without a model. The threshold level maps to 0.5; twice the threshold or
/// more saturates at 1.0.
pub struct RmsScorer {
    threshold: f32,
}

impl RmsScorer {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }
}

impl SpeechScorer for RmsScorer {
    fn speech_probability(&mut self, frame: &[i16]) -> Result<f32> {
        if self.threshold <= 0.0 {
            return Ok(1.0);
        }
        let rms = calculate_rms(frame);
        Ok((rms / (2.0 * self.threshold)).clamp(0.0, 1.0))
    }
}

/// Scripted classifier for tests.
pub struct MockClassifier {
    decisions: std::collections::VecDeque<Result<bool>>,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self {
            decisions: std::collections::VecDeque::new(),
        }
    }

    pub fn with_decision(mut self, decision: bool) -> Self {
        self.decisions.push_back(Ok(decision));
        self
    }

    pub fn with_decisions(mut self, decisions: &[bool]) -> Self {
        for &d in decisions {
            self.decisions.push_back(Ok(d));
        }
        self
    }

    pub fn with_error(mut self) -> Self {
        self.decisions
            .push_back(Err(crate::error::HearkenError::VoiceActivity {
                message: "injected classifier failure".to_string(),
            }));
        self
    }
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechClassifier for MockClassifier {
    fn is_speech(&mut self, _frame: &[i16]) -> Result<bool> {
        self.decisions.pop_front().unwrap_or(Ok(false))
    }
}

/// Scripted scorer for tests.
pub struct MockScorer {
    probabilities: std::collections::VecDeque<Result<f32>>,
}

impl MockScorer {
    pub fn new() -> Self {
        Self {
            probabilities: std::collections::VecDeque::new(),
        }
    }

    pub fn with_probability(mut self, p: f32) -> Self {
        self.probabilities.push_back(Ok(p));
        self
    }

    pub fn with_probabilities(mut self, ps: &[f32]) -> Self {
        for &p in ps {
            self.probabilities.push_back(Ok(p));
        }
        self
    }

    pub fn with_error(mut self) -> Self {
        self.probabilities
            .push_back(Err(crate::error::HearkenError::VoiceActivity {
                message: "injected scorer failure".to_string(),
            }));
        self
    }
}

impl Default for MockScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechScorer for MockScorer {
    fn speech_probability(&mut self, _frame: &[i16]) -> Result<f32> {
        self.probabilities.pop_front().unwrap_or(Ok(0.0))
    }
}
