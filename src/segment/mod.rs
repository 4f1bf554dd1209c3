//! Utterance segmentation.
//!
//! Turns a stream of PCM frames into a bounded voice segment. Two strategies
//! are available: an energy ring-window (good with no extra models) and a
//! probabilistic silent-chunk counter (for scorers that emit speech
//! probabilities). Both feed the same recorder loop.

pub mod energy;
pub mod probability;
pub mod recorder;
pub mod strategy;
pub mod vad;
pub mod window;

pub use recorder::UtteranceRecorder;
pub use strategy::{SegmentEvent, SegmentStrategy};

/// A recorded voice segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    samples: Vec<i16>,
    sample_rate: u32,
}

impl Utterance {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// An utterance with no audio, produced when recording ends before any
    /// speech was detected.
    pub fn empty(sample_rate: u32) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.samples.len() as u64 * 1000) / self.sample_rate as u64
    }

    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_utterance_reports_empty() {
        let u = Utterance::empty(16000);
        assert!(u.is_empty());
        assert_eq!(u.duration_ms(), 0);
    }

    #[test]
    fn duration_is_derived_from_rate() {
        let u = Utterance::new(vec![0; 16000], 16000);
        assert_eq!(u.duration_ms(), 1000);

        let u = Utterance::new(vec![0; 8000], 16000);
        assert_eq!(u.duration_ms(), 500);
    }

    #[test]
    fn into_samples_returns_audio() {
        let u = Utterance::new(vec![1, 2, 3], 16000);
        assert_eq!(u.into_samples(), vec![1, 2, 3]);
    }
}
