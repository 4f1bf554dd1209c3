//! Probabilistic silent-chunk segmentation.
//!
//! Each frame gets a speech probability from a scorer. A frame strictly above
//! the threshold starts or extends speech and clears the silence counter; a
//! frame strictly below it while speaking counts toward the silence budget.
//! A probability exactly at the threshold changes nothing. Recording ends
//! once the budget of consecutive silent chunks is spent.

use crate::error::Result;
use crate::segment::strategy::{SegmentEvent, SegmentStrategy};
use crate::segment::vad::SpeechScorer;

pub struct ProbabilityStrategy {
    scorer: Box<dyn SpeechScorer>,
    threshold: f32,
    max_silent_chunks: u32,
    speaking: bool,
    silent_chunks: u32,
}

impl ProbabilityStrategy {
    /// `max_silent_chunks` is typically `silence_duration_ms / frame_duration_ms`.
    pub fn new(scorer: Box<dyn SpeechScorer>, threshold: f32, max_silent_chunks: u32) -> Self {
        Self {
            scorer,
            threshold,
            max_silent_chunks: max_silent_chunks.max(1),
            speaking: false,
            silent_chunks: 0,
        }
    }
}

impl SegmentStrategy for ProbabilityStrategy {
    fn feed(&mut self, frame: &[i16]) -> Result<SegmentEvent> {
        let probability = self.scorer.speech_probability(frame)?;

        if !self.speaking {
            if probability > self.threshold {
                self.speaking = true;
                self.silent_chunks = 0;
                return Ok(SegmentEvent::Start {
                    lead_in: frame.to_vec(),
                });
            }
            return Ok(SegmentEvent::Pending);
        }

        if probability > self.threshold {
            self.silent_chunks = 0;
        } else if probability < self.threshold {
            self.silent_chunks += 1;
        }

        if self.silent_chunks >= self.max_silent_chunks {
            return Ok(SegmentEvent::End);
        }

        Ok(SegmentEvent::Voice)
    }

    fn reset(&mut self) {
        self.speaking = false;
        self.silent_chunks = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::vad::MockScorer;

    #[test]
    fn stays_pending_below_threshold() {
        let scorer = MockScorer::new().with_probabilities(&[0.1, 0.3, 0.49]);
        let mut strategy = ProbabilityStrategy::new(Box::new(scorer), 0.5, 25);

        for _ in 0..3 {
            assert_eq!(strategy.feed(&[0; 4]).unwrap(), SegmentEvent::Pending);
        }
    }

    #[test]
    fn starts_with_the_triggering_frame_as_lead_in() {
        let scorer = MockScorer::new().with_probabilities(&[0.2, 0.8]);
        let mut strategy = ProbabilityStrategy::new(Box::new(scorer), 0.5, 25);

        assert_eq!(strategy.feed(&[1, 2]).unwrap(), SegmentEvent::Pending);
        match strategy.feed(&[3, 4]).unwrap() {
            SegmentEvent::Start { lead_in } => assert_eq!(lead_in, vec![3, 4]),
            other => panic!("expected Start, got {:?}", other),
        }
    }

    #[test]
    fn twenty_five_silent_chunks_end_recording_but_twenty_four_do_not() {
        // 800 ms silence budget at 32 ms frames = 25 chunks
        let mut probabilities = vec![0.9];
        probabilities.extend(vec![0.1; 25]);
        let scorer = MockScorer::new().with_probabilities(&probabilities);
        let mut strategy = ProbabilityStrategy::new(Box::new(scorer), 0.5, 25);

        assert!(matches!(
            strategy.feed(&[0; 4]).unwrap(),
            SegmentEvent::Start { .. }
        ));
        for _ in 0..24 {
            assert_eq!(strategy.feed(&[0; 4]).unwrap(), SegmentEvent::Voice);
        }
        assert_eq!(strategy.feed(&[0; 4]).unwrap(), SegmentEvent::End);
    }

    #[test]
    fn speech_resets_the_silence_counter() {
        let mut probabilities = vec![0.9];
        probabilities.extend(vec![0.1; 24]);
        probabilities.push(0.9);
        probabilities.extend(vec![0.1; 24]);
        let scorer = MockScorer::new().with_probabilities(&probabilities);
        let mut strategy = ProbabilityStrategy::new(Box::new(scorer), 0.5, 25);

        strategy.feed(&[0; 4]).unwrap();
        for _ in 0..24 {
            assert_eq!(strategy.feed(&[0; 4]).unwrap(), SegmentEvent::Voice);
        }
        // Speech again: counter back to zero
        assert_eq!(strategy.feed(&[0; 4]).unwrap(), SegmentEvent::Voice);
        // 24 more silent chunks still not enough
        for _ in 0..24 {
            assert_eq!(strategy.feed(&[0; 4]).unwrap(), SegmentEvent::Voice);
        }
    }

    #[test]
    fn exact_threshold_changes_nothing() {
        // At-threshold frames neither extend speech nor count as silence
        let mut probabilities = vec![0.9];
        probabilities.extend(vec![0.5; 10]);
        probabilities.extend(vec![0.1; 2]);
        let scorer = MockScorer::new().with_probabilities(&probabilities);
        let mut strategy = ProbabilityStrategy::new(Box::new(scorer), 0.5, 2);

        strategy.feed(&[0; 4]).unwrap();
        for _ in 0..10 {
            assert_eq!(strategy.feed(&[0; 4]).unwrap(), SegmentEvent::Voice);
        }
        assert_eq!(strategy.feed(&[0; 4]).unwrap(), SegmentEvent::Voice);
        assert_eq!(strategy.feed(&[0; 4]).unwrap(), SegmentEvent::End);
    }

    #[test]
    fn at_threshold_never_starts_speech() {
        let scorer = MockScorer::new().with_probabilities(&[0.5, 0.5]);
        let mut strategy = ProbabilityStrategy::new(Box::new(scorer), 0.5, 25);

        assert_eq!(strategy.feed(&[0; 4]).unwrap(), SegmentEvent::Pending);
        assert_eq!(strategy.feed(&[0; 4]).unwrap(), SegmentEvent::Pending);
    }

    #[test]
    fn reset_returns_to_listening() {
        let scorer = MockScorer::new().with_probabilities(&[0.9, 0.9]);
        let mut strategy = ProbabilityStrategy::new(Box::new(scorer), 0.5, 25);

        assert!(matches!(
            strategy.feed(&[0; 4]).unwrap(),
            SegmentEvent::Start { .. }
        ));
        strategy.reset();
        assert!(matches!(
            strategy.feed(&[0; 4]).unwrap(),
            SegmentEvent::Start { .. }
        ));
    }

    #[test]
    fn scorer_error_propagates() {
        let scorer = MockScorer::new().with_error();
        let mut strategy = ProbabilityStrategy::new(Box::new(scorer), 0.5, 25);
        assert!(strategy.feed(&[0; 4]).is_err());
    }
}
