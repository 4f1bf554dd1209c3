//! Energy ring-window segmentation.
//!
//! Keeps a sliding window of recent frames tagged by a binary classifier.
//! Speech starts once more than 90% of the window is voiced; at that point
//! the whole window is flushed into the utterance so the first words are not
//! lost. Speech ends once unvoiced frames fill more than 90% of the window's
//! capacity, so a near-full window of silence must accumulate after the
//! trigger before recording stops.

use crate::defaults::{RELEASE_FRACTION, TRIGGER_FRACTION};
use crate::error::Result;
use crate::segment::strategy::{SegmentEvent, SegmentStrategy};
use crate::segment::vad::SpeechClassifier;
use crate::segment::window::RingWindow;

pub struct EnergyStrategy {
    classifier: Box<dyn SpeechClassifier>,
    window: RingWindow,
    triggered: bool,
}

impl EnergyStrategy {
    /// `window_frames` is the look-back window capacity, typically
    /// `silence_duration_ms / frame_duration_ms`.
    pub fn new(classifier: Box<dyn SpeechClassifier>, window_frames: usize) -> Self {
        Self {
            classifier,
            window: RingWindow::new(window_frames.max(1)),
            triggered: false,
        }
    }
}

impl SegmentStrategy for EnergyStrategy {
    fn feed(&mut self, frame: &[i16]) -> Result<SegmentEvent> {
        let voiced = self.classifier.is_speech(frame)?;
        let capacity = self.window.capacity() as f32;

        if !self.triggered {
            self.window.push(frame.to_vec(), voiced);

            if self.window.voiced_count() as f32 > TRIGGER_FRACTION * capacity {
                self.triggered = true;
                let lead_in = self.window.drain();
                return Ok(SegmentEvent::Start { lead_in });
            }
            return Ok(SegmentEvent::Pending);
        }

        self.window.push(frame.to_vec(), voiced);

        // End once the unvoiced share of the window exceeds 90% of capacity.
        // The window was cleared at trigger, so this takes at least a full
        // window of near-silence after speech.
        let unvoiced = self.window.len() - self.window.voiced_count();
        if unvoiced as f32 > (1.0 - RELEASE_FRACTION) * capacity {
            return Ok(SegmentEvent::End);
        }

        Ok(SegmentEvent::Voice)
    }

    fn reset(&mut self) {
        self.window.clear();
        self.triggered = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::vad::MockClassifier;

    fn strategy_with(decisions: &[bool], window_frames: usize) -> EnergyStrategy {
        EnergyStrategy::new(
            Box::new(MockClassifier::new().with_decisions(decisions)),
            window_frames,
        )
    }

    #[test]
    fn stays_pending_below_trigger_fraction() {
        // Capacity 10: needs more than 9 voiced frames in the window
        let decisions = vec![true; 9];
        let mut strategy = strategy_with(&decisions, 10);

        for _ in 0..9 {
            assert_eq!(strategy.feed(&[100; 4]).unwrap(), SegmentEvent::Pending);
        }
    }

    #[test]
    fn triggers_on_thirty_seventh_voiced_frame_with_capacity_forty() {
        // 50 unvoiced frames first, then voiced. Trigger requires
        // voiced_count > 0.9 * 40 = 36, so the 37th voiced frame fires it.
        let mut decisions = vec![false; 50];
        decisions.extend(vec![true; 40]);
        let mut strategy = strategy_with(&decisions, 40);

        for _ in 0..50 {
            assert_eq!(strategy.feed(&[0; 4]).unwrap(), SegmentEvent::Pending);
        }
        for _ in 0..36 {
            assert_eq!(strategy.feed(&[900; 4]).unwrap(), SegmentEvent::Pending);
        }
        match strategy.feed(&[900; 4]).unwrap() {
            SegmentEvent::Start { lead_in } => {
                // Window held 40 frames of 4 samples each at the trigger
                assert_eq!(lead_in.len(), 160);
            }
            other => panic!("expected Start, got {:?}", other),
        }
    }

    #[test]
    fn lead_in_holds_exact_window_contents() {
        // Capacity 2: trigger needs voiced_count > 1.8, so two voiced frames
        let mut strategy = strategy_with(&[true, true], 2);

        assert_eq!(strategy.feed(&[1, 2]).unwrap(), SegmentEvent::Pending);
        match strategy.feed(&[3, 4]).unwrap() {
            SegmentEvent::Start { lead_in } => assert_eq!(lead_in, vec![1, 2, 3, 4]),
            other => panic!("expected Start, got {:?}", other),
        }
    }

    #[test]
    fn ends_after_sustained_silence() {
        // Capacity 4: trigger after 4 voiced frames. Then the window must
        // refill with silence (voiced_count < 0.4) to end.
        let mut decisions = vec![true; 4];
        decisions.extend(vec![false; 4]);
        let mut strategy = strategy_with(&decisions, 4);

        for _ in 0..3 {
            assert_eq!(strategy.feed(&[500; 2]).unwrap(), SegmentEvent::Pending);
        }
        assert!(matches!(
            strategy.feed(&[500; 2]).unwrap(),
            SegmentEvent::Start { .. }
        ));

        // Window refills: 1, 2, 3 silent frames keep it Voice (window not full)
        assert_eq!(strategy.feed(&[0; 2]).unwrap(), SegmentEvent::Voice);
        assert_eq!(strategy.feed(&[0; 2]).unwrap(), SegmentEvent::Voice);
        assert_eq!(strategy.feed(&[0; 2]).unwrap(), SegmentEvent::Voice);
        assert_eq!(strategy.feed(&[0; 2]).unwrap(), SegmentEvent::End);
    }

    #[test]
    fn freshly_cleared_window_cannot_end_recording_early() {
        // Capacity 12: trigger clears the window, so the end condition
        // (unvoiced > 0.9 * 12 = 10.8) needs 11 silent frames to accumulate.
        // The count is measured against capacity, not the partial window, so
        // the first silent frames after the trigger must not end recording.
        let mut decisions = vec![true; 11];
        decisions.extend(vec![false; 11]);
        let mut strategy = strategy_with(&decisions, 12);

        for _ in 0..10 {
            assert_eq!(strategy.feed(&[700; 2]).unwrap(), SegmentEvent::Pending);
        }
        assert!(matches!(
            strategy.feed(&[700; 2]).unwrap(),
            SegmentEvent::Start { .. }
        ));

        for _ in 0..10 {
            assert_eq!(strategy.feed(&[0; 2]).unwrap(), SegmentEvent::Voice);
        }
        assert_eq!(strategy.feed(&[0; 2]).unwrap(), SegmentEvent::End);
    }

    #[test]
    fn reset_returns_to_listening() {
        let mut decisions = vec![true; 2];
        decisions.extend(vec![true; 1]);
        let mut strategy = strategy_with(&decisions, 2);

        strategy.feed(&[1; 2]).unwrap();
        assert!(matches!(
            strategy.feed(&[1; 2]).unwrap(),
            SegmentEvent::Start { .. }
        ));

        strategy.reset();
        assert_eq!(strategy.feed(&[1; 2]).unwrap(), SegmentEvent::Pending);
    }

    #[test]
    fn classifier_error_propagates() {
        let mut strategy = EnergyStrategy::new(Box::new(MockClassifier::new().with_error()), 4);
        assert!(strategy.feed(&[0; 2]).is_err());
    }
}
