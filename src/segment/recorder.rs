//! Bounded utterance recording.

use crate::audio::source::FrameSource;
use crate::cancel::CancelFlag;
use crate::clock::Clock;
use crate::error::Result;
use crate::segment::strategy::{SegmentEvent, SegmentStrategy};
use crate::segment::Utterance;
use std::sync::Arc;
use std::time::Duration;

/// Records one utterance from a frame source, delegating segment boundaries
/// to a strategy and enforcing a hard time ceiling on the whole attempt.
///
/// Returns an empty `Utterance` when the ceiling or cancellation arrives
/// before any speech was detected. A cancelled recording returns whatever
/// was captured so far; the caller decides whether to keep it.
pub struct UtteranceRecorder {
    strategy: Box<dyn SegmentStrategy>,
    max_duration: Duration,
    clock: Arc<dyn Clock>,
}

impl UtteranceRecorder {
    pub fn new(
        strategy: Box<dyn SegmentStrategy>,
        max_duration: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            strategy,
            max_duration,
            clock,
        }
    }

    pub fn record(
        &mut self,
        source: &mut dyn FrameSource,
        cancel: &CancelFlag,
    ) -> Result<Utterance> {
        self.strategy.reset();

        let sample_rate = source.sample_rate();
        let started_at = self.clock.now();
        let mut samples: Vec<i16> = Vec::new();
        let mut in_speech = false;

        loop {
            if cancel.is_cancelled() {
                tracing::debug!("recording cancelled");
                break;
            }
            if self.clock.now().duration_since(started_at) >= self.max_duration {
                tracing::debug!("recording ceiling reached");
                break;
            }

            let frame = match source.read_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!("frame read failed during recording: {}", e);
                    std::thread::sleep(Duration::from_millis(10));
                    continue;
                }
            };

            let event = match self.strategy.feed(&frame) {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!("voice activity check failed: {}", e);
                    continue;
                }
            };

            match event {
                SegmentEvent::Pending => {}
                SegmentEvent::Start { lead_in } => {
                    // The triggering frame is already part of the lead-in
                    in_speech = true;
                    samples.extend(lead_in);
                    tracing::debug!("speech started");
                }
                SegmentEvent::Voice => {
                    samples.extend(frame);
                }
                SegmentEvent::End => {
                    samples.extend(frame);
                    tracing::debug!("speech ended");
                    break;
                }
            }
        }

        if !in_speech {
            return Ok(Utterance::empty(sample_rate));
        }
        Ok(Utterance::new(samples, sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::source::MockFrameSource;
    use crate::clock::{MockClock, SystemClock};
    use crate::segment::energy::EnergyStrategy;
    use crate::segment::probability::ProbabilityStrategy;
    use crate::segment::vad::{MockClassifier, MockScorer};
    use std::sync::Mutex;
    use std::time::Instant;

    /// Clock that advances by a fixed step on every reading.
    struct SteppingClock {
        now: Mutex<Instant>,
        step: Duration,
    }

    impl SteppingClock {
        fn new(step: Duration) -> Self {
            Self {
                now: Mutex::new(Instant::now()),
                step,
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> Instant {
            let mut now = self.now.lock().unwrap();
            *now += self.step;
            *now
        }
    }

    #[test]
    fn records_speech_between_start_and_end() {
        // Capacity 2: two voiced frames trigger, two unvoiced frames end
        let decisions = [true, true, true, false, false];
        let strategy = EnergyStrategy::new(
            Box::new(MockClassifier::new().with_decisions(&decisions)),
            2,
        );
        let mut recorder = UtteranceRecorder::new(
            Box::new(strategy),
            Duration::from_secs(15),
            Arc::new(SystemClock),
        );

        let mut source = MockFrameSource::new()
            .with_frame_length(2)
            .with_frame(vec![10, 11])
            .with_frame(vec![20, 21])
            .with_frame(vec![30, 31])
            .with_frame(vec![0, 0])
            .with_frame(vec![0, 0]);

        let utterance = recorder.record(&mut source, &CancelFlag::new()).unwrap();

        assert!(!utterance.is_empty());
        // Lead-in window (frames 1+2), then Voice frame 3, then the two
        // silent frames that close the segment
        assert_eq!(
            utterance.samples(),
            &[10, 11, 20, 21, 30, 31, 0, 0, 0, 0]
        );
    }

    #[test]
    fn silence_throughout_returns_empty_utterance() {
        let strategy = EnergyStrategy::new(Box::new(MockClassifier::new()), 4);
        // Each loop iteration reads the clock once; 10 ms per reading
        // against a 100 ms ceiling bounds the recording to a few frames.
        let mut recorder = UtteranceRecorder::new(
            Box::new(strategy),
            Duration::from_millis(100),
            Arc::new(SteppingClock::new(Duration::from_millis(10))),
        );

        let mut source = MockFrameSource::new().with_frame_length(4);
        let utterance = recorder.record(&mut source, &CancelFlag::new()).unwrap();

        assert!(utterance.is_empty());
    }

    #[test]
    fn ceiling_cuts_off_endless_speech() {
        let scorer = MockScorer::new().with_probabilities(&[0.9; 200]);
        let strategy = ProbabilityStrategy::new(Box::new(scorer), 0.5, 25);
        let mut recorder = UtteranceRecorder::new(
            Box::new(strategy),
            Duration::from_millis(100),
            Arc::new(SteppingClock::new(Duration::from_millis(10))),
        );

        let mut source = MockFrameSource::new()
            .with_frame_length(4)
            .with_constant_frames(1000, 200);
        let utterance = recorder.record(&mut source, &CancelFlag::new()).unwrap();

        // Speech started on the first frame and never ended; the ceiling
        // bounded it to well under the scripted 200 frames.
        assert!(!utterance.is_empty());
        assert!(utterance.samples().len() < 200 * 4);
    }

    #[test]
    fn cancellation_stops_recording_immediately() {
        let strategy = EnergyStrategy::new(Box::new(MockClassifier::new()), 4);
        let mut recorder = UtteranceRecorder::new(
            Box::new(strategy),
            Duration::from_secs(15),
            Arc::new(SystemClock),
        );

        let cancel = CancelFlag::new();
        cancel.cancel();

        let mut source = MockFrameSource::new().with_frame_length(4);
        let utterance = recorder.record(&mut source, &cancel).unwrap();

        assert!(utterance.is_empty());
    }

    #[test]
    fn transient_read_error_is_retried() {
        let decisions = [true, true, false, false];
        let strategy = EnergyStrategy::new(
            Box::new(MockClassifier::new().with_decisions(&decisions)),
            2,
        );
        let mut recorder = UtteranceRecorder::new(
            Box::new(strategy),
            Duration::from_secs(15),
            Arc::new(SystemClock),
        );

        let mut source = MockFrameSource::new()
            .with_frame_length(2)
            .with_frame(vec![10, 11])
            .with_frame(vec![20, 21])
            .with_frame(vec![0, 0])
            .with_frame(vec![0, 0])
            .with_read_failure_at(0);

        let utterance = recorder.record(&mut source, &CancelFlag::new()).unwrap();

        assert!(!utterance.is_empty());
        assert_eq!(utterance.samples(), &[10, 11, 20, 21, 0, 0, 0, 0]);
    }

    #[test]
    fn utterance_carries_source_sample_rate() {
        let strategy = EnergyStrategy::new(Box::new(MockClassifier::new()), 4);
        let mut recorder = UtteranceRecorder::new(
            Box::new(strategy),
            Duration::from_millis(50),
            Arc::new(SteppingClock::new(Duration::from_millis(10))),
        );

        let mut source = MockFrameSource::new().with_frame_length(4);
        let utterance = recorder.record(&mut source, &CancelFlag::new()).unwrap();

        assert_eq!(utterance.sample_rate(), 16000);
    }

    #[test]
    fn mock_clock_keeps_recorder_under_ceiling() {
        // A frozen clock never reaches the ceiling; the End event does
        let clock = MockClock::new();
        let decisions = [true, true, false, false];
        let strategy = EnergyStrategy::new(
            Box::new(MockClassifier::new().with_decisions(&decisions)),
            2,
        );
        let mut recorder = UtteranceRecorder::new(
            Box::new(strategy),
            Duration::from_millis(1),
            Arc::new(clock),
        );

        let mut source = MockFrameSource::new()
            .with_frame_length(2)
            .with_constant_frames(500, 4);

        let utterance = recorder.record(&mut source, &CancelFlag::new()).unwrap();
        assert!(!utterance.is_empty());
    }
}
