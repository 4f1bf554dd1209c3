//! Wake-word gate: block until the keyword is heard or cancellation arrives.

use crate::audio::source::FrameSource;
use crate::cancel::CancelFlag;
use crate::error::Result;
use crate::wake::detector::WakeWordDetector;
use std::time::Duration;

/// Read frames and feed them to the detector until it reports a keyword.
///
/// Returns `Some(keyword_index)` on a match and `None` if cancellation was
/// requested first. Transient read or detector errors are logged and retried
/// in place; only cancellation bounds the wait.
pub fn wait_for_wake_word(
    source: &mut dyn FrameSource,
    detector: &mut dyn WakeWordDetector,
    cancel: &CancelFlag,
) -> Result<Option<usize>> {
    loop {
        if cancel.is_cancelled() {
            tracing::debug!("wake wait cancelled");
            return Ok(None);
        }

        let frame = match source.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("frame read failed while waiting for wake word: {}", e);
                std::thread::sleep(Duration::from_millis(10));
                continue;
            }
        };

        match detector.process(&frame) {
            Ok(index) if index >= 0 => {
                tracing::info!(keyword = index, "wake word detected");
                return Ok(Some(index as usize));
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("wake detector failed on frame: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::source::MockFrameSource;
    use crate::wake::detector::MockWakeDetector;

    #[test]
    fn returns_match_index() {
        let mut source = MockFrameSource::new();
        let mut detector = MockWakeDetector::new().with_silence(3).with_match(2);

        let result = wait_for_wake_word(&mut source, &mut detector, &CancelFlag::new()).unwrap();

        assert_eq!(result, Some(2));
        assert_eq!(detector.processed(), 4);
    }

    #[test]
    fn returns_none_when_cancelled() {
        let mut source = MockFrameSource::new();
        let mut detector = MockWakeDetector::new();
        let cancel = CancelFlag::new();
        cancel.cancel();

        let result = wait_for_wake_word(&mut source, &mut detector, &cancel).unwrap();

        assert_eq!(result, None);
        assert_eq!(detector.processed(), 0);
    }

    #[test]
    fn transient_read_error_is_retried() {
        let mut source = MockFrameSource::new().with_read_failure_at(0);
        let mut detector = MockWakeDetector::new().with_silence(1).with_match(0);

        let result = wait_for_wake_word(&mut source, &mut detector, &CancelFlag::new()).unwrap();

        assert_eq!(result, Some(0));
    }

    #[test]
    fn transient_detector_error_is_retried() {
        let mut source = MockFrameSource::new();
        let mut detector = MockWakeDetector::new()
            .with_silence(1)
            .with_error()
            .with_match(0);

        let result = wait_for_wake_word(&mut source, &mut detector, &CancelFlag::new()).unwrap();

        assert_eq!(result, Some(0));
        assert_eq!(detector.processed(), 3);
    }
}
