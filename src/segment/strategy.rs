//! Segmentation strategy seam.

use crate::error::Result;

/// What a strategy concluded after seeing one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentEvent {
    /// No speech yet; keep listening.
    Pending,
    /// Speech just started. `lead_in` holds audio that belongs to the
    /// utterance but arrived before the trigger (buffered context frames,
    /// or the triggering frame itself).
    Start { lead_in: Vec<i16> },
    /// Speech is ongoing; the fed frame is part of the utterance.
    Voice,
    /// Speech just ended; the fed frame is the last one of the utterance.
    End,
}

/// Turns a stream of frames into segment boundaries.
///
/// Strategies are stateful. `reset` returns them to the initial listening
/// state so one instance can segment many utterances.
pub trait SegmentStrategy: Send {
    fn feed(&mut self, frame: &[i16]) -> Result<SegmentEvent>;
    fn reset(&mut self);
}
