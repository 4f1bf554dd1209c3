//! Fixed-capacity ring window of recent frames.

use std::collections::VecDeque;

/// Sliding window over the most recent frames, each tagged with its voice
/// activity decision. Pushing beyond capacity evicts the oldest frame.
pub struct RingWindow {
    frames: VecDeque<(Vec<i16>, bool)>,
    capacity: usize,
}

impl RingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, frame: Vec<i16>, voiced: bool) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back((frame, voiced));
    }

    /// Number of frames currently tagged as voiced.
    pub fn voiced_count(&self) -> usize {
        self.frames.iter().filter(|(_, voiced)| *voiced).count()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Concatenate all buffered frames in order and clear the window.
    pub fn drain(&mut self) -> Vec<i16> {
        let mut samples = Vec::new();
        for (frame, _) in self.frames.drain(..) {
            samples.extend(frame);
        }
        samples
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
