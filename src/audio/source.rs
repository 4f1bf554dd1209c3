//! Frame-oriented audio input abstraction.
//!
//! The pipeline consumes audio as fixed-size frames of 16-bit PCM. Everything
//! downstream of capture (wake gate, segmentation, recording) works against
//! this trait, so tests can substitute scripted sources for real hardware.

use crate::error::Result;

/// Source of fixed-size PCM frames.
///
/// A source must be opened before reading and closed when done. `close` is
/// idempotent; calling it on a never-opened or already-closed source is a no-op.
pub trait FrameSource: Send {
    /// Acquire the underlying device or data and start delivering frames.
    fn open(&mut self) -> Result<()>;

    /// Read the next frame. Blocks until a full frame is available.
    ///
    /// Returns exactly `frame_length()` samples under normal operation. A
    /// shorter frame means the source dropped data and the caller should
    /// treat the frame as degraded, not fatal.
    fn read_frame(&mut self) -> Result<Vec<i16>>;

    /// Stop delivery and release the underlying device or data.
    fn close(&mut self) -> Result<()>;

    /// Sample rate of delivered frames in Hz.
    fn sample_rate(&self) -> u32;

    /// Number of samples per frame.
    fn frame_length(&self) -> usize;
}

/// Mock frame source for testing.
///
/// Serves a scripted sequence of frames, then silent frames forever. Read
/// failures can be injected at specific read indices to exercise error paths.
pub struct MockFrameSource {
    frames: std::collections::VecDeque<Vec<i16>>,
    fail_on_reads: std::collections::HashSet<usize>,
    read_count: usize,
    sample_rate: u32,
    frame_length: usize,
    open_count: usize,
    close_count: usize,
    is_open: bool,
    fail_on_open: bool,
}

impl MockFrameSource {
    pub fn new() -> Self {
        Self {
            frames: std::collections::VecDeque::new(),
            fail_on_reads: std::collections::HashSet::new(),
            read_count: 0,
            sample_rate: crate::defaults::SAMPLE_RATE,
            frame_length: crate::defaults::FRAME_LENGTH,
            open_count: 0,
            close_count: 0,
            is_open: false,
            fail_on_open: false,
        }
    }

    /// Queue a single frame, padded or truncated to the frame length.
    pub fn with_frame(mut self, frame: Vec<i16>) -> Self {
        let mut frame = frame;
        frame.resize(self.frame_length, 0);
        self.frames.push_back(frame);
        self
    }

    /// Queue `count` frames filled with the given sample value.
    pub fn with_constant_frames(mut self, value: i16, count: usize) -> Self {
        for _ in 0..count {
            self.frames.push_back(vec![value; self.frame_length]);
        }
        self
    }

    /// Inject a read failure at the given zero-based read index.
    pub fn with_read_failure_at(mut self, index: usize) -> Self {
        self.fail_on_reads.insert(index);
        self
    }

    /// Make `open` fail.
    pub fn with_open_failure(mut self) -> Self {
        self.fail_on_open = true;
        self
    }

    pub fn with_frame_length(mut self, frame_length: usize) -> Self {
        self.frame_length = frame_length;
        self
    }

    pub fn open_count(&self) -> usize {
        self.open_count
    }

    pub fn close_count(&self) -> usize {
        self.close_count
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }
}

impl Default for MockFrameSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for MockFrameSource {
    fn open(&mut self) -> Result<()> {
        if self.fail_on_open {
            return Err(crate::error::HearkenError::AudioCapture {
                message: "injected open failure".to_string(),
            });
        }
        self.open_count += 1;
        self.is_open = true;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Vec<i16>> {
        let index = self.read_count;
        self.read_count += 1;

        if self.fail_on_reads.contains(&index) {
            return Err(crate::error::HearkenError::AudioCapture {
                message: format!("injected read failure at index {index}"),
            });
        }

        match self.frames.pop_front() {
            Some(frame) => Ok(frame),
            None => Ok(vec![0; self.frame_length]),
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.is_open {
            self.close_count += 1;
            self.is_open = false;
        }
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn frame_length(&self) -> usize {
        self.frame_length
    }
}
