//! Default configuration constants for hearken.
//!
//! Shared across config types so the same tuning values are used everywhere.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard rate for speech models and keeps frame timing
/// arithmetic exact for the frame lengths used here.
pub const SAMPLE_RATE: u32 = 16_000;

/// Default frame length in samples.
///
/// 512 samples at 16kHz is a 32ms frame, matching the chunk size the
/// probabilistic classifier operates on.
pub const FRAME_LENGTH: usize = 512;

/// Default RMS threshold for the binary speech classifier (0.0 to 1.0).
///
/// Tuned for typical microphone input levels; filters ambient noise while
/// staying sensitive to quiet speech.
pub const VAD_THRESHOLD: f32 = 0.02;

/// Default speech probability threshold for the probabilistic strategy.
pub const SPEECH_PROBABILITY_THRESHOLD: f32 = 0.5;

/// Default silence duration in milliseconds before an utterance is considered
/// ended. Also sets the look-back window of the energy strategy.
pub const SILENCE_DURATION_MS: u32 = 800;

/// Voiced fraction of the look-back window that confirms speech has begun.
pub const TRIGGER_FRACTION: f32 = 0.9;

/// Voiced fraction of the look-back window below which speech has ended.
pub const RELEASE_FRACTION: f32 = 0.1;

/// Hard ceiling on a single recording, in seconds.
///
/// Guards against runaway recordings when silence is never detected.
pub const MAX_RECORD_SECS: u32 = 15;

/// Default RMS threshold for the reference wake detector.
///
/// Higher than the VAD threshold: the wake phrase is expected to be spoken
/// directly at the microphone.
pub const WAKE_THRESHOLD: f32 = 0.04;

/// Consecutive active frames required before the reference wake detector
/// reports a match.
pub const WAKE_MIN_ACTIVE_FRAMES: usize = 8;

/// Default language hint passed to the transcriber.
pub const LANGUAGE: &str = "en";

/// Default token budget for generated replies.
pub const MAX_TOKENS: u32 = 150;

/// Spoken acknowledgement after the wake word is detected.
pub const ACK_PHRASE: &str = "Yes?";

/// Spoken when the transcription comes back empty.
pub const RETRY_PHRASE: &str = "Sorry, I didn't catch that. Please try again.";

/// Spoken when the response generator returns nothing.
pub const FALLBACK_PHRASE: &str = "I'm afraid I can't answer that right now.";

/// Pause between the acknowledgement and the start of recording, in
/// milliseconds, so the prompt itself is not captured.
pub const POST_ACK_DELAY_MS: u64 = 500;
