//! Wake-word detection and gating.

pub mod detector;
pub mod gate;

pub use detector::WakeWordDetector;
pub use gate::wait_for_wake_word;
