//! Audio capture and playback.

pub mod capture;
pub mod playback;
pub mod source;
pub mod wav;

pub use capture::{CpalFrameSource, list_devices, suppress_audio_warnings};
pub use playback::play_pcm;
pub use source::FrameSource;
pub use wav::WavFrameSource;
