//! PCM playback through the default output device.

use crate::error::{HearkenError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Play a mono 16-bit PCM buffer and block until it has been consumed.
///
/// Output is rendered as f32 on the default output device. An empty buffer
/// returns immediately.
pub fn play_pcm(samples: &[i16], sample_rate: u32) -> Result<()> {
    if samples.is_empty() {
        return Ok(());
    }

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| HearkenError::AudioPlayback {
            message: "no default output device".to_string(),
        })?;

    let config = cpal::StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let data: Arc<Vec<f32>> = Arc::new(
        samples
            .iter()
            .map(|&s| s as f32 / i16::MAX as f32)
            .collect(),
    );
    let position = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicBool::new(false));

    let cb_data = Arc::clone(&data);
    let cb_position = Arc::clone(&position);
    let cb_finished = Arc::clone(&finished);

    let stream = device
        .build_output_stream(
            &config,
            move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut pos = cb_position.load(Ordering::Relaxed);
                for sample in out.iter_mut() {
                    if pos < cb_data.len() {
                        *sample = cb_data[pos];
                        pos += 1;
                    } else {
                        *sample = 0.0;
                        cb_finished.store(true, Ordering::Relaxed);
                    }
                }
                cb_position.store(pos, Ordering::Relaxed);
            },
            |err| {
                tracing::warn!("playback stream error: {}", err);
            },
            None,
        )
        .map_err(|e| HearkenError::AudioPlayback {
            message: format!("Failed to build output stream: {}", e),
        })?;

    stream.play().map_err(|e| HearkenError::AudioPlayback {
        message: format!("Failed to start playback: {}", e),
    })?;

    // Poll for completion, with a ceiling in case the callback stalls.
    let audio_len = Duration::from_secs_f64(samples.len() as f64 / sample_rate as f64);
    let deadline = Instant::now() + audio_len + Duration::from_secs(2);
    while !finished.load(Ordering::Relaxed) {
        if Instant::now() >= deadline {
            tracing::warn!("playback did not finish before deadline");
            break;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    // Let the tail of the buffer drain before tearing the stream down.
    std::thread::sleep(Duration::from_millis(50));
    drop(stream);
    Ok(())
}
