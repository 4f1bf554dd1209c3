//! Microphone capture using CPAL (Cross-Platform Audio Library).

use crate::audio::source::FrameSource;
use crate::error::{HearkenError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// This suppresses noisy ALSA/JACK/PipeWire messages that CPAL triggers
/// when probing audio backends. The messages are harmless but confusing to users.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2 (stderr).
/// Safe as long as no other thread is concurrently manipulating fd 2.
fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// Suppress noisy JACK/ALSA error messages that occur during audio backend probing.
/// These are harmless but confusing to users.
///
/// # Safety
/// This modifies environment variables which is safe when called before spawning threads.
pub fn suppress_audio_warnings() {
    // SAFETY: Called at startup before any threads are spawned
    unsafe {
        // Suppress JACK "cannot connect" messages - don't try to start JACK server
        std::env::set_var("JACK_NO_START_SERVER", "1");
        // Disable JACK completely for CPAL probing
        std::env::set_var("JACK_NO_AUDIO_RESERVATION", "1");
        // Force PipeWire to not print debug messages
        std::env::set_var("PIPEWIRE_DEBUG", "0");
        // Suppress ALSA verbose messages
        std::env::set_var("ALSA_DEBUG", "0");
        // Tell PipeWire's JACK to be quiet
        std::env::set_var("PW_LOG", "0");
    }
}

/// Preferred device names for GNOME/PipeWire environments.
const PREFERRED_DEVICES: &[&str] = &["pipewire", "pulse", "PulseAudio"];

/// Device name patterns to filter out (not useful for voice input).
const FILTERED_PATTERNS: &[&str] = &[
    "surround",
    "front:",
    "rear:",
    "center:",
    "side:",
    "Digital Output",
    "HDMI",
    "S/PDIF",
];

/// Registry of device names currently held open by a `CpalFrameSource`.
/// A second open of the same device fails with `AudioDeviceBusy` instead of
/// silently splitting the stream.
static CLAIMED_DEVICES: Mutex<Option<HashSet<String>>> = Mutex::new(None);

fn claim_device(name: &str) -> Result<()> {
    let mut claimed = CLAIMED_DEVICES
        .lock()
        .map_err(|e| HearkenError::AudioCapture {
            message: format!("Failed to lock device registry: {}", e),
        })?;
    let set = claimed.get_or_insert_with(HashSet::new);
    if !set.insert(name.to_string()) {
        return Err(HearkenError::AudioDeviceBusy {
            device: name.to_string(),
        });
    }
    Ok(())
}

fn release_device(name: &str) {
    if let Ok(mut claimed) = CLAIMED_DEVICES.lock()
        && let Some(set) = claimed.as_mut()
    {
        set.remove(name);
    }
}

/// Check if a device name should be filtered out.
fn should_filter_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    FILTERED_PATTERNS
        .iter()
        .any(|pattern| lower.contains(&pattern.to_lowercase()))
}

/// Check if a device is a preferred device.
fn is_preferred_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    PREFERRED_DEVICES
        .iter()
        .any(|pref| lower.contains(&pref.to_lowercase()))
}

/// List all available audio input devices with filtering and recommendations.
///
/// # Returns
/// A vector of device names, with preferred devices marked with "\[recommended\]".
/// Filters out obviously unusable devices (surround channels, HDMI, etc.).
///
/// # Errors
/// Returns `HearkenError::AudioCapture` if device enumeration fails.
pub fn list_devices() -> Result<Vec<String>> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();
        let devices = host.input_devices().map_err(|e| HearkenError::AudioCapture {
            message: format!("Failed to enumerate input devices: {}", e),
        })?;

        let mut device_names = Vec::new();
        for device in devices {
            if let Ok(name) = device.name() {
                if should_filter_device(&name) {
                    continue;
                }

                if is_preferred_device(&name) {
                    device_names.push(format!("{} [recommended]", name));
                } else {
                    device_names.push(name);
                }
            }
        }

        Ok(device_names)
    })
}

/// Get the best default input device, preferring PipeWire/PulseAudio.
///
/// Tries in order:
/// 1. PipeWire
/// 2. PulseAudio/Pulse
/// 3. System default
///
/// This ensures we respect the desktop's audio device selection.
fn get_best_default_device() -> Result<cpal::Device> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();

        if let Ok(devices) = host.input_devices() {
            for device in devices {
                if let Ok(name) = device.name()
                    && is_preferred_device(&name)
                {
                    return Ok(device);
                }
            }
        }

        host.default_input_device()
            .ok_or_else(|| HearkenError::AudioDeviceNotFound {
                device: "default".to_string(),
            })
    })
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: We ensure that the stream is only accessed from a single thread at
/// a time through its owning `CpalFrameSource`. The stream methods are called
/// synchronously and don't cross thread boundaries unsafely.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Microphone frame source backed by CPAL.
///
/// Captures 16-bit PCM mono at the configured rate and hands it out as
/// fixed-size frames. The CPAL callback pushes chunks into a bounded channel;
/// `read_frame` drains the channel and reassembles frames. If the consumer
/// falls behind and the channel fills, the callback drops the chunk and raises
/// an overflow flag so the next read can report the gap.
pub struct CpalFrameSource {
    device: cpal::Device,
    device_name: String,
    stream: Option<SendableStream>,
    chunk_rx: crossbeam_channel::Receiver<Vec<i16>>,
    chunk_tx: crossbeam_channel::Sender<Vec<i16>>,
    pending: Vec<i16>,
    overflowed: Arc<AtomicBool>,
    callback_count: Arc<AtomicU64>,
    sample_rate: u32,
    frame_length: usize,
}

impl CpalFrameSource {
    /// Create a new CPAL frame source.
    ///
    /// # Arguments
    /// * `device_name` - Optional device name. If None, uses the best default.
    /// * `sample_rate` - Target sample rate in Hz.
    /// * `frame_length` - Samples per frame.
    ///
    /// # Errors
    /// Returns `AudioDeviceNotFound` if the named device does not exist.
    pub fn new(device_name: Option<&str>, sample_rate: u32, frame_length: usize) -> Result<Self> {
        let device = with_suppressed_stderr(|| {
            let host = cpal::default_host();

            if let Some(name) = device_name {
                let devices = host
                    .input_devices()
                    .map_err(|e| HearkenError::AudioCapture {
                        message: format!("Failed to enumerate devices: {}", e),
                    })?;

                let mut found_device = None;
                for dev in devices {
                    if let Ok(dev_name) = dev.name()
                        && dev_name == name
                    {
                        found_device = Some(dev);
                        break;
                    }
                }

                found_device.ok_or_else(|| HearkenError::AudioDeviceNotFound {
                    device: name.to_string(),
                })
            } else {
                get_best_default_device()
            }
        })?;

        let resolved_name = device
            .name()
            .unwrap_or_else(|_| device_name.unwrap_or("default").to_string());

        // Roughly one second of audio in callback-sized chunks.
        let (chunk_tx, chunk_rx) = crossbeam_channel::bounded(64);

        Ok(Self {
            device,
            device_name: resolved_name,
            stream: None,
            chunk_rx,
            chunk_tx,
            pending: Vec::new(),
            overflowed: Arc::new(AtomicBool::new(false)),
            callback_count: Arc::new(AtomicU64::new(0)),
            sample_rate,
            frame_length,
        })
    }

    /// Name of the resolved input device.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    fn push_chunk(
        tx: &crossbeam_channel::Sender<Vec<i16>>,
        overflowed: &Arc<AtomicBool>,
        chunk: Vec<i16>,
    ) {
        if tx.try_send(chunk).is_err() {
            overflowed.store(true, Ordering::Relaxed);
        }
    }

    /// Build the audio stream with the configured format.
    ///
    /// Tries in order:
    /// 1. i16 mono at the target rate — preferred, zero-copy path
    /// 2. f32 mono at the target rate — for devices that only expose float formats
    /// 3. Device default config — native rate/channels with software conversion
    ///
    /// Step 3 handles PipeWire setups where the ALSA compatibility layer accepts
    /// non-native configs but never fires the data callback.
    fn build_stream(&self) -> Result<cpal::Stream> {
        let preferred_config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let err_callback = |err| {
            tracing::warn!("audio stream error: {}", err);
        };

        // Try i16 mono — works with PipeWire/PulseAudio which convert transparently
        let tx = self.chunk_tx.clone();
        let overflowed = Arc::clone(&self.overflowed);
        let counter = Arc::clone(&self.callback_count);
        if let Ok(stream) = self.device.build_input_stream(
            &preferred_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                counter.fetch_add(1, Ordering::Relaxed);
                Self::push_chunk(&tx, &overflowed, data.to_vec());
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        // Try f32 mono — for devices that only expose float formats
        let tx = self.chunk_tx.clone();
        let overflowed = Arc::clone(&self.overflowed);
        let counter = Arc::clone(&self.callback_count);
        if let Ok(stream) = self.device.build_input_stream(
            &preferred_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                counter.fetch_add(1, Ordering::Relaxed);
                let converted: Vec<i16> = data
                    .iter()
                    .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                    .collect();
                Self::push_chunk(&tx, &overflowed, converted);
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        // Fallback: capture at device's native config, convert in software.
        self.build_stream_native()
    }

    /// Build a stream using the device's default/native config, with software
    /// channel mixing (stereo to mono) and resampling to the target rate.
    fn build_stream_native(&self) -> Result<cpal::Stream> {
        use cpal::SampleFormat;

        let default_config =
            self.device
                .default_input_config()
                .map_err(|e| HearkenError::AudioCapture {
                    message: format!("Failed to query default input config: {}", e),
                })?;

        let native_rate = default_config.sample_rate().0;
        let native_channels = default_config.channels() as usize;
        let target_rate = self.sample_rate;

        let stream_config: cpal::StreamConfig = default_config.clone().into();

        tracing::info!(
            "using native audio format ({}ch/{}Hz/{:?}), converting in software",
            native_channels,
            native_rate,
            default_config.sample_format(),
        );

        let err_callback = |err| {
            tracing::warn!("audio stream error: {}", err);
        };

        let tx = self.chunk_tx.clone();
        let overflowed = Arc::clone(&self.overflowed);
        let counter = Arc::clone(&self.callback_count);

        match default_config.sample_format() {
            SampleFormat::I16 => self
                .device
                .build_input_stream(
                    &stream_config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        counter.fetch_add(1, Ordering::Relaxed);
                        let converted =
                            convert_to_mono_i16(data, native_channels, native_rate, target_rate);
                        Self::push_chunk(&tx, &overflowed, converted);
                    },
                    err_callback,
                    None,
                )
                .map_err(|e| HearkenError::AudioCapture {
                    message: format!("Failed to build native i16 stream: {}", e),
                }),
            SampleFormat::F32 => self
                .device
                .build_input_stream(
                    &stream_config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        counter.fetch_add(1, Ordering::Relaxed);
                        let i16_data: Vec<i16> = data
                            .iter()
                            .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                            .collect();
                        let converted = convert_to_mono_i16(
                            &i16_data,
                            native_channels,
                            native_rate,
                            target_rate,
                        );
                        Self::push_chunk(&tx, &overflowed, converted);
                    },
                    err_callback,
                    None,
                )
                .map_err(|e| HearkenError::AudioCapture {
                    message: format!("Failed to build native f32 stream: {}", e),
                }),
            fmt => Err(HearkenError::AudioCapture {
                message: format!(
                    "Unsupported native sample format: {:?}. \
                     Try specifying a device with --device.",
                    fmt
                ),
            }),
        }
    }

    fn drain_channel(&mut self) {
        while self.chunk_rx.try_recv().is_ok() {}
        self.pending.clear();
        self.overflowed.store(false, Ordering::Relaxed);
    }
}

/// Mix multi-channel audio to mono and resample to the target rate.
fn convert_to_mono_i16(
    samples: &[i16],
    channels: usize,
    source_rate: u32,
    target_rate: u32,
) -> Vec<i16> {
    let mono: Vec<i16> = if channels == 1 {
        samples.to_vec()
    } else {
        samples
            .chunks_exact(channels)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / channels as i32) as i16
            })
            .collect()
    };

    if source_rate == target_rate {
        mono
    } else {
        crate::audio::wav::resample(&mono, source_rate, target_rate)
    }
}

impl FrameSource for CpalFrameSource {
    fn open(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(()); // Already open
        }

        claim_device(&self.device_name)?;

        let opened = (|| {
            self.callback_count.store(0, Ordering::Relaxed);
            let stream = self.build_stream()?;
            stream.play().map_err(|e| HearkenError::AudioCapture {
                message: format!("Failed to start audio stream: {}", e),
            })?;

            // Wait briefly to check if the CPAL callback actually fires.
            // Some PipeWire-ALSA setups accept non-native configs but never
            // deliver data.
            std::thread::sleep(Duration::from_millis(200));

            if self.callback_count.load(Ordering::Relaxed) == 0 {
                drop(stream);
                self.drain_channel();

                let native_stream = self.build_stream_native()?;
                native_stream
                    .play()
                    .map_err(|e| HearkenError::AudioCapture {
                        message: format!("Failed to start native audio stream: {}", e),
                    })?;
                Ok(native_stream)
            } else {
                Ok(stream)
            }
        })();

        match opened {
            Ok(stream) => {
                self.stream = Some(SendableStream(stream));
                tracing::debug!(device = %self.device_name, "audio capture opened");
                Ok(())
            }
            Err(e) => {
                release_device(&self.device_name);
                Err(e)
            }
        }
    }

    fn read_frame(&mut self) -> Result<Vec<i16>> {
        if self.stream.is_none() {
            return Err(HearkenError::AudioCapture {
                message: "read_frame on a closed source".to_string(),
            });
        }

        if self.overflowed.swap(false, Ordering::Relaxed) {
            tracing::warn!(device = %self.device_name, "audio buffer overflow, dropped samples");
        }

        while self.pending.len() < self.frame_length {
            match self.chunk_rx.recv_timeout(Duration::from_millis(500)) {
                Ok(chunk) => self.pending.extend_from_slice(&chunk),
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                    return Err(HearkenError::AudioCapture {
                        message: format!("audio stream stalled on '{}'", self.device_name),
                    });
                }
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                    return Err(HearkenError::AudioCapture {
                        message: "audio stream disconnected".to_string(),
                    });
                }
            }
        }

        let rest = self.pending.split_off(self.frame_length);
        let frame = std::mem::replace(&mut self.pending, rest);
        Ok(frame)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(sendable_stream) = self.stream.take() {
            if let Err(e) = sendable_stream.0.pause() {
                tracing::warn!("failed to pause audio stream: {}", e);
            }
            drop(sendable_stream);
            self.drain_channel();
            release_device(&self.device_name);
            tracing::debug!(device = %self.device_name, "audio capture closed");
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

impl Drop for CpalFrameSource {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults;

    #[test]
    fn test_should_filter_device() {
        assert!(should_filter_device("surround51"));
        assert!(should_filter_device("front:CARD=PCH"));
        assert!(should_filter_device("HDMI Output"));
        assert!(should_filter_device("Digital Output S/PDIF"));
        assert!(!should_filter_device("pipewire"));
        assert!(!should_filter_device("PulseAudio"));
        assert!(!should_filter_device("Built-in Audio"));
    }

    #[test]
    fn test_is_preferred_device() {
        assert!(is_preferred_device("pipewire"));
        assert!(is_preferred_device("PipeWire"));
        assert!(is_preferred_device("pulse"));
        assert!(is_preferred_device("PulseAudio"));
        assert!(!is_preferred_device("hw:0,0"));
        assert!(!is_preferred_device("default"));
    }

    #[test]
    fn test_claim_registry_rejects_double_claim() {
        claim_device("test-claim-device").unwrap();

        let second = claim_device("test-claim-device");
        assert!(matches!(
            second,
            Err(HearkenError::AudioDeviceBusy { device }) if device == "test-claim-device"
        ));

        release_device("test-claim-device");
        assert!(claim_device("test-claim-device").is_ok());
        release_device("test-claim-device");
    }

    #[test]
    fn test_release_unclaimed_device_is_harmless() {
        release_device("never-claimed-device");
    }

    #[test]
    fn test_convert_stereo_to_mono() {
        let stereo = vec![100i16, 200, 300, 400];
        let mono = convert_to_mono_i16(&stereo, 2, 16000, 16000);
        assert_eq!(mono, vec![150, 350]);
    }

    #[test]
    fn test_convert_mono_passthrough() {
        let samples = vec![1i16, 2, 3];
        let mono = convert_to_mono_i16(&samples, 1, 16000, 16000);
        assert_eq!(mono, samples);
    }

    #[test]
    fn test_convert_resamples_when_rates_differ() {
        let samples = vec![1000i16; 48000];
        let converted = convert_to_mono_i16(&samples, 1, 48000, 16000);
        assert!(converted.len() >= 15900 && converted.len() <= 16100);
    }

    #[test]
    fn test_create_with_invalid_device_name() {
        let source = CpalFrameSource::new(
            Some("NonExistentDevice12345"),
            defaults::SAMPLE_RATE,
            defaults::FRAME_LENGTH,
        );
        assert!(source.is_err());
        match source {
            Err(HearkenError::AudioDeviceNotFound { device }) => {
                assert_eq!(device, "NonExistentDevice12345");
            }
            _ => panic!("Expected AudioDeviceNotFound error"),
        }
    }

    #[test]
    #[ignore] // Requires audio hardware
    fn test_list_devices_returns_at_least_one_device() {
        let devices = list_devices();
        assert!(devices.is_ok());
        assert!(!devices.unwrap().is_empty());
    }

    #[test]
    #[ignore] // Requires audio hardware
    fn test_open_read_close_cycle() {
        let mut source =
            CpalFrameSource::new(None, defaults::SAMPLE_RATE, defaults::FRAME_LENGTH).unwrap();

        source.open().unwrap();
        let frame = source.read_frame().unwrap();
        assert_eq!(frame.len(), defaults::FRAME_LENGTH);
        source.close().unwrap();

        // Reading a closed source is an error
        assert!(source.read_frame().is_err());
    }

    #[test]
    #[ignore] // Requires audio hardware
    fn test_close_is_idempotent() {
        let mut source =
            CpalFrameSource::new(None, defaults::SAMPLE_RATE, defaults::FRAME_LENGTH).unwrap();

        source.open().unwrap();
        source.close().unwrap();
        source.close().unwrap();
    }
}
