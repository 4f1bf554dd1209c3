//! WAV reading, writing, and sample utilities.

use crate::audio::source::FrameSource;
use crate::error::{HearkenError, Result};
use std::io::Read;
use std::path::Path;

/// Fraction of full scale that peak normalization aims for.
const NORMALIZE_TARGET: f32 = 0.8;

/// Simple linear interpolation resampling.
pub fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = source_pos.floor() as usize;
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[source_idx]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as i16
            }
        })
        .collect()
}

/// Scale a buffer so its peak sits at 80% of full scale.
///
/// Silent buffers (all zeros) are returned unchanged. Quiet recordings get
/// louder, clipped-hot recordings get pulled back; either way the transcriber
/// sees a consistent level.
pub fn normalize_peak(samples: &[i16]) -> Vec<i16> {
    let peak = samples.iter().map(|&s| (s as i32).abs()).max().unwrap_or(0);
    if peak == 0 {
        return samples.to_vec();
    }

    let target = i16::MAX as f32 * NORMALIZE_TARGET;
    let gain = target / peak as f32;

    samples
        .iter()
        .map(|&s| {
            let scaled = s as f32 * gain;
            scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16
        })
        .collect()
}

/// Write mono 16-bit PCM to a WAV file.
pub fn write_wav(path: &Path, samples: &[i16], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec).map_err(|e| HearkenError::Io(
        std::io::Error::other(format!("Failed to create WAV file: {}", e)),
    ))?;

    for &sample in samples {
        writer
            .write_sample(sample)
            .map_err(|e| HearkenError::Io(std::io::Error::other(format!(
                "Failed to write WAV sample: {}",
                e
            ))))?;
    }

    writer.finalize().map_err(|e| {
        HearkenError::Io(std::io::Error::other(format!(
            "Failed to finalize WAV file: {}",
            e
        )))
    })?;

    Ok(())
}

/// Read a WAV file as mono 16-bit PCM, returning the samples and their rate.
/// Stereo input is downmixed by averaging channels.
pub fn read_wav(path: &Path) -> Result<(Vec<i16>, u32)> {
    let reader = hound::WavReader::open(path).map_err(|e| HearkenError::AudioPlayback {
        message: format!("Failed to open WAV file: {}", e),
    })?;
    read_wav_samples(reader)
}

fn read_wav_samples<R: Read>(mut reader: hound::WavReader<R>) -> Result<(Vec<i16>, u32)> {
    let spec = reader.spec();
    let source_rate = spec.sample_rate;
    let source_channels = spec.channels;

    let raw_samples: Vec<i16> = reader
        .samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| HearkenError::AudioCapture {
            message: format!("Failed to read WAV samples: {}", e),
        })?;

    let mono_samples = if source_channels == 2 {
        raw_samples
            .chunks_exact(2)
            .map(|chunk| {
                let left = chunk[0] as i32;
                let right = chunk[1] as i32;
                ((left + right) / 2) as i16
            })
            .collect()
    } else {
        raw_samples
    };

    Ok((mono_samples, source_rate))
}

/// Frame source that reads from WAV data.
///
/// Supports arbitrary sample rates and channels, resampling to the target
/// rate. Once the file is exhausted it serves silent frames so the pipeline
/// sees an endless quiet room rather than an error.
pub struct WavFrameSource {
    samples: Vec<i16>,
    position: usize,
    sample_rate: u32,
    frame_length: usize,
}

impl WavFrameSource {
    /// Create from any reader.
    pub fn from_reader(
        reader: Box<dyn Read + Send>,
        target_rate: u32,
        frame_length: usize,
    ) -> Result<Self> {
        let wav_reader = hound::WavReader::new(reader).map_err(|e| HearkenError::AudioCapture {
            message: format!("Failed to parse WAV file: {}", e),
        })?;

        let (mono_samples, source_rate) = read_wav_samples(wav_reader)?;

        let samples = if source_rate != target_rate {
            resample(&mono_samples, source_rate, target_rate)
        } else {
            mono_samples
        };

        Ok(Self {
            samples,
            position: 0,
            sample_rate: target_rate,
            frame_length,
        })
    }

    /// Create from a file on disk.
    pub fn from_path(path: &Path, target_rate: u32, frame_length: usize) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(Box::new(file), target_rate, frame_length)
    }

    /// True once all file content has been served.
    pub fn is_exhausted(&self) -> bool {
        self.position >= self.samples.len()
    }
}

impl FrameSource for WavFrameSource {
    fn open(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Vec<i16>> {
        if self.is_exhausted() {
            return Ok(vec![0; self.frame_length]);
        }

        let end = std::cmp::min(self.position + self.frame_length, self.samples.len());
        let mut frame = self.samples[self.position..end].to_vec();
        self.position = end;
        frame.resize(self.frame_length, 0);

        Ok(frame)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn frame_length(&self) -> usize {
        self.frame_length
    }
}
