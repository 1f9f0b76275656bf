//! Speech audio decoding and playback sinks.
//!
//! Synthesized speech arrives as base64 text wrapping signed 16-bit
//! little-endian PCM. [`decode_audio_data`] turns that into per-channel `f32`
//! samples in `[-1, 1)`, and an [`AudioSink`] consumes the result.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

/// Sample rate of synthesized speech.
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

const PCM16_SCALE: f32 = 32_768.0;

/// Decoded, deinterleaved audio.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    /// One sample vector per channel, all the same length.
    pub channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }
}

pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    BASE64_STANDARD
        .decode(data.trim())
        .context("audio payload is not valid base64")
}

/// Interpret `bytes` as interleaved signed 16-bit LE samples.
///
/// A trailing odd byte and any incomplete final frame are dropped.
pub fn decode_pcm16(bytes: &[u8], sample_rate: u32, num_channels: u16) -> AudioBuffer {
    let num_channels = usize::from(num_channels.max(1));
    let samples: Vec<i16> = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let frame_count = samples.len() / num_channels;

    let channels = (0..num_channels)
        .map(|channel| {
            (0..frame_count)
                .map(|i| f32::from(samples[i * num_channels + channel]) / PCM16_SCALE)
                .collect()
        })
        .collect();

    AudioBuffer {
        sample_rate,
        channels,
    }
}

/// base64 → bytes → PCM16 → normalized channels.
pub fn decode_audio_data(data: &str, sample_rate: u32, num_channels: u16) -> Result<AudioBuffer> {
    let bytes = decode_base64(data)?;
    Ok(decode_pcm16(&bytes, sample_rate, num_channels))
}

/// Destination for decoded speech. `play` resolves when playback finishes.
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn play(&self, buffer: &AudioBuffer) -> Result<()>;
}

/// Discards audio.
pub struct NullSink;

#[async_trait]
impl AudioSink for NullSink {
    async fn play(&self, _buffer: &AudioBuffer) -> Result<()> {
        Ok(())
    }
}

/// Writes each utterance to `<dir>/utterance-<uuid>.wav`.
pub struct WavFileSink {
    dir: PathBuf,
}

impl WavFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl AudioSink for WavFileSink {
    async fn play(&self, buffer: &AudioBuffer) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create voice dir: {}", self.dir.display()))?;
        let path = self
            .dir
            .join(format!("utterance-{}.wav", uuid::Uuid::now_v7()));

        let buffer = buffer.clone();
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_wav(&target, &buffer))
            .await
            .context("wav writer task failed")??;

        tracing::info!(path = %path.display(), "speech saved");
        Ok(())
    }
}

/// Write `buffer` as interleaved 16-bit PCM WAV.
pub fn write_wav(path: &Path, buffer: &AudioBuffer) -> Result<()> {
    let spec = hound::WavSpec {
        channels: u16::try_from(buffer.channel_count().max(1)).unwrap_or(1),
        sample_rate: buffer.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("failed to create wav writer: {}", path.display()))?;

    for i in 0..buffer.frames() {
        for channel in &buffer.channels {
            let v = (channel[i].clamp(-1.0, 1.0) * PCM16_SCALE)
                .round()
                .clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16;
            writer.write_sample(v).context("failed to write wav sample")?;
        }
    }
    writer.finalize().context("failed to finalize wav")?;
    Ok(())
}
