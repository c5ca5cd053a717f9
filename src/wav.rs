//! WAV serialization: freeze finite streams to disk and load files back.
//!
//! The on-disk format for [`save`] is 16-bit signed PCM with peak amplitude
//! 1.0 mapping to 32767 (values outside ±1.0 are clamped). Channel count
//! comes from the stream's sample type ([`Channels`]): `f64` writes mono,
//! [`Frame<N>`](crate::audio::Frame) writes `N` channels.

use crate::stream::{from_vec, Step, Stream};
use crate::traits::Channels;
use std::path::Path;
use thiserror::Error;

/// Convenience alias for WAV results.
pub type WavResult<T> = Result<T, WavError>;

/// WAV-specific error types.
#[derive(Debug, Error)]
pub enum WavError {
    /// Container-level read/write failure.
    #[error(transparent)]
    Codec(#[from] hound::Error),

    /// A load was asked for a channel layout the file does not have.
    #[error("channel mismatch: file has {actual} channels, requested {requested}")]
    ChannelMismatch {
        /// Channels present in the file.
        actual: usize,
        /// Channels the caller asked for.
        requested: usize,
    },
}

/// Render a finite stream to a 16-bit PCM WAV file.
///
/// Consumes one full traversal. Never returns on an unbounded stream;
/// slice first.
pub fn save<T, R>(stream: &Stream<T, R>, path: impl AsRef<Path>, sample_rate: u32) -> WavResult<()>
where
    T: Channels,
    R: Send + 'static,
{
    let spec = hound::WavSpec {
        channels: T::COUNT as u16,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    let mut traversal = stream.activate();
    loop {
        match traversal.step() {
            Step::Value(value) => {
                for channel in 0..T::COUNT {
                    let sample = value.channel(channel).clamp(-1.0, 1.0);
                    writer.write_sample((sample * 32767.0) as i16)?;
                }
            }
            Step::Done(_) => break,
        }
    }
    writer.finalize()?;
    Ok(())
}

/// A decoded WAV file: interleaved samples normalized to ±1.0.
#[derive(Debug, Clone)]
pub struct LoadedWav {
    /// Sample rate the file was recorded at.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: usize,
    /// Interleaved samples, `channels` per frame.
    pub samples: Vec<f64>,
}

impl LoadedWav {
    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }

    /// A mono stream: multi-channel files are averaged down.
    pub fn into_mono(self) -> Stream<f64> {
        let channels = self.channels.max(1);
        let frames: Vec<f64> = self
            .samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f64>() / channels as f64)
            .collect();
        from_vec(frames)
    }

    /// A frame stream with the file's exact channel layout.
    pub fn into_frames<const N: usize>(self) -> WavResult<Stream<crate::audio::Frame<N>>> {
        if self.channels != N {
            return Err(WavError::ChannelMismatch {
                actual: self.channels,
                requested: N,
            });
        }
        let frames: Vec<crate::audio::Frame<N>> = self
            .samples
            .chunks_exact(N)
            .map(|frame| {
                let mut out = [0.0; N];
                out.copy_from_slice(frame);
                crate::audio::Frame(out)
            })
            .collect();
        Ok(from_vec(frames))
    }
}

/// Load a WAV file (8/16/24/32-bit integer or float PCM).
pub fn load(path: impl AsRef<Path>) -> WavResult<LoadedWav> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let samples: Vec<f64> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let full_scale = (1_i64 << (spec.bits_per_sample - 1)) as f64;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f64 / full_scale))
                .collect::<Result<_, _>>()?
        }
    };
    Ok(LoadedWav {
        sample_rate: spec.sample_rate,
        channels: spec.channels as usize,
        samples,
    })
}
