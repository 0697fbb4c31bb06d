//! Sample buffer - raw audio with sample rate and channel layout.
//!
//! This is the input type for the analysis pipeline. The buffer owns a
//! block of interleaved samples (`[L0, R0, L1, R1, …]` for stereo) and is
//! a pure data holder: the caller creates it, fills it (from its own
//! capture loop or from a WAV file), and hands it to
//! [`analyze`](crate::analyze) by reference. The engine never mutates the
//! caller's buffer; preprocessing operates on a one-time copy.
//!
//! # Sample Format
//!
//! Samples are stored as 64-bit floats. When loaded from integer WAV
//! formats they are normalized to `[-1.0, 1.0]` by dividing by
//! `2^(bits−1)`; float WAV data is loaded as-is.
//!
//! # Invariant
//!
//! `samples.len() == n_samples × n_channels` at all times. Every
//! constructor and loader enforces this; a slice whose length is not a
//! multiple of the channel count is rejected rather than truncated.

use std::path::Path;

use crate::error::{Error, Result};
use crate::options::ValidatedOptions;
use crate::track::FormantTrack;

/// Raw audio samples with sample rate and channel layout.
///
/// # Example
///
/// ```no_run
/// use formant_track::SampleBuffer;
///
/// let mut buffer = SampleBuffer::new(44_100.0, 2).unwrap();
/// buffer.load_samples(&[0.0, 0.0, 0.1, 0.1]).unwrap();
/// assert_eq!(buffer.n_samples(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    /// Sample rate in Hz.
    sample_rate: f64,
    /// Number of channels (1 = mono, 2 = stereo, …).
    n_channels: usize,
    /// Interleaved sample storage.
    samples: Vec<f64>,
}

impl SampleBuffer {
    /// Create an empty buffer with the given rate and channel count.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidBuffer`] if `sample_rate` is not positive or
    /// `n_channels` is zero.
    pub fn new(sample_rate: f64, n_channels: usize) -> Result<Self> {
        if !(sample_rate > 0.0) {
            return Err(Error::InvalidBuffer(format!(
                "sample rate {} must be positive",
                sample_rate
            )));
        }
        if n_channels == 0 {
            return Err(Error::InvalidBuffer("channel count must be at least 1".into()));
        }
        Ok(Self {
            sample_rate,
            n_channels,
            samples: Vec::new(),
        })
    }

    /// Create a mono buffer directly from a sample vector.
    pub fn from_mono(samples: Vec<f64>, sample_rate: f64) -> Self {
        Self {
            sample_rate,
            n_channels: 1,
            samples,
        }
    }

    /// Create a buffer from interleaved samples.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidBuffer`] if the slice length is not a multiple of
    /// `n_channels`, or the rate/channel parameters are invalid.
    pub fn from_interleaved(
        samples: Vec<f64>,
        sample_rate: f64,
        n_channels: usize,
    ) -> Result<Self> {
        let mut buffer = Self::new(sample_rate, n_channels)?;
        buffer.load_samples(&samples)?;
        Ok(buffer)
    }

    /// Replace the buffer contents with a new block of interleaved samples.
    ///
    /// This is the push-style entry point for capture loops: the caller
    /// refills the same buffer for each successive block.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidBuffer`] if the slice length is not a multiple of
    /// the channel count.
    pub fn load_samples(&mut self, samples: &[f64]) -> Result<()> {
        if samples.len() % self.n_channels != 0 {
            return Err(Error::InvalidBuffer(format!(
                "{} samples do not interleave into {} channels",
                samples.len(),
                self.n_channels
            )));
        }
        self.samples.clear();
        self.samples.extend_from_slice(samples);
        Ok(())
    }

    /// Load audio from a WAV file, keeping all channels interleaved.
    ///
    /// # Sample Format Handling
    ///
    /// - **Integer formats** (8, 16, 24, 32 bit): normalized to
    ///   `[-1.0, 1.0]` by dividing by `2^(bits−1)`
    /// - **Float formats**: loaded as-is
    ///
    /// # Errors
    ///
    /// [`Error::AudioRead`] if the file cannot be read or decoded.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let samples = read_samples(reader, spec)?;
        Self::from_interleaved(samples, spec.sample_rate as f64, spec.channels as usize)
    }

    /// Load a single channel from a WAV file as a mono buffer.
    ///
    /// WAV stores interleaved samples, so this takes every Nth sample
    /// starting at `channel`, where N is the file's channel count.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidBuffer`] if `channel` is out of range for the file;
    /// [`Error::AudioRead`] on decode failure.
    pub fn from_file_channel<P: AsRef<Path>>(path: P, channel: usize) -> Result<Self> {
        let reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let n_channels = spec.channels as usize;
        if channel >= n_channels {
            return Err(Error::InvalidBuffer(format!(
                "channel {} does not exist, file has {} channels",
                channel, n_channels
            )));
        }
        let interleaved = read_samples(reader, spec)?;
        let samples: Vec<f64> = interleaved
            .iter()
            .skip(channel)
            .step_by(n_channels)
            .copied()
            .collect();
        Ok(Self::from_mono(samples, spec.sample_rate as f64))
    }

    /// Sample rate in Hz.
    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Number of channels.
    #[inline]
    pub fn n_channels(&self) -> usize {
        self.n_channels
    }

    /// Number of samples per channel.
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.samples.len() / self.n_channels
    }

    /// Whether the buffer holds no samples.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    #[inline]
    pub fn duration(&self) -> f64 {
        self.n_samples() as f64 / self.sample_rate
    }

    /// The raw interleaved sample storage.
    #[inline]
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// The `index`th sample of the given channel, if in range.
    #[inline]
    pub fn sample(&self, channel: usize, index: usize) -> Option<f64> {
        if channel >= self.n_channels {
            return None;
        }
        self.samples.get(index * self.n_channels + channel).copied()
    }

    /// Mix all channels down to one signal by per-sample averaging.
    pub fn mixdown(&self) -> Vec<f64> {
        if self.n_channels == 1 {
            return self.samples.clone();
        }
        let scale = 1.0 / self.n_channels as f64;
        self.samples
            .chunks_exact(self.n_channels)
            .map(|frame| frame.iter().sum::<f64>() * scale)
            .collect()
    }

    /// Run the full formant analysis pipeline on this buffer.
    ///
    /// Convenience delegate for [`analyze`](crate::analyze).
    pub fn to_formant_track(&self, opts: &ValidatedOptions) -> Result<FormantTrack> {
        crate::track::analyze(self, opts)
    }
}

impl std::fmt::Display for SampleBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SampleBuffer({} samples, {} ch, {} Hz, {:.3}s)",
            self.n_samples(),
            self.n_channels,
            self.sample_rate,
            self.duration()
        )
    }
}

/// Decode all samples from an open WAV reader, normalizing integer formats.
fn read_samples<R: std::io::Read>(
    reader: hound::WavReader<R>,
    spec: hound::WavSpec,
) -> Result<Vec<f64>> {
    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map(|v| v as f64))
            .collect::<std::result::Result<Vec<f64>, _>>()?,
        hound::SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            let max_val = (1i64 << (bits - 1)) as f64;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f64 / max_val))
                .collect::<std::result::Result<Vec<f64>, _>>()?
        }
    };
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaved_storage_invariant() {
        let buffer = SampleBuffer::from_interleaved(vec![1.0, -1.0, 2.0, -2.0], 8000.0, 2).unwrap();
        assert_eq!(buffer.n_samples(), 2);
        assert_eq!(buffer.sample(0, 1), Some(2.0));
        assert_eq!(buffer.sample(1, 1), Some(-2.0));
        assert_eq!(buffer.sample(2, 0), None);
        assert_eq!(buffer.sample(0, 2), None);
    }

    #[test]
    fn rejects_ragged_interleaving() {
        let result = SampleBuffer::from_interleaved(vec![1.0, 2.0, 3.0], 8000.0, 2);
        assert!(matches!(result, Err(Error::InvalidBuffer(_))));
    }

    #[test]
    fn rejects_zero_channels() {
        assert!(matches!(
            SampleBuffer::new(8000.0, 0),
            Err(Error::InvalidBuffer(_))
        ));
    }

    #[test]
    fn load_replaces_contents() {
        let mut buffer = SampleBuffer::new(8000.0, 1).unwrap();
        buffer.load_samples(&[1.0, 2.0]).unwrap();
        buffer.load_samples(&[3.0]).unwrap();
        assert_eq!(buffer.samples(), &[3.0]);
    }

    #[test]
    fn mixdown_averages_channels() {
        let buffer = SampleBuffer::from_interleaved(vec![1.0, 3.0, -1.0, 1.0], 8000.0, 2).unwrap();
        assert_eq!(buffer.mixdown(), vec![2.0, 0.0]);
    }

    #[test]
    fn mono_mixdown_is_identity() {
        let buffer = SampleBuffer::from_mono(vec![0.5, -0.5], 8000.0);
        assert_eq!(buffer.mixdown(), vec![0.5, -0.5]);
    }
}
