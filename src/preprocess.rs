//! Preprocessing - downsampling and preemphasis.
//!
//! The preprocessor turns the caller's buffer into the mono signal the
//! rest of the pipeline analyzes:
//!
//! 1. Mix all channels down to one signal (per-sample average).
//! 2. Resample to the analysis rate. FFT-based sinc resampling via
//!    `rubato` keeps aliasing out of the formant band; a linear
//!    interpolator stands in if the resampler cannot be constructed for
//!    the requested rates.
//! 3. Apply first-order preemphasis `y[i] = x[i] − α·x[i−1]`, `y[0] = x[0]`,
//!    compensating for the spectral tilt of voiced speech.
//!
//! The transform consumes its input and returns a new owned buffer, so
//! the caller's original data is never aliased or mutated. It is
//! deterministic and carries no state across calls.

use rubato::{FftFixedIn, Resampler};

use crate::buffer::SampleBuffer;
use crate::error::{Error, Result};
use crate::options::ValidatedOptions;

/// Downsample and preemphasize a buffer for analysis.
///
/// Returns a mono buffer at `opts.downsample_rate()`.
///
/// # Errors
///
/// [`Error::InvalidBuffer`] if the buffer's sample rate is below the
/// requested analysis rate (upsampling would fabricate bandwidth the
/// signal does not have).
pub fn preprocess(buffer: SampleBuffer, opts: &ValidatedOptions) -> Result<SampleBuffer> {
    let source_rate = buffer.sample_rate();
    let target_rate = opts.downsample_rate();
    if source_rate < target_rate {
        return Err(Error::InvalidBuffer(format!(
            "sample rate {} Hz below analysis rate {} Hz",
            source_rate, target_rate
        )));
    }

    let mono = buffer.mixdown();
    let mut samples = if (source_rate - target_rate).abs() < 1e-6 {
        mono
    } else {
        resample(&mono, source_rate, target_rate)
    };
    preemphasize(&mut samples, opts.pre_emph_factor());

    Ok(SampleBuffer::from_mono(samples, target_rate))
}

/// In-place preemphasis `y[i] = x[i] − α·x[i−1]`, keeping `y[0] = x[0]`.
///
/// The recursion is exactly invertible: `x[i] = y[i] + α·x[i−1]`.
fn preemphasize(samples: &mut [f64], alpha: f64) {
    if alpha == 0.0 {
        return;
    }
    let mut prev = 0.0;
    for sample in samples.iter_mut() {
        let current = *sample;
        *sample = current - alpha * prev;
        prev = current;
    }
}

/// Resample a mono signal from `old_rate` to `new_rate`.
fn resample(samples: &[f64], old_rate: f64, new_rate: f64) -> Vec<f64> {
    let ratio = new_rate / old_rate;
    let new_length = (samples.len() as f64 * ratio).round() as usize;
    if new_length == 0 || samples.is_empty() {
        return Vec::new();
    }

    let chunk_size = 1024.min(samples.len());
    let mut resampler =
        match FftFixedIn::<f64>::new(old_rate as usize, new_rate as usize, chunk_size, 2, 1) {
            Ok(r) => r,
            Err(_) => return linear_resample(samples, new_length),
        };

    let mut output = Vec::with_capacity(new_length);
    let mut pos = 0;
    while pos < samples.len() {
        let end = (pos + chunk_size).min(samples.len());
        let mut chunk = samples[pos..end].to_vec();
        chunk.resize(chunk_size, 0.0);

        let input = vec![chunk];
        match resampler.process(&input, None) {
            Ok(result) => {
                if !result.is_empty() {
                    output.extend(&result[0]);
                }
            }
            Err(_) => break,
        }
        pos += chunk_size;
    }

    output.truncate(new_length);
    output
}

/// Linear-interpolation fallback resampler.
fn linear_resample(samples: &[f64], new_length: usize) -> Vec<f64> {
    if samples.is_empty() || new_length == 0 {
        return Vec::new();
    }
    let ratio = (samples.len() - 1) as f64 / (new_length - 1).max(1) as f64;
    (0..new_length)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = pos.floor() as usize;
            let frac = pos - idx as f64;
            if idx + 1 >= samples.len() {
                samples[samples.len() - 1]
            } else {
                samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::AnalysisOptions;

    fn opts_at(rate: f64) -> ValidatedOptions {
        AnalysisOptions {
            downsample_rate: rate,
            ..AnalysisOptions::default()
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn preemphasis_is_invertible() {
        let original: Vec<f64> = (0..200)
            .map(|i| (2.0 * std::f64::consts::PI * 0.031 * i as f64).sin())
            .collect();
        let mut filtered = original.clone();
        preemphasize(&mut filtered, 0.7);

        let mut reconstructed = vec![0.0; filtered.len()];
        let mut prev = 0.0;
        for (i, &y) in filtered.iter().enumerate() {
            let x = y + 0.7 * prev;
            reconstructed[i] = x;
            prev = x;
        }
        for (a, b) in original.iter().zip(reconstructed.iter()) {
            assert!((a - b).abs() < 1e-10);
        }
    }

    #[test]
    fn zero_factor_leaves_signal_unchanged() {
        let mut samples = vec![0.5, -0.25, 0.125];
        preemphasize(&mut samples, 0.0);
        assert_eq!(samples, vec![0.5, -0.25, 0.125]);
    }

    #[test]
    fn same_rate_skips_resampling() {
        let buffer = SampleBuffer::from_mono(vec![0.1; 500], 10_000.0);
        let processed = preprocess(buffer, &opts_at(10_000.0)).unwrap();
        assert_eq!(processed.n_samples(), 500);
        assert_eq!(processed.sample_rate(), 10_000.0);
    }

    #[test]
    fn downsampling_halves_length() {
        let buffer = SampleBuffer::from_mono(vec![0.0; 16_000], 16_000.0);
        let processed = preprocess(buffer, &opts_at(8_000.0)).unwrap();
        assert_eq!(processed.n_samples(), 8_000);
    }

    #[test]
    fn rejects_source_below_analysis_rate() {
        let buffer = SampleBuffer::from_mono(vec![0.0; 100], 8_000.0);
        let result = preprocess(buffer, &opts_at(10_000.0));
        assert!(matches!(result, Err(Error::InvalidBuffer(_))));
    }

    #[test]
    fn stereo_input_becomes_mono() {
        let buffer =
            SampleBuffer::from_interleaved(vec![0.2, 0.4, 0.2, 0.4], 10_000.0, 2).unwrap();
        let processed = preprocess(buffer, &opts_at(10_000.0)).unwrap();
        assert_eq!(processed.n_channels(), 1);
        // First mixed sample survives preemphasis untouched.
        assert!((processed.samples()[0] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn linear_fallback_preserves_endpoints() {
        let samples = vec![0.0, 1.0, 2.0, 3.0];
        let out = linear_resample(&samples, 7);
        assert!((out[0] - 0.0).abs() < 1e-12);
        assert!((out[6] - 3.0).abs() < 1e-12);
    }
}
