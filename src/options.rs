//! Analysis options and their validation.
//!
//! Every pipeline run is parameterized by an [`AnalysisOptions`] value.
//! Before any frame is processed the options must pass through
//! [`AnalysisOptions::validate`], which normalizes the time-domain
//! parameters into sample counts at the analysis rate and rejects any
//! inconsistent combination. Validation fails closed: an out-of-range
//! combination is reported as [`Error::InvalidOptions`], never silently
//! clamped.
//!
//! The defaults match the values the original real-time visualizer passed
//! in: four formants at a 10 kHz analysis rate, a 49 ms rectangular window
//! advancing 10 ms per frame, and an order-12 autocorrelation LPC fit.

use crate::error::{Error, Result};

/// Window function applied to each analysis frame.
///
/// A closed set: the framer dispatches over exactly these four shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    /// No weighting; samples pass through unchanged.
    Rectangular,
    /// `w[n] = 0.54 − 0.46·cos(2πn/(N−1))`. Sidelobes at −53 dB.
    Hamming,
    /// Half-cosine taper `w[n] = sin(πn/(N−1))`.
    Cosine,
    /// `w[n] = 0.5 − 0.5·cos(2πn/(N−1))`. Also known as Hann.
    Hanning,
}

/// LPC estimation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpcKind {
    /// Autocorrelation method solved with the Levinson–Durbin recursion.
    ///
    /// Numerically robust; the resulting predictor is minimum-phase, so
    /// every pole maps to a positive bandwidth.
    Autocorrelation,
    /// Covariance-style method with a raised-cosine weighting of the
    /// prediction-error terms, historically used for voiced-frame
    /// refinement. The exact historical weighting is not published, so
    /// this is a best-effort rendition of the method class.
    Bsa,
    /// Covariance method: unweighted least squares over the frame without
    /// the autocorrelation windowing assumption.
    ///
    /// More accurate on short or noisy frames, but the predictor carries
    /// no stability guarantee; poles outside the unit circle are culled
    /// later by the bandwidth filter.
    Covariance,
}

/// Parameters for a formant analysis run.
///
/// Construct with struct literal syntax or start from [`Default`] and
/// adjust fields, then call [`validate`](Self::validate) to obtain the
/// [`ValidatedOptions`] the pipeline consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOptions {
    /// Number of formants to track (≥ 1).
    pub n_formants: usize,
    /// Sample rate to downsample to before analysis, in Hz.
    pub downsample_rate: f64,
    /// Preemphasis factor α in `y[i] = x[i] − α·x[i−1]`, in `[0, 1)`.
    pub pre_emph_factor: f64,
    /// Window function applied to each frame.
    pub window_kind: WindowKind,
    /// Duration of the analysis window in seconds.
    pub window_dur: f64,
    /// Frame advance in seconds. Frames overlap whenever this is smaller
    /// than `window_dur`.
    pub frame_dur: f64,
    /// LPC estimation method.
    pub lpc_kind: LpcKind,
    /// Predictor order; must be at least `2 × n_formants` since each
    /// formant needs one complex-conjugate pole pair.
    pub lpc_order: usize,
    /// Nominal first-formant frequency hint in Hz; scales the frequency
    /// prior used when scoring candidates. Negative = unused.
    pub nom_freq: f64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            n_formants: 4,
            downsample_rate: 10_000.0,
            pre_emph_factor: 0.7,
            window_kind: WindowKind::Rectangular,
            window_dur: 0.049,
            frame_dur: 0.01,
            lpc_kind: LpcKind::Autocorrelation,
            lpc_order: 12,
            nom_freq: -10.0,
        }
    }
}

impl AnalysisOptions {
    /// Validate the options and convert durations into sample counts.
    ///
    /// Must be called exactly once per configuration before any frame is
    /// processed; the result is immutable. Validation is idempotent:
    /// re-validating the options embedded in a [`ValidatedOptions`] yields
    /// identical derived values.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidOptions`] when:
    /// - `n_formants` is 0, or `lpc_order < 2 × n_formants`
    /// - `pre_emph_factor` is outside `[0, 1)`
    /// - `downsample_rate` is not positive
    /// - `frame_dur` is not positive or exceeds `window_dur`
    /// - the derived window holds fewer than `lpc_order + 1` samples, or
    ///   the frame advance rounds to zero samples
    pub fn validate(self) -> Result<ValidatedOptions> {
        if self.n_formants == 0 {
            return Err(Error::InvalidOptions(
                "n_formants must be at least 1".into(),
            ));
        }
        if self.lpc_order < 2 * self.n_formants {
            return Err(Error::InvalidOptions(format!(
                "lpc_order {} cannot support {} formants (need 2 poles per formant)",
                self.lpc_order, self.n_formants
            )));
        }
        if !(0.0..1.0).contains(&self.pre_emph_factor) {
            return Err(Error::InvalidOptions(format!(
                "pre_emph_factor {} outside [0, 1)",
                self.pre_emph_factor
            )));
        }
        if !(self.downsample_rate > 0.0) {
            return Err(Error::InvalidOptions(format!(
                "downsample_rate {} must be positive",
                self.downsample_rate
            )));
        }
        if !(self.frame_dur > 0.0) {
            return Err(Error::InvalidOptions(format!(
                "frame_dur {} must be positive",
                self.frame_dur
            )));
        }
        if self.window_dur < self.frame_dur {
            return Err(Error::InvalidOptions(format!(
                "window_dur {} shorter than frame_dur {}",
                self.window_dur, self.frame_dur
            )));
        }

        let window_samples = (self.window_dur * self.downsample_rate).round() as usize;
        let frame_samples = (self.frame_dur * self.downsample_rate).round() as usize;

        if frame_samples == 0 {
            return Err(Error::InvalidOptions(
                "frame advance rounds to zero samples at the analysis rate".into(),
            ));
        }
        if window_samples <= self.lpc_order {
            return Err(Error::InvalidOptions(format!(
                "window of {} samples too short for LPC order {}",
                window_samples, self.lpc_order
            )));
        }

        Ok(ValidatedOptions {
            opts: self,
            window_samples,
            frame_samples,
        })
    }
}

/// Validated, normalized analysis options.
///
/// Produced only by [`AnalysisOptions::validate`]. All durations are
/// resolved to sample counts at the analysis rate; the value is treated
/// as immutable for the lifetime of a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedOptions {
    opts: AnalysisOptions,
    window_samples: usize,
    frame_samples: usize,
}

impl ValidatedOptions {
    /// The options this value was validated from.
    #[inline]
    pub fn options(&self) -> &AnalysisOptions {
        &self.opts
    }

    /// Number of formants to track.
    #[inline]
    pub fn n_formants(&self) -> usize {
        self.opts.n_formants
    }

    /// Analysis sample rate in Hz.
    #[inline]
    pub fn downsample_rate(&self) -> f64 {
        self.opts.downsample_rate
    }

    /// Preemphasis factor.
    #[inline]
    pub fn pre_emph_factor(&self) -> f64 {
        self.opts.pre_emph_factor
    }

    /// Window function for each frame.
    #[inline]
    pub fn window_kind(&self) -> WindowKind {
        self.opts.window_kind
    }

    /// LPC estimation method.
    #[inline]
    pub fn lpc_kind(&self) -> LpcKind {
        self.opts.lpc_kind
    }

    /// Predictor order.
    #[inline]
    pub fn lpc_order(&self) -> usize {
        self.opts.lpc_order
    }

    /// Nominal first-formant hint in Hz (negative = unused).
    #[inline]
    pub fn nom_freq(&self) -> f64 {
        self.opts.nom_freq
    }

    /// Window length in samples at the analysis rate.
    #[inline]
    pub fn window_samples(&self) -> usize {
        self.window_samples
    }

    /// Frame advance in samples at the analysis rate.
    #[inline]
    pub fn frame_samples(&self) -> usize {
        self.frame_samples
    }

    /// Frame advance in seconds at the analysis rate.
    #[inline]
    pub fn frame_step(&self) -> f64 {
        self.frame_samples as f64 / self.opts.downsample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_validate() {
        let v = AnalysisOptions::default().validate().unwrap();
        assert_eq!(v.n_formants(), 4);
        assert_eq!(v.window_samples(), 490);
        assert_eq!(v.frame_samples(), 100);
    }

    #[test]
    fn validation_is_idempotent() {
        let v1 = AnalysisOptions::default().validate().unwrap();
        let v2 = v1.options().clone().validate().unwrap();
        assert_eq!(v1, v2);
    }

    #[test]
    fn rejects_unsupported_formant_count() {
        let opts = AnalysisOptions {
            n_formants: 7,
            lpc_order: 12,
            ..AnalysisOptions::default()
        };
        assert!(matches!(opts.validate(), Err(Error::InvalidOptions(_))));
    }

    #[test]
    fn rejects_zero_formants() {
        let opts = AnalysisOptions {
            n_formants: 0,
            ..AnalysisOptions::default()
        };
        assert!(matches!(opts.validate(), Err(Error::InvalidOptions(_))));
    }

    #[test]
    fn rejects_window_shorter_than_frame() {
        let opts = AnalysisOptions {
            window_dur: 0.005,
            frame_dur: 0.01,
            ..AnalysisOptions::default()
        };
        assert!(matches!(opts.validate(), Err(Error::InvalidOptions(_))));
    }

    #[test]
    fn rejects_preemphasis_of_one() {
        let opts = AnalysisOptions {
            pre_emph_factor: 1.0,
            ..AnalysisOptions::default()
        };
        assert!(matches!(opts.validate(), Err(Error::InvalidOptions(_))));
    }

    #[test]
    fn rejects_window_shorter_than_order() {
        let opts = AnalysisOptions {
            window_dur: 0.001,
            frame_dur: 0.001,
            ..AnalysisOptions::default()
        };
        // 10 samples at 10 kHz cannot carry an order-12 fit.
        assert!(matches!(opts.validate(), Err(Error::InvalidOptions(_))));
    }
}
