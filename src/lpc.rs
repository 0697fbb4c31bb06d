//! Linear-predictive analysis of one windowed frame.
//!
//! Documentation sources:
//! - Makhoul (1975): "Linear prediction: a tutorial review" (autocorrelation
//!   and covariance formulations)
//! - Markel & Gray (1976): "Linear Prediction of Speech"
//!
//! The predictor convention throughout is `x[n] ≈ Σ_{k=1..p} a_k·x[n−k]`;
//! [`LpcResult::coeffs`] stores `a_1..a_p`. Three estimation methods are
//! supported:
//!
//! - **Autocorrelation**: biased autocorrelation to lag `p`, solved with
//!   the Levinson–Durbin recursion. The resulting predictor is
//!   minimum-phase. If the prediction-error variance reaches zero before
//!   order `p` (a frame that is perfectly predictable at a lower order),
//!   the recursion stops early and the remaining coefficients stay zero.
//! - **Covariance**: least squares over the frame without the windowing
//!   assumption, solved by Cholesky factorization of the normal-equation
//!   matrix. No stability guarantee.
//! - **BSA**: the covariance normal equations with a raised-cosine
//!   weighting of the per-sample prediction-error terms. The historical
//!   method is specified only as a weighted-covariance class, so this is
//!   a best-effort rendition.
//!
//! A frame whose system is singular to working precision reports a
//! [`FitFailure`] instead of fabricating coefficients.

use ndarray::Array2;

use crate::options::LpcKind;

/// Marker for a frame-local LPC fit failure (singular system).
///
/// The engine maps this to
/// [`Error::SingularLpcSystem`](crate::Error::SingularLpcSystem) with the
/// frame index attached, degrades the frame to zero candidates, and
/// continues with the rest of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitFailure;

/// Predictor coefficients and energy for one analysis frame.
#[derive(Debug, Clone)]
pub struct LpcResult {
    /// `a_1..a_p` in `x[n] ≈ Σ a_k·x[n−k]`.
    pub coeffs: Vec<f64>,
    /// RMS energy of the windowed frame.
    pub rms: f64,
}

/// RMS energy of a frame, method-independent.
pub fn frame_rms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|&s| s * s).sum::<f64>() / samples.len() as f64).sqrt()
}

/// Estimate `order` predictor coefficients for one windowed frame.
pub fn estimate(
    samples: &[f64],
    kind: LpcKind,
    order: usize,
) -> std::result::Result<LpcResult, FitFailure> {
    if samples.len() <= order {
        return Err(FitFailure);
    }
    let coeffs = match kind {
        LpcKind::Autocorrelation => autocorrelation_lpc(samples, order)?,
        LpcKind::Covariance => covariance_lpc(samples, order, None)?,
        LpcKind::Bsa => {
            let weights = raised_cosine_weights(samples.len() - order);
            covariance_lpc(samples, order, Some(&weights))?
        }
    };
    Ok(LpcResult {
        coeffs,
        rms: frame_rms(samples),
    })
}

/// Autocorrelation method via Levinson–Durbin.
fn autocorrelation_lpc(x: &[f64], order: usize) -> std::result::Result<Vec<f64>, FitFailure> {
    let n = x.len();
    let mut r = vec![0.0; order + 1];
    for (k, rk) in r.iter_mut().enumerate() {
        let mut acc = 0.0;
        for i in 0..n - k {
            acc += x[i] * x[i + k];
        }
        *rk = acc / n as f64;
    }

    if r[0] < 1e-30 {
        return Err(FitFailure);
    }

    let mut a = vec![0.0; order];
    let mut err = r[0];
    for i in 0..order {
        let mut acc = r[i + 1];
        for j in 0..i {
            acc -= a[j] * r[i - j];
        }
        let k = acc / err;

        let prev = a[..i].to_vec();
        a[i] = k;
        for j in 0..i {
            a[j] = prev[j] - k * prev[i - 1 - j];
        }

        err *= 1.0 - k * k;
        // Perfectly predictable at this order; higher coefficients stay zero.
        if !(err > 0.0) || !err.is_finite() {
            break;
        }
    }
    Ok(a)
}

/// Covariance method: solve `Σ_k a_k·φ[i][k] = φ[i][0]` with
/// `φ[i][k] = Σ_{n=p}^{N−1} w[n−p]·x[n−i]·x[n−k]`.
fn covariance_lpc(
    x: &[f64],
    order: usize,
    weights: Option<&[f64]>,
) -> std::result::Result<Vec<f64>, FitFailure> {
    let n = x.len();
    let p = order;

    let mut phi = Array2::<f64>::zeros((p, p));
    let mut b = vec![0.0; p];
    for m in p..n {
        let w = weights.map_or(1.0, |ws| ws[m - p]);
        for i in 0..p {
            let xi = x[m - 1 - i];
            b[i] += w * x[m] * xi;
            for j in i..p {
                phi[[i, j]] += w * xi * x[m - 1 - j];
            }
        }
    }
    for i in 0..p {
        for j in 0..i {
            phi[[i, j]] = phi[[j, i]];
        }
    }

    cholesky_solve(&phi, &b)
}

/// Raised-cosine weighting over the prediction-error range.
fn raised_cosine_weights(len: usize) -> Vec<f64> {
    if len <= 1 {
        return vec![1.0; len];
    }
    let denom = (len - 1) as f64;
    (0..len)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / denom).cos())
        .collect()
}

/// Solve the symmetric system `M·a = b` by Cholesky factorization.
///
/// A non-positive pivot means the system is singular (or indefinite) to
/// working precision.
fn cholesky_solve(m: &Array2<f64>, b: &[f64]) -> std::result::Result<Vec<f64>, FitFailure> {
    let p = b.len();
    let mut l = Array2::<f64>::zeros((p, p));

    for i in 0..p {
        for j in 0..=i {
            let mut acc = m[[i, j]];
            for k in 0..j {
                acc -= l[[i, k]] * l[[j, k]];
            }
            if i == j {
                if !(acc > 1e-30) || !acc.is_finite() {
                    return Err(FitFailure);
                }
                l[[i, i]] = acc.sqrt();
            } else {
                l[[i, j]] = acc / l[[j, j]];
            }
        }
    }

    // Forward substitution L·y = b, then back substitution Lᵀ·a = y.
    let mut y = vec![0.0; p];
    for i in 0..p {
        let mut acc = b[i];
        for k in 0..i {
            acc -= l[[i, k]] * y[k];
        }
        y[i] = acc / l[[i, i]];
    }
    let mut a = vec![0.0; p];
    for i in (0..p).rev() {
        let mut acc = y[i];
        for k in i + 1..p {
            acc -= l[[k, i]] * a[k];
        }
        a[i] = acc / l[[i, i]];
    }

    if a.iter().any(|v| !v.is_finite()) {
        return Err(FitFailure);
    }
    Ok(a)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic pseudo-noise for synthetic AR processes.
    fn lcg_noise(len: usize) -> Vec<f64> {
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        (0..len)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5
            })
            .collect()
    }

    fn ar2(noise: &[f64], a1: f64, a2: f64) -> Vec<f64> {
        let mut x = vec![0.0; noise.len()];
        for i in 0..noise.len() {
            let x1 = if i >= 1 { x[i - 1] } else { 0.0 };
            let x2 = if i >= 2 { x[i - 2] } else { 0.0 };
            x[i] = a1 * x1 + a2 * x2 + noise[i];
        }
        x
    }

    #[test]
    fn autocorrelation_recovers_ar2() {
        let x = ar2(&lcg_noise(8000), 1.0, -0.5);
        let result = estimate(&x, LpcKind::Autocorrelation, 2).unwrap();
        assert!((result.coeffs[0] - 1.0).abs() < 0.05);
        assert!((result.coeffs[1] + 0.5).abs() < 0.05);
    }

    #[test]
    fn covariance_recovers_noiseless_ar2_exactly() {
        // Without driving noise the least-squares residual is zero and the
        // recovered predictor matches the recursion coefficients.
        let mut x = vec![0.0; 60];
        x[0] = 1.0;
        x[1] = 0.5;
        for i in 2..60 {
            x[i] = 0.9 * x[i - 1] - 0.5 * x[i - 2];
        }
        let result = estimate(&x, LpcKind::Covariance, 2).unwrap();
        assert!((result.coeffs[0] - 0.9).abs() < 1e-8);
        assert!((result.coeffs[1] + 0.5).abs() < 1e-8);
    }

    #[test]
    fn bsa_recovers_noiseless_ar2_exactly() {
        // The error weighting cannot move an exact solution.
        let mut x = vec![0.0; 60];
        x[0] = 1.0;
        x[1] = -0.3;
        for i in 2..60 {
            x[i] = 0.8 * x[i - 1] - 0.4 * x[i - 2];
        }
        let result = estimate(&x, LpcKind::Bsa, 2).unwrap();
        assert!((result.coeffs[0] - 0.8).abs() < 1e-8);
        assert!((result.coeffs[1] + 0.4).abs() < 1e-8);
    }

    #[test]
    fn silent_frame_is_singular() {
        let x = vec![0.0; 100];
        assert!(matches!(
            estimate(&x, LpcKind::Autocorrelation, 4),
            Err(FitFailure)
        ));
        assert!(matches!(estimate(&x, LpcKind::Covariance, 4), Err(FitFailure)));
    }

    #[test]
    fn frame_shorter_than_order_fails() {
        let x = vec![1.0; 4];
        assert!(matches!(
            estimate(&x, LpcKind::Autocorrelation, 8),
            Err(FitFailure)
        ));
    }

    #[test]
    fn rms_of_constant_frame() {
        let result = estimate(&vec![0.5; 64], LpcKind::Autocorrelation, 2).unwrap();
        assert!((result.rms - 0.5).abs() < 1e-12);
        assert!((frame_rms(&[3.0, 4.0]) - (12.5f64).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn levinson_predictor_is_minimum_phase() {
        // Reflection-coefficient magnitudes below one keep |a_p| = |Π k_i| < 1;
        // spot-check the whole predictor on a two-tone frame by verifying the
        // prediction error is far below the signal energy.
        let n = 400;
        let x: Vec<f64> = (0..n)
            .map(|i| {
                let t = i as f64;
                (2.0 * std::f64::consts::PI * 700.0 * t / 8000.0).sin()
                    + (2.0 * std::f64::consts::PI * 1200.0 * t / 8000.0).sin()
            })
            .collect();
        let result = estimate(&x, LpcKind::Autocorrelation, 4).unwrap();
        let a = &result.coeffs;
        let mut err_energy = 0.0;
        let mut sig_energy = 0.0;
        for i in 4..n {
            let pred: f64 = (0..4).map(|k| a[k] * x[i - 1 - k]).sum();
            err_energy += (x[i] - pred) * (x[i] - pred);
            sig_energy += x[i] * x[i];
        }
        assert!(err_energy < 0.01 * sig_energy);
    }
}
