//! Pole extraction - from predictor coefficients to formant candidates.
//!
//! Documentation sources:
//! - Numerical Recipes Ch. 9.5 (Laguerre's method with deflation and
//!   root polishing)
//! - Markel & Gray (1976): root-to-formant conversion
//!
//! The predictor `x[n] ≈ Σ a_k·x[n−k]` has the characteristic polynomial
//! `z^p − a_1·z^{p−1} − … − a_p`. Each complex root `z = r·e^{iθ}` in the
//! upper half-plane maps to one resonance:
//!
//! - frequency = `θ · rate / 2π`
//! - bandwidth = `−ln(r) · rate / π`
//!
//! Roots are found by Laguerre iteration with synthetic-division
//! deflation, then polished by Newton–Raphson against the undeflated
//! polynomial. Unstable predictors (covariance methods give no stability
//! guarantee) produce roots outside the unit circle; those map to
//! negative bandwidths and are discarded by the physicality filter along
//! with anything at or beyond the Nyquist frequency or wider than
//! [`MAX_BANDWIDTH_HZ`]. A frame can legitimately end up with zero
//! surviving poles; that is a result, not an error.

use num_complex::Complex64;

/// Widest bandwidth accepted as a plausible vocal-tract resonance.
pub const MAX_BANDWIDTH_HZ: f64 = 1000.0;

/// Laguerre iteration cap per root.
const MAX_LAGUERRE_ITER: usize = 80;

/// Cycle-breaking step fractions, applied every tenth iteration.
const STEP_FRACTIONS: [f64; 8] = [0.5, 0.25, 0.75, 0.13, 0.38, 0.62, 0.88, 1.0];

/// Marker for a frame-local root-finding failure.
///
/// The engine maps this to
/// [`Error::RootFindingFailed`](crate::Error::RootFindingFailed), degrades
/// the frame to zero candidates, and continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootFailure;

/// One resonance candidate from a complex-conjugate pole pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoleCandidate {
    /// Frequency in Hz.
    pub frequency: f64,
    /// Bandwidth in Hz.
    pub bandwidth: f64,
}

/// Extract formant candidates from predictor coefficients.
///
/// Returns candidates sorted by ascending frequency; the list may be
/// empty when no pole survives the physicality filter.
pub fn extract(
    coeffs: &[f64],
    sample_rate: f64,
) -> std::result::Result<Vec<PoleCandidate>, RootFailure> {
    // Characteristic polynomial, descending powers, monic.
    let mut monic = Vec::with_capacity(coeffs.len() + 1);
    monic.push(1.0);
    monic.extend(coeffs.iter().map(|&a| -a));

    // Trailing zero coefficients put roots at the origin; they carry no
    // resonance, so factor them out before iterating.
    while monic.len() > 1 && monic.last().map_or(false, |c| c.abs() < 1e-12) {
        monic.pop();
    }
    if monic.len() < 3 {
        // Degree below two cannot hold a complex-conjugate pair.
        return Ok(Vec::new());
    }

    let roots = find_roots(&monic).ok_or(RootFailure)?;
    if roots.iter().any(|z| !z.re.is_finite() || !z.im.is_finite()) {
        return Err(RootFailure);
    }

    let nyquist = sample_rate / 2.0;
    let mut candidates: Vec<PoleCandidate> = roots
        .iter()
        .filter(|z| z.im > 0.0)
        .filter_map(|z| {
            let frequency = z.arg() * sample_rate / (2.0 * std::f64::consts::PI);
            let bandwidth = -z.norm().ln() * sample_rate / std::f64::consts::PI;
            if frequency > 0.0
                && frequency < nyquist
                && bandwidth > 0.0
                && bandwidth <= MAX_BANDWIDTH_HZ
            {
                Some(PoleCandidate {
                    frequency,
                    bandwidth,
                })
            } else {
                None
            }
        })
        .collect();

    candidates.sort_by(|a, b| {
        a.frequency
            .partial_cmp(&b.frequency)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(candidates)
}

/// All roots of a real-coefficient monic polynomial (descending powers).
///
/// Laguerre with deflation, smallest roots first, then every root is
/// polished against the undeflated polynomial.
fn find_roots(monic: &[f64]) -> Option<Vec<Complex64>> {
    let degree = monic.len() - 1;
    let mut work: Vec<Complex64> = monic.iter().map(|&c| Complex64::new(c, 0.0)).collect();
    let mut roots = Vec::with_capacity(degree);

    for remaining in (1..=degree).rev() {
        let root = laguerre(&work[..=remaining], Complex64::new(0.0, 0.0))?;
        roots.push(root);

        // Synthetic division by (z − root); drop the remainder.
        let mut carry = work[0];
        for c in work.iter_mut().take(remaining + 1).skip(1) {
            let next = *c + root * carry;
            *c = carry;
            carry = next;
        }
        work.truncate(remaining);
    }

    for root in roots.iter_mut() {
        *root = polish_root(monic, *root, 20, 1e-12);
        // Rounding can leave a conjugate pair slightly asymmetric; snap
        // near-real roots onto the axis so the half-plane filter is exact.
        if root.im.abs() <= 1e-12 * (1.0 + root.re.abs()) {
            root.im = 0.0;
        }
    }
    Some(roots)
}

/// One Laguerre root search on a complex-coefficient polynomial.
fn laguerre(coeffs: &[Complex64], mut x: Complex64) -> Option<Complex64> {
    let m = (coeffs.len() - 1) as f64;

    for iter in 1..=MAX_LAGUERRE_ITER {
        // p, p', p''/2 by a single Horner sweep.
        let mut p = coeffs[0];
        let mut dp = Complex64::new(0.0, 0.0);
        let mut half_d2p = Complex64::new(0.0, 0.0);
        for &c in coeffs.iter().skip(1) {
            half_d2p = half_d2p * x + dp;
            dp = dp * x + p;
            p = p * x + c;
        }

        if p.norm() < 1e-300 {
            return Some(x);
        }

        let g = dp / p;
        let g2 = g * g;
        let h = g2 - (half_d2p / p) * 2.0;
        let sq = ((h * m - g2) * (m - 1.0)).sqrt();
        let gp = g + sq;
        let gm = g - sq;
        let denom = if gp.norm() >= gm.norm() { gp } else { gm };

        let dx = if denom.norm() > 0.0 {
            Complex64::new(m, 0.0) / denom
        } else {
            // Stationary point; step off it deterministically.
            Complex64::from_polar(1.0 + x.norm(), iter as f64)
        };

        let x1 = x - dx;
        if x == x1 {
            return Some(x);
        }
        if iter % 10 != 0 {
            x = x1;
        } else {
            x = x - dx * STEP_FRACTIONS[(iter / 10 - 1) % STEP_FRACTIONS.len()];
        }
        if dx.norm() <= 1e-14 * x.norm().max(1.0) {
            return Some(x);
        }
    }
    None
}

/// Newton–Raphson polish of one root against the undeflated polynomial.
fn polish_root(monic: &[f64], mut z: Complex64, max_iter: usize, tol: f64) -> Complex64 {
    for _ in 0..max_iter {
        let mut p = Complex64::new(monic[0], 0.0);
        let mut dp = Complex64::new(0.0, 0.0);
        for &c in monic.iter().skip(1) {
            dp = dp * z + p;
            p = p * z + Complex64::new(c, 0.0);
        }
        if dp.norm() < 1e-30 {
            break;
        }
        let delta = p / dp;
        z -= delta;
        if delta.norm() < tol * z.norm().max(1.0) {
            break;
        }
    }
    z
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lpc;
    use crate::options::LpcKind;

    /// Predictor coefficients whose poles are the given (freq, bw) pairs.
    fn coeffs_for_pairs(pairs: &[(f64, f64)], rate: f64) -> Vec<f64> {
        let mut poly = vec![1.0];
        for &(freq, bw) in pairs {
            let theta = 2.0 * std::f64::consts::PI * freq / rate;
            let r = (-std::f64::consts::PI * bw / rate).exp();
            let quad = [1.0, -2.0 * r * theta.cos(), r * r];
            let mut next = vec![0.0; poly.len() + 2];
            for (i, &p) in poly.iter().enumerate() {
                for (j, &q) in quad.iter().enumerate() {
                    next[i + j] += p * q;
                }
            }
            poly = next;
        }
        poly.iter().skip(1).map(|&c| -c).collect()
    }

    #[test]
    fn recovers_single_pole_pair() {
        let coeffs = coeffs_for_pairs(&[(850.0, 60.0)], 10_000.0);
        let candidates = extract(&coeffs, 10_000.0).unwrap();
        assert_eq!(candidates.len(), 1);
        assert!((candidates[0].frequency - 850.0).abs() < 1e-6);
        assert!((candidates[0].bandwidth - 60.0).abs() < 1e-6);
    }

    #[test]
    fn recovers_two_pole_pairs_in_frequency_order() {
        let coeffs = coeffs_for_pairs(&[(2300.0, 120.0), (600.0, 80.0)], 10_000.0);
        let candidates = extract(&coeffs, 10_000.0).unwrap();
        assert_eq!(candidates.len(), 2);
        assert!((candidates[0].frequency - 600.0).abs() < 1e-4);
        assert!((candidates[1].frequency - 2300.0).abs() < 1e-4);
        assert!((candidates[0].bandwidth - 80.0).abs() < 1e-4);
        assert!((candidates[1].bandwidth - 120.0).abs() < 1e-4);
    }

    #[test]
    fn drops_wide_bandwidth_poles() {
        let coeffs = coeffs_for_pairs(&[(1500.0, 2500.0)], 10_000.0);
        assert!(extract(&coeffs, 10_000.0).unwrap().is_empty());
    }

    #[test]
    fn drops_unstable_poles() {
        // r > 1 maps to a negative bandwidth.
        let theta = 2.0 * std::f64::consts::PI * 1000.0 / 10_000.0;
        let r = 1.05;
        let coeffs = vec![2.0 * r * theta.cos(), -r * r];
        assert!(extract(&coeffs, 10_000.0).unwrap().is_empty());
    }

    #[test]
    fn real_poles_carry_no_resonance() {
        // z² − 0.5·z: one root at 0.5, one at the origin.
        let coeffs = vec![0.5, 0.0];
        assert!(extract(&coeffs, 10_000.0).unwrap().is_empty());
    }

    #[test]
    fn lpc_poles_recover_sinusoid_frequencies() {
        let rate = 8000.0;
        let n = 400;
        let x: Vec<f64> = (0..n)
            .map(|i| {
                let t = i as f64 / rate;
                (2.0 * std::f64::consts::PI * 700.0 * t).sin()
                    + (2.0 * std::f64::consts::PI * 1200.0 * t).sin()
            })
            .collect();
        let result = lpc::estimate(&x, LpcKind::Autocorrelation, 4).unwrap();
        let candidates = extract(&result.coeffs, rate).unwrap();
        assert_eq!(candidates.len(), 2);
        assert!((candidates[0].frequency - 700.0).abs() < 0.05 * 700.0);
        assert!((candidates[1].frequency - 1200.0).abs() < 0.05 * 1200.0);
    }
}
