//! Candidate generation - mapping raw poles to formant-slot assignments.
//!
//! A frame usually yields more poles than formants to track, and some of
//! them are spurious. This module enumerates every order-preserving
//! partial assignment of the frame's ascending-frequency poles to the
//! formant slots (formant 1 < formant 2 < … by convention) and scores
//! each one. The per-candidate intrinsic cost combines:
//!
//! - deviation from the expected frequency range of each slot, a soft
//!   prior centered at `(2k−1) × 500 Hz` (scaled by the caller's nominal
//!   frequency hint when one is set);
//! - a bandwidth penalty, wider bandwidth meaning lower confidence;
//! - a fixed penalty for each slot left unassigned.
//!
//! The candidate list is sorted by cost (ties broken by lower mean
//! bandwidth, then enumeration order) and truncated to
//! [`MAX_CANDIDATES`] to bound the lattice width.

use crate::options::ValidatedOptions;
use crate::poles::PoleCandidate;

/// Widest lattice row: candidates kept per frame after sorting.
pub(crate) const MAX_CANDIDATES: usize = 300;

/// Enumeration stops growing past this; only the cheapest survive anyway.
const ENUMERATION_CAP: usize = 4096;

/// Cost of leaving one formant slot unassigned.
const MISSING_PENALTY: f64 = 2.5;

/// Weight of the frequency-range prior.
const W_RANGE: f64 = 1.0;

/// Weight of the bandwidth confidence penalty.
const W_BAND: f64 = 1.0;

/// Default first-formant center when no nominal hint is given.
const NOMINAL_F1_HZ: f64 = 500.0;

/// One enumerated formant assignment with its intrinsic cost.
#[derive(Debug, Clone)]
pub(crate) struct Assignment {
    /// Per-slot frequency in Hz; `NaN` for an unassigned slot.
    pub freqs: Vec<f64>,
    /// Per-slot bandwidth in Hz; `NaN` for an unassigned slot.
    pub bands: Vec<f64>,
    /// Intrinsic plausibility cost.
    pub cost: f64,
}

impl Assignment {
    /// Mean bandwidth over assigned slots; used as a tie-breaker.
    fn mean_bandwidth(&self) -> f64 {
        let assigned: Vec<f64> = self.bands.iter().copied().filter(|b| b.is_finite()).collect();
        if assigned.is_empty() {
            f64::INFINITY
        } else {
            assigned.iter().sum::<f64>() / assigned.len() as f64
        }
    }
}

/// Enumerate and score the candidate assignments for one frame.
///
/// `poles` must be sorted by ascending frequency. Returns an empty list
/// when the frame has no poles; the tracker bridges such frames.
pub(crate) fn enumerate(poles: &[PoleCandidate], opts: &ValidatedOptions) -> Vec<Assignment> {
    let n_formants = opts.n_formants();
    if poles.is_empty() {
        return Vec::new();
    }

    let nominal = if opts.nom_freq() > 0.0 {
        opts.nom_freq()
    } else {
        NOMINAL_F1_HZ
    };

    let mut selections: Vec<Vec<Option<usize>>> = Vec::new();
    let mut current: Vec<Option<usize>> = Vec::with_capacity(n_formants);
    recurse(poles.len(), n_formants, 0, &mut current, &mut selections);

    let mut assignments: Vec<Assignment> = selections
        .into_iter()
        .map(|slots| score(&slots, poles, nominal))
        .collect();

    assignments.sort_by(|a, b| {
        a.cost
            .partial_cmp(&b.cost)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                a.mean_bandwidth()
                    .partial_cmp(&b.mean_bandwidth())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });
    assignments.truncate(MAX_CANDIDATES);
    assignments
}

/// Depth-first enumeration of order-preserving partial assignments.
///
/// At each slot either one of the remaining higher-frequency poles is
/// taken (keeping pole order ascending across slots) or the slot is left
/// open. The all-open mapping is excluded; a frame with poles always
/// proposes at least one of them.
fn recurse(
    n_poles: usize,
    n_formants: usize,
    next_pole: usize,
    current: &mut Vec<Option<usize>>,
    out: &mut Vec<Vec<Option<usize>>>,
) {
    if out.len() >= ENUMERATION_CAP {
        return;
    }
    if current.len() == n_formants {
        if current.iter().any(|slot| slot.is_some()) {
            out.push(current.clone());
        }
        return;
    }
    for pole in next_pole..n_poles {
        current.push(Some(pole));
        recurse(n_poles, n_formants, pole + 1, current, out);
        current.pop();
    }
    current.push(None);
    recurse(n_poles, n_formants, next_pole, current, out);
    current.pop();
}

/// Intrinsic cost of one slot selection.
fn score(slots: &[Option<usize>], poles: &[PoleCandidate], nominal: f64) -> Assignment {
    let mut freqs = Vec::with_capacity(slots.len());
    let mut bands = Vec::with_capacity(slots.len());
    let mut cost = 0.0;

    for (slot, selection) in slots.iter().enumerate() {
        match selection {
            Some(pole_idx) => {
                let pole = poles[*pole_idx];
                let center = (2 * slot + 1) as f64 * nominal;
                cost += W_RANGE * (pole.frequency - center).abs() / center;
                cost += W_BAND * pole.bandwidth / pole.frequency.max(1.0);
                freqs.push(pole.frequency);
                bands.push(pole.bandwidth);
            }
            None => {
                cost += MISSING_PENALTY;
                freqs.push(f64::NAN);
                bands.push(f64::NAN);
            }
        }
    }

    Assignment { freqs, bands, cost }
}
