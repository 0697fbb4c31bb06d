//! Formant tracking - shortest path over the per-frame candidate lattice.
//!
//! The tracker is a frame-synchronous Viterbi search. Every frame
//! contributes one lattice node holding its candidate assignments, a
//! cumulative-cost array, and a backpointer array of plain indices into
//! the previous node (an arena of small integers, no pointer graph).
//! The recurrence is
//!
//! `cum[i][j] = cost[i][j] + min_k( cum[i−1][k] + transition(k, j) )`
//!
//! where the transition cost penalizes per-slot frequency jumps (the
//! vocal tract moves slowly relative to the frame rate) and non-smooth
//! RMS-energy steps. Frame 0 seeds the lattice with intrinsic costs
//! only; the output track is backtracked from the cheapest final-frame
//! candidate.
//!
//! A frame with zero candidates becomes a gap node: it takes the best
//! predecessor at a fixed penalty and carries that predecessor's
//! assignment forward, so isolated dropouts bridge instead of breaking
//! the track. Only when no frame at all has a candidate does the tracker
//! give up ([`Error::NoCandidates`]).

use ndarray::Array1;

use crate::buffer::SampleBuffer;
use crate::candidates::{self, Assignment};
use crate::error::{Error, Result};
use crate::frame::{make_window, Framer};
use crate::lpc;
use crate::options::ValidatedOptions;
use crate::poles;
use crate::preprocess::preprocess;

/// Cost of bridging a frame that produced no candidates.
const GAP_PENALTY: f64 = 4.0;

/// Weight of the per-slot frequency-jump penalty.
const W_JUMP: f64 = 4.0;

/// Weight of the RMS-energy smoothness term.
const W_RMS: f64 = 1.0;

const RMS_EPS: f64 = 1e-9;

/// Per-frame analysis results entering the lattice.
pub(crate) struct FrameEstimate {
    /// Frame-center time in seconds.
    pub time: f64,
    /// RMS energy of the windowed frame.
    pub rms: f64,
    /// Scored candidate assignments; empty for degraded frames.
    pub candidates: Vec<Assignment>,
}

/// One lattice node: parallel candidate/cost/backpointer arrays.
struct LatticeNode {
    /// Cumulative minimum cost per candidate.
    cum: Vec<f64>,
    /// Index of the chosen predecessor candidate in the previous node.
    back: Vec<usize>,
    /// `(frame, candidate)` whose assignment supplies this entry's
    /// output values; a gap node inherits its predecessor's.
    eff: Vec<Option<(usize, usize)>>,
}

/// Backtracked minimum-cost path.
pub(crate) struct LatticePath {
    /// Per frame, the effective assignment (`None` only on an all-gap
    /// prefix where nothing can be carried forward).
    pub effective: Vec<Option<(usize, usize)>>,
    /// Total cost of the selected path.
    pub cost: f64,
}

fn transition_cost(prev: Option<&Assignment>, cur: &Assignment, prev_rms: f64, cur_rms: f64) -> f64 {
    let mut cost = W_RMS * (cur_rms - prev_rms).abs() / (cur_rms + prev_rms + RMS_EPS);
    if let Some(prev) = prev {
        for (&fp, &fc) in prev.freqs.iter().zip(cur.freqs.iter()) {
            if fp.is_finite() && fc.is_finite() {
                cost += W_JUMP * (fc - fp).abs() / (fc + fp);
            }
        }
    }
    cost
}

/// Forward pass and backtrack over all frames.
pub(crate) fn run_lattice(frames: &[FrameEstimate]) -> Result<LatticePath> {
    if frames.is_empty() || frames.iter().all(|f| f.candidates.is_empty()) {
        return Err(Error::NoCandidates);
    }

    let n = frames.len();
    let mut nodes: Vec<LatticeNode> = Vec::with_capacity(n);

    for (i, est) in frames.iter().enumerate() {
        let node = if est.candidates.is_empty() {
            if i == 0 {
                LatticeNode {
                    cum: vec![GAP_PENALTY],
                    back: vec![0],
                    eff: vec![None],
                }
            } else {
                let prev = &nodes[i - 1];
                let mut best_k = 0;
                for (k, &c) in prev.cum.iter().enumerate() {
                    if c < prev.cum[best_k] {
                        best_k = k;
                    }
                }
                LatticeNode {
                    cum: vec![prev.cum[best_k] + GAP_PENALTY],
                    back: vec![best_k],
                    eff: vec![prev.eff[best_k]],
                }
            }
        } else if i == 0 {
            let ncand = est.candidates.len();
            LatticeNode {
                cum: est.candidates.iter().map(|c| c.cost).collect(),
                back: vec![0; ncand],
                eff: (0..ncand).map(|j| Some((0, j))).collect(),
            }
        } else {
            let prev = &nodes[i - 1];
            let prev_rms = frames[i - 1].rms;
            let mut cum = Vec::with_capacity(est.candidates.len());
            let mut back = Vec::with_capacity(est.candidates.len());
            let mut eff = Vec::with_capacity(est.candidates.len());
            for (j, cand) in est.candidates.iter().enumerate() {
                let mut best = f64::INFINITY;
                let mut best_k = 0;
                for (k, &prev_cum) in prev.cum.iter().enumerate() {
                    let prev_assign = prev.eff[k].map(|(fi, ci)| &frames[fi].candidates[ci]);
                    let total = prev_cum + transition_cost(prev_assign, cand, prev_rms, est.rms);
                    // Strict comparison keeps the earliest predecessor on ties.
                    if total < best {
                        best = total;
                        best_k = k;
                    }
                }
                cum.push(best + cand.cost);
                back.push(best_k);
                eff.push(Some((i, j)));
            }
            LatticeNode { cum, back, eff }
        };
        nodes.push(node);
    }

    // Final-frame selection: cumulative cost, then intrinsic cost, then
    // enumeration order.
    let last = &nodes[n - 1];
    let intrinsic = |j: usize| -> f64 {
        frames[n - 1]
            .candidates
            .get(j)
            .map(|c| c.cost)
            .unwrap_or(GAP_PENALTY)
    };
    let mut best_j = 0;
    for j in 1..last.cum.len() {
        let ordering = last.cum[j]
            .partial_cmp(&last.cum[best_j])
            .unwrap_or(std::cmp::Ordering::Equal);
        if ordering == std::cmp::Ordering::Less
            || (ordering == std::cmp::Ordering::Equal && intrinsic(j) < intrinsic(best_j))
        {
            best_j = j;
        }
    }

    let mut choice = vec![0usize; n];
    choice[n - 1] = best_j;
    for i in (0..n - 1).rev() {
        choice[i] = nodes[i + 1].back[choice[i + 1]];
    }

    Ok(LatticePath {
        effective: (0..n).map(|i| nodes[i].eff[choice[i]]).collect(),
        cost: last.cum[best_j],
    })
}

/// One frame of the backtracked output track.
#[derive(Debug, Clone)]
pub struct TrackFrame {
    /// Frame-center time in seconds.
    pub time: f64,
    /// Formant frequencies in Hz, ascending by slot; `NaN` = absent.
    pub freqs: Vec<f64>,
    /// Formant bandwidths in Hz; `NaN` = absent.
    pub bands: Vec<f64>,
    /// RMS energy of the windowed frame.
    pub rms: f64,
}

impl TrackFrame {
    /// Frequency of formant `n` (1-based), `None` if absent or out of range.
    pub fn formant(&self, n: usize) -> Option<f64> {
        if n >= 1 && n <= self.freqs.len() && self.freqs[n - 1].is_finite() {
            Some(self.freqs[n - 1])
        } else {
            None
        }
    }

    /// Bandwidth of formant `n` (1-based), `None` if absent or out of range.
    pub fn bandwidth(&self, n: usize) -> Option<f64> {
        if n >= 1 && n <= self.bands.len() && self.bands[n - 1].is_finite() {
            Some(self.bands[n - 1])
        } else {
            None
        }
    }
}

/// Formant trajectories over one analyzed buffer.
///
/// Produced by [`analyze`]; frames are spaced `time_step()` apart. Absent
/// values (a slot the tracker could not fill) are `NaN` in the array
/// accessors and `Err`-free in the indexed accessors: the distinction
/// between "out of range" and "absent" is an error versus a `NaN`.
#[derive(Debug, Clone)]
pub struct FormantTrack {
    frames: Vec<TrackFrame>,
    time_step: f64,
    n_formants: usize,
    path_cost: f64,
    numerical_failures: Vec<usize>,
}

impl FormantTrack {
    /// The per-frame track data.
    #[inline]
    pub fn frames(&self) -> &[TrackFrame] {
        &self.frames
    }

    /// Number of analysis frames.
    #[inline]
    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    /// Number of formant slots per frame.
    #[inline]
    pub fn n_formants(&self) -> usize {
        self.n_formants
    }

    /// Time between consecutive frames in seconds.
    #[inline]
    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// Total cost of the selected lattice path.
    ///
    /// Comparable across runs on the same buffer and options; lower
    /// means a more plausible, more continuous trajectory.
    #[inline]
    pub fn path_cost(&self) -> f64 {
        self.path_cost
    }

    /// Frames whose LPC fit or root search failed numerically and were
    /// bridged by the tracker.
    #[inline]
    pub fn numerical_failures(&self) -> &[usize] {
        &self.numerical_failures
    }

    /// Frame-center times.
    pub fn times(&self) -> Array1<f64> {
        Array1::from_iter(self.frames.iter().map(|f| f.time))
    }

    /// Frequencies of formant `n` (1-based) across all frames, `NaN`
    /// where absent.
    pub fn formant_values(&self, n: usize) -> Array1<f64> {
        Array1::from_iter(
            self.frames
                .iter()
                .map(|f| f.formant(n).unwrap_or(f64::NAN)),
        )
    }

    /// Bandwidths of formant `n` (1-based) across all frames, `NaN`
    /// where absent.
    pub fn bandwidth_values(&self, n: usize) -> Array1<f64> {
        Array1::from_iter(
            self.frames
                .iter()
                .map(|f| f.bandwidth(n).unwrap_or(f64::NAN)),
        )
    }

    /// Per-frame RMS energies.
    pub fn rms_values(&self) -> Array1<f64> {
        Array1::from_iter(self.frames.iter().map(|f| f.rms))
    }

    /// Frequency of formant `number` (1-based) in frame `frame`.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] if either index exceeds the track's
    /// dimensions. An in-range slot the tracker left unfilled returns
    /// `Ok(NaN)`.
    pub fn formant(&self, frame: usize, number: usize) -> Result<f64> {
        self.check_indices(frame, number)?;
        Ok(self.frames[frame].freqs[number - 1])
    }

    /// Bandwidth of formant `number` (1-based) in frame `frame`.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] if either index exceeds the track's
    /// dimensions.
    pub fn bandwidth(&self, frame: usize, number: usize) -> Result<f64> {
        self.check_indices(frame, number)?;
        Ok(self.frames[frame].bands[number - 1])
    }

    fn check_indices(&self, frame: usize, number: usize) -> Result<()> {
        if frame >= self.frames.len() {
            return Err(Error::IndexOutOfRange(format!(
                "frame {} of {}",
                frame,
                self.frames.len()
            )));
        }
        if number == 0 || number > self.n_formants {
            return Err(Error::IndexOutOfRange(format!(
                "formant {} of {}",
                number, self.n_formants
            )));
        }
        Ok(())
    }

    /// Frequency of formant `number` at an arbitrary time.
    ///
    /// `interpolation` is `"nearest"` or `"linear"`. Returns `None`
    /// outside the track's time span or where no value is present.
    pub fn get_value_at_time(
        &self,
        number: usize,
        time: f64,
        interpolation: &str,
    ) -> Option<f64> {
        if self.frames.is_empty() {
            return None;
        }

        let t0 = self.frames[0].time;
        let idx_float = (time - t0) / self.time_step;
        if idx_float < -0.5 || idx_float > self.frames.len() as f64 - 0.5 {
            return None;
        }

        match interpolation {
            "nearest" => {
                let idx = (idx_float.round().max(0.0) as usize).min(self.frames.len() - 1);
                self.frames[idx].formant(number)
            }
            "linear" => {
                let idx = idx_float.floor() as isize;
                let frac = idx_float - idx as f64;
                let i1 = idx.clamp(0, self.frames.len() as isize - 1) as usize;
                let i2 = (idx + 1).clamp(0, self.frames.len() as isize - 1) as usize;
                match (self.frames[i1].formant(number), self.frames[i2].formant(number)) {
                    (None, None) => None,
                    (None, Some(f)) => Some(f),
                    (Some(f), None) => Some(f),
                    (Some(f1), Some(f2)) => Some(f1 * (1.0 - frac) + f2 * frac),
                }
            }
            _ => None,
        }
    }
}

/// Run the full analysis pipeline on one buffer.
///
/// Preprocesses a copy of the buffer (the caller's data is never
/// touched), walks the overlapping analysis frames, estimates LPC
/// coefficients and extracts pole candidates per frame, and selects the
/// minimum-cost formant trajectory across all frames.
///
/// # Errors
///
/// - [`Error::InvalidBuffer`] when the buffer's sample rate is below the
///   analysis rate
/// - [`Error::NoCandidates`] when no frame produced a usable candidate
///   (including a buffer shorter than one analysis window)
///
/// Frame-local numerical failures do not abort the call; the affected
/// frames are bridged and listed in
/// [`FormantTrack::numerical_failures`].
pub fn analyze(buffer: &SampleBuffer, opts: &ValidatedOptions) -> Result<FormantTrack> {
    let processed = preprocess(buffer.clone(), opts)?;
    let rate = processed.sample_rate();
    let signal = processed.samples();

    let window = make_window(opts.window_kind(), opts.window_samples());
    let framer = Framer::new(signal, &window, opts.frame_samples());

    let mut estimates: Vec<FrameEstimate> = Vec::with_capacity(framer.n_frames());
    let mut failures = Vec::new();

    for (idx, frame) in framer.enumerate() {
        let time = (frame.start + opts.window_samples() / 2) as f64 / rate;
        let rms = lpc::frame_rms(&frame.samples);

        let frame_candidates = match lpc::estimate(&frame.samples, opts.lpc_kind(), opts.lpc_order())
        {
            Ok(result) => match poles::extract(&result.coeffs, rate) {
                Ok(pole_set) => candidates::enumerate(&pole_set, opts),
                Err(poles::RootFailure) => {
                    failures.push(idx);
                    Vec::new()
                }
            },
            Err(lpc::FitFailure) => {
                failures.push(idx);
                Vec::new()
            }
        };

        estimates.push(FrameEstimate {
            time,
            rms,
            candidates: frame_candidates,
        });
    }

    let path = run_lattice(&estimates)?;

    let n_formants = opts.n_formants();
    let frames = estimates
        .iter()
        .zip(path.effective.iter())
        .map(|(est, eff)| {
            let (freqs, bands) = match eff {
                Some((fi, ci)) => {
                    let assignment = &estimates[*fi].candidates[*ci];
                    (assignment.freqs.clone(), assignment.bands.clone())
                }
                None => (vec![f64::NAN; n_formants], vec![f64::NAN; n_formants]),
            };
            TrackFrame {
                time: est.time,
                freqs,
                bands,
                rms: est.rms,
            }
        })
        .collect();

    Ok(FormantTrack {
        frames,
        time_step: opts.frame_step(),
        n_formants,
        path_cost: path.cost,
        numerical_failures: failures,
    })
}
