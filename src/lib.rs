//! # formant-track
//!
//! Estimation and tracking of vocal-tract resonance frequencies
//! ("formants") from digitized speech.
//!
//! The input is a mono or multi-channel PCM buffer at a known sample
//! rate; the output is, per analysis frame, a small ordered set of
//! formant frequencies and bandwidths suitable for driving a real-time
//! visualization or further acoustic-phonetic analysis. Audio capture
//! and presentation are the caller's business: this crate only reads
//! buffers the caller fills and returns an in-memory track.
//!
//! # Pipeline
//!
//! 1. **Preprocess**: downsample to the analysis rate, apply first-order
//!    preemphasis ([`preprocess`](preprocess::preprocess)).
//! 2. **Frame**: slice into overlapping windowed frames
//!    ([`frame::Framer`]).
//! 3. **Estimate**: fit linear-predictive coefficients per frame by the
//!    autocorrelation, covariance, or BSA method ([`lpc::estimate`]).
//! 4. **Extract**: root the predictor polynomial and map each
//!    complex-conjugate pole pair to a (frequency, bandwidth) candidate
//!    ([`poles::extract`]).
//! 5. **Track**: score per-frame formant assignments and pick the
//!    minimum-cost, temporally continuous trajectory with a Viterbi
//!    search over the candidate lattice ([`analyze`]).
//!
//! # Quick Start
//!
//! ```no_run
//! use formant_track::{AnalysisOptions, SampleBuffer};
//!
//! // Load a WAV file (or fill a buffer from your own capture loop).
//! let buffer = SampleBuffer::from_file("speech.wav").unwrap();
//!
//! // Validate options once; defaults: 4 formants, 10 kHz analysis rate,
//! // 49 ms window advancing 10 ms, order-12 autocorrelation LPC.
//! let opts = AnalysisOptions::default().validate().unwrap();
//!
//! let track = formant_track::analyze(&buffer, &opts).unwrap();
//! for frame in track.frames() {
//!     println!("{:.3}s  F1 = {:?}", frame.time, frame.formant(1));
//! }
//! ```
//!
//! # Concurrency
//!
//! The engine is single-threaded and stateless between invocations:
//! processing one buffer is one synchronous call with no shared mutable
//! state. Callers running a capture loop simply invoke [`analyze`] on
//! each successive buffer.

pub mod buffer;
mod candidates;
pub mod error;
pub mod frame;
pub mod lpc;
pub mod options;
pub mod poles;
pub mod preprocess;
pub mod track;

/// Error and result types.
pub use error::{Error, Result};

/// Analysis configuration.
///
/// - `AnalysisOptions`: caller-facing parameters with original defaults
/// - `ValidatedOptions`: normalized, immutable configuration
/// - `WindowKind` / `LpcKind`: closed method selectors
pub use options::{AnalysisOptions, LpcKind, ValidatedOptions, WindowKind};

/// Audio input.
pub use buffer::SampleBuffer;

/// Pole extraction output.
pub use poles::PoleCandidate;

/// Tracking output and the pipeline entry point.
///
/// - `analyze`: run the full pipeline on one buffer
/// - `FormantTrack`: the backtracked trajectory
/// - `TrackFrame`: one frame of the track
pub use track::{analyze, FormantTrack, TrackFrame};
