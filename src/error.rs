//! Error types for formant analysis.
//!
//! All errors implement `std::error::Error` via the `thiserror` crate.
//!
//! # Error Handling Philosophy
//!
//! - **Configuration and buffer errors** are rejected before any frame is
//!   processed and are always recoverable by the caller supplying corrected
//!   input.
//! - **Numerical errors** (a singular LPC system, a root finder producing
//!   non-finite values) are frame-local: the affected frame degrades to an
//!   empty candidate set and analysis of the buffer continues. The frame
//!   indices are recorded on the resulting track.
//! - **Track failure** (`NoCandidates`) is terminal for one `analyze` call:
//!   no frame produced a usable candidate, so no path exists.

use thiserror::Error;

/// Result type alias using this crate's Error type.
///
/// # Example
///
/// ```no_run
/// use formant_track::{AnalysisOptions, Result, SampleBuffer};
///
/// fn analyze_file(path: &str) -> Result<()> {
///     let buffer = SampleBuffer::from_file(path)?;
///     let opts = AnalysisOptions::default().validate()?;
///     let track = formant_track::analyze(&buffer, &opts)?;
///     println!("{} frames", track.n_frames());
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during formant analysis.
#[derive(Error, Debug)]
pub enum Error {
    /// Error reading an audio file.
    ///
    /// Wraps errors from the `hound` WAV library: file not found, not a
    /// valid WAV file, corrupted sample data.
    #[error("failed to read audio file: {0}")]
    AudioRead(#[from] hound::Error),

    /// General I/O error not specific to WAV reading.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Analysis options failed validation.
    ///
    /// Returned by [`AnalysisOptions::validate`](crate::AnalysisOptions::validate)
    /// when the requested parameter combination is inconsistent, e.g. the
    /// LPC order cannot support the requested number of formants, or the
    /// frame advance exceeds the window duration. Validation fails closed:
    /// nothing is clamped silently.
    #[error("invalid analysis options: {0}")]
    InvalidOptions(String),

    /// The sample buffer is malformed or incompatible with the options.
    ///
    /// Covers interleaved-storage length mismatches, zero channels, and a
    /// source sample rate below the requested analysis rate.
    #[error("invalid sample buffer: {0}")]
    InvalidBuffer(String),

    /// The LPC normal-equation system for one frame was singular to
    /// working precision.
    ///
    /// Recorded per frame; the frame is treated as having zero formant
    /// candidates and analysis continues.
    #[error("singular LPC system in frame {frame}")]
    SingularLpcSystem {
        /// Index of the analysis frame whose fit failed.
        frame: usize,
    },

    /// The polynomial root finder produced non-finite values for one frame.
    ///
    /// Like [`Error::SingularLpcSystem`], this degrades the frame to zero
    /// candidates rather than aborting the buffer.
    #[error("root finding failed in frame {frame}")]
    RootFindingFailed {
        /// Index of the analysis frame whose roots could not be found.
        frame: usize,
    },

    /// No frame in the buffer produced any formant candidate.
    ///
    /// This is the terminal result of `analyze` when the tracker has no
    /// path to select: the buffer was shorter than one analysis window,
    /// or every frame's poles were filtered away.
    #[error("no formant candidates in any frame")]
    NoCandidates,

    /// A track accessor was called with an out-of-range index.
    #[error("index out of range: {0}")]
    IndexOutOfRange(String),
}
