//! Error kinds surfaced by the alignment engine.
//!
//! Every fallible operation in this crate returns [`AlignError`]. Nothing is
//! recovered internally: a forward pass that fails releases whatever it had
//! allocated and propagates the error untouched (see `ForwardPass` in the
//! module docs).

use thiserror::Error;

/// Errors produced by the alignment engine.
#[derive(Debug, Error)]
pub enum AlignError {
    /// A sequence was not a valid, non-empty 1-D run of codes, or a
    /// substitution matrix was not square/float-typed/non-empty.
    #[error("bad input shape: {0}")]
    BadInputShape(String),

    /// A sequence code fell outside `[0, m)` for the active substitution
    /// matrix or alphabet size.
    #[error("invalid code {code} at position {position}: must be in [0, {bound})")]
    InvalidCode {
        code: i32,
        position: usize,
        bound: usize,
    },

    /// `strand` was neither `'+'` nor `'-'`.
    #[error("invalid strand {0:?}: must be '+' or '-'")]
    InvalidStrand(char),

    /// The configuration reached a combination the algorithm-selection rule
    /// (spec §3) cannot resolve. This indicates a bug in this crate, not
    /// misuse by the caller.
    #[error("invalid mode/algorithm combination: {0}")]
    InvalidMode(String),

    /// A user-supplied gap-score callback panicked-equivalent (returned an
    /// error) or produced a non-finite score.
    #[error("gap callback failed at position {position}, length {length}: {reason}")]
    GapCallbackFailure {
        position: usize,
        length: usize,
        reason: String,
    },

    /// [`crate::path_counter::PathCounter`] saturated: the true path count
    /// exceeds the platform's signed-word range.
    #[error("path count overflow")]
    ArithmeticOverflow,

    /// An aggregate getter (e.g. `gap_score`) was read while its underlying
    /// scalars disagreed.
    #[error("aggregate score '{0}' is not well-defined: underlying scores differ")]
    ScoresDiffer(&'static str),

    /// FOGSAA's branch-and-bound terminated without closing the gap between
    /// its lower and upper bounds within `epsilon`. Reported as a library
    /// bug, never as user error.
    #[error("FOGSAA terminated with an inconsistent bound: upper - lower = {gap} > epsilon")]
    AlgorithmInconsistency { gap: f64 },

    /// A grid allocation for the forward pass could not be satisfied.
    /// Partially-built grids are dropped before this is returned.
    #[error("out of memory: could not allocate a {rows}x{cols} grid")]
    OutOfMemory { rows: usize, cols: usize },
}

pub type Result<T> = std::result::Result<T, AlignError>;
