//! Pairwise sequence alignment: Needleman-Wunsch/Smith-Waterman, Gotoh,
//! Waterman-Smith-Beyer, and FOGSAA, behind one `Aligner` facade.
//!
//! Sequences are slices of `i32` codes (an external collaborator owns the
//! letter-to-code mapping); the engine owns score computation, bit-packed
//! traceback storage, saturating path counting, and resumable path
//! generation over the traceback DAG.

pub mod aligner;
pub mod error;
pub mod forward_pass;
pub mod matrix;
pub mod path_counter;
pub mod path_generator;
pub mod scoring;
pub mod sequence;
pub mod trace;

pub use aligner::Aligner;
pub use error::{AlignError, Result};
pub use scoring::{Algorithm, Mode, ScoringModel};
pub use sequence::Strand;
