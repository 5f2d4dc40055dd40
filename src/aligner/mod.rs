//! The `Aligner` facade: validates sequences against the active scoring
//! source, then dispatches to the forward pass the `ScoringModel` resolves
//! to (spec §3 "Aligner").

use crate::error::Result;
use crate::forward_pass::{run_align, run_score};
use crate::path_generator::PathGenerator;
use crate::scoring::ScoringModel;
use crate::sequence::{self, Strand};

/// Owns a [`ScoringModel`] and runs it against sequence pairs. Sequences are
/// borrowed only for the duration of a call; nothing about a specific pair
/// is retained between calls (spec §3 ownership table).
pub struct Aligner {
    model: ScoringModel,
}

impl Aligner {
    pub fn new(model: ScoringModel) -> Self {
        Aligner { model }
    }

    pub fn model(&self) -> &ScoringModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut ScoringModel {
        &mut self.model
    }

    fn validate_pair(&self, a: &[i32], b: &[i32]) -> Result<()> {
        let bound = self.model.code_bound();
        sequence::validate(a, bound)?;
        sequence::validate(b, bound)?;
        Ok(())
    }

    /// The optimal alignment score for `a` against `b`, without building a
    /// traceback (spec §4.2 "ForwardPass: score-only variant").
    pub fn score(&mut self, a: &[i32], b: &[i32], strand: Strand) -> Result<f64> {
        self.validate_pair(a, b)?;
        run_score(&mut self.model, a, b, strand)
    }

    /// The optimal score plus a [`PathGenerator`] over every co-optimal
    /// alignment path (spec §4.2 "ForwardPass: traceback variant").
    pub fn align(&mut self, a: &[i32], b: &[i32], strand: Strand) -> Result<(f64, PathGenerator)> {
        self.validate_pair(a, b)?;
        let local = self.model.mode == crate::scoring::Mode::Local;
        let (score, store) = run_align(&mut self.model, a, b, strand)?;
        Ok((score, PathGenerator::new(store, local, strand)))
    }
}
