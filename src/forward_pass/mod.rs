//! The eight forward-pass variants (four algorithms x two modes), plus the
//! shared edge-gap resolution and local-mode reachability pruning every
//! linear/affine/general-gap variant needs (spec §4.2).
//!
//! Dispatch from [`run_score`] / [`run_align`] is a flat match on the
//! memoized [`Algorithm`], not virtual dispatch: the inner DP loops are tight
//! enough that a vtable indirection per cell would show up in profiles
//! (spec §9 "Enumerated algorithm/mode").

pub mod fogsaa;
pub mod gotoh;
pub mod nw_sw;
pub mod wsb;

use crate::error::{AlignError, Result};
use crate::scoring::{Algorithm, Direction, Mode, Position, ScoringModel};
use crate::sequence::Strand;
use crate::trace::TraceStore;

/// The six affine costs a forward pass needs, with `left`/`right` already
/// swapped for strand `'-'` (spec §4.5).
#[derive(Debug, Clone, Copy)]
pub struct GapCosts {
    pub internal_insertion: crate::scoring::AffineCost,
    pub left_insertion: crate::scoring::AffineCost,
    pub right_insertion: crate::scoring::AffineCost,
    pub internal_deletion: crate::scoring::AffineCost,
    pub left_deletion: crate::scoring::AffineCost,
    pub right_deletion: crate::scoring::AffineCost,
}

impl GapCosts {
    pub fn resolve(model: &ScoringModel, strand: Strand) -> Self {
        // Strand describes how B is read; only the insertion (gap-in-B)
        // edge roles flip on '-'. Deletion indexes A's rows and is
        // strand-independent (spec §4.5, §4.2.3's `query_gap_start`).
        let swap = strand.is_reverse();
        let at = |direction: Direction, position: Position| {
            let position = if swap && direction == Direction::Insertion {
                match position {
                    Position::Left => Position::Right,
                    Position::Right => Position::Left,
                    Position::Internal => Position::Internal,
                }
            } else {
                position
            };
            model
                .affine_cost(direction, position)
                .expect("scalar gap cost required for linear/affine forward passes")
        };
        GapCosts {
            internal_insertion: at(Direction::Insertion, Position::Internal),
            left_insertion: at(Direction::Insertion, Position::Left),
            right_insertion: at(Direction::Insertion, Position::Right),
            internal_deletion: at(Direction::Deletion, Position::Internal),
            left_deletion: at(Direction::Deletion, Position::Left),
            right_deletion: at(Direction::Deletion, Position::Right),
        }
    }

    /// Cost of a deletion run of length `k` starting at row `i` (0-based,
    /// `nrows = nA+1`); `i == 0` is the left edge, `i == nrows-1` the right.
    pub fn deletion_cost(&self, i: usize, nrows: usize, k: u32) -> f64 {
        if i == 0 {
            self.left_deletion.cost(k)
        } else if i == nrows - 1 {
            self.right_deletion.cost(k)
        } else {
            self.internal_deletion.cost(k)
        }
    }

    /// Cost of an insertion run of length `k` starting at column `j`
    /// (0-based, `ncols = nB+1`); `j == 0` is the left edge, `j == ncols-1`
    /// the right.
    pub fn insertion_cost(&self, j: usize, ncols: usize, k: u32) -> f64 {
        if j == 0 {
            self.left_insertion.cost(k)
        } else if j == ncols - 1 {
            self.right_insertion.cost(k)
        } else {
            self.internal_insertion.cost(k)
        }
    }

    fn deletion_at(&self, i: usize, nrows: usize) -> crate::scoring::AffineCost {
        if i == 0 {
            self.left_deletion
        } else if i == nrows - 1 {
            self.right_deletion
        } else {
            self.internal_deletion
        }
    }

    fn insertion_at(&self, j: usize, ncols: usize) -> crate::scoring::AffineCost {
        if j == 0 {
            self.left_insertion
        } else if j == ncols - 1 {
            self.right_insertion
        } else {
            self.internal_insertion
        }
    }

    /// Per-step deletion open cost at row `i` (Gotoh; spec §4.2.2).
    pub fn deletion_open(&self, i: usize, nrows: usize) -> f64 {
        self.deletion_at(i, nrows).open
    }

    /// Per-step deletion extend cost at row `i` (Gotoh; spec §4.2.2).
    pub fn deletion_extend(&self, i: usize, nrows: usize) -> f64 {
        self.deletion_at(i, nrows).extend
    }

    /// Per-step insertion open cost at column `j` (Gotoh; spec §4.2.2).
    pub fn insertion_open(&self, j: usize, ncols: usize) -> f64 {
        self.insertion_at(j, ncols).open
    }

    /// Per-step insertion extend cost at column `j` (Gotoh; spec §4.2.2).
    pub fn insertion_extend(&self, j: usize, ncols: usize) -> f64 {
        self.insertion_at(j, ncols).extend
    }
}

/// Runs the score-only variant: no `TraceStore` is allocated.
pub fn run_score(model: &mut ScoringModel, a: &[i32], b: &[i32], strand: Strand) -> Result<f64> {
    let algorithm = model.resolve();
    let gaps = GapCosts::resolve(model, strand);
    let local = model.mode == Mode::Local;
    match algorithm {
        Algorithm::NeedlemanWunschSmithWaterman => nw_sw::score(model, &gaps, a, b, local),
        Algorithm::Gotoh => gotoh::score(model, &gaps, a, b, local),
        Algorithm::WatermanSmithBeyer => wsb::score(model, a, b, local, strand),
        Algorithm::Fogsaa => fogsaa::score(model, a, b),
        Algorithm::Unknown => Err(AlignError::InvalidMode(
            "algorithm selector produced Unknown".to_string(),
        )),
    }
}

/// Runs the traceback-producing variant, returning the score and the
/// populated `TraceStore`.
pub fn run_align(
    model: &mut ScoringModel,
    a: &[i32],
    b: &[i32],
    strand: Strand,
) -> Result<(f64, TraceStore)> {
    let algorithm = model.resolve();
    let gaps = GapCosts::resolve(model, strand);
    let local = model.mode == Mode::Local;
    match algorithm {
        Algorithm::NeedlemanWunschSmithWaterman => nw_sw::align(model, &gaps, a, b, local),
        Algorithm::Gotoh => gotoh::align(model, &gaps, a, b, local),
        Algorithm::WatermanSmithBeyer => wsb::align(model, a, b, local, strand),
        Algorithm::Fogsaa => fogsaa::align(model, a, b),
        Algorithm::Unknown => Err(AlignError::InvalidMode(
            "algorithm selector produced Unknown".to_string(),
        )),
    }
}

/// Given three tied candidates `(value, bit)`, returns the winning value and
/// the OR of every bit within `epsilon` of it (spec §4.2 tie handling).
pub(crate) fn best_of_3(candidates: [(f64, u8); 3], epsilon: f64) -> (f64, u8) {
    let max_val = candidates
        .iter()
        .map(|(v, _)| *v)
        .fold(f64::NEG_INFINITY, f64::max);
    let mut bits = 0u8;
    for (v, bit) in candidates {
        if max_val - v <= epsilon {
            bits |= bit;
        }
    }
    (max_val, bits)
}
