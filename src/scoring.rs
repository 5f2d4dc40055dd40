//! The scoring model: match/mismatch or substitution-matrix scores, the
//! twelve directional gap scalars (or user gap-score callbacks), the tie
//! tolerance, and the memoized algorithm selector (spec §3, §4.1).

use crate::error::{AlignError, Result};
use std::fmt;

/// Alignment mode. `Fogsaa` always selects the FOGSAA algorithm regardless
/// of the gap-cost configuration (spec §3 selection rule, step 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Global,
    Local,
    Fogsaa,
}

/// The algorithm family a `ScoringModel` currently resolves to (spec §3
/// "Algorithm selection rule"). `Unknown` only appears before the first
/// resolution; `resolve` never returns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Unknown,
    NeedlemanWunschSmithWaterman,
    Gotoh,
    WatermanSmithBeyer,
    Fogsaa,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Algorithm::Unknown => "unknown",
            Algorithm::NeedlemanWunschSmithWaterman => "needleman_wunsch_smith_waterman",
            Algorithm::Gotoh => "gotoh",
            Algorithm::WatermanSmithBeyer => "waterman_smith_beyer",
            Algorithm::Fogsaa => "fogsaa",
        };
        f.write_str(name)
    }
}

/// Which side of the alignment a gap scalar or callback applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// A gap in sequence B (a vertical DP move, consuming only A).
    Insertion,
    /// A gap in sequence A (a horizontal DP move, consuming only B).
    Deletion,
}

/// Where along a sequence a gap scalar applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Internal,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenExtend {
    Open,
    Extend,
}

/// `open + (k-1) * extend` for a run of length `k >= 1` (spec glossary,
/// "Affine gap").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineCost {
    pub open: f64,
    pub extend: f64,
}

impl AffineCost {
    pub const ZERO: AffineCost = AffineCost {
        open: 0.0,
        extend: 0.0,
    };

    pub fn cost(self, run_length: u32) -> f64 {
        debug_assert!(run_length >= 1);
        self.open + self.extend * (run_length as f64 - 1.0)
    }
}

/// The three positional affine costs for one gap direction (insertion or
/// deletion).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarGaps {
    pub internal: AffineCost,
    pub left: AffineCost,
    pub right: AffineCost,
}

impl Default for ScalarGaps {
    fn default() -> Self {
        ScalarGaps {
            internal: AffineCost::ZERO,
            left: AffineCost::ZERO,
            right: AffineCost::ZERO,
        }
    }
}

impl ScalarGaps {
    fn at(&self, position: Position) -> AffineCost {
        match position {
            Position::Internal => self.internal,
            Position::Left => self.left,
            Position::Right => self.right,
        }
    }

    fn at_mut(&mut self, position: Position) -> &mut AffineCost {
        match position {
            Position::Internal => &mut self.internal,
            Position::Left => &mut self.left,
            Position::Right => &mut self.right,
        }
    }
}

/// A user gap-score function, `(position, length) -> score`. Only consulted
/// by Waterman-Smith-Beyer (spec §1).
pub type GapFn = Box<dyn Fn(usize, u32) -> Result<f64>>;

/// Either a scalar affine model for one gap direction, or a user callback
/// that replaces it entirely (spec §4.1: "Setting a callable as an
/// insertion/deletion score replaces the open/extend fields for that
/// direction with the callback").
pub enum GapSide {
    Scalar(ScalarGaps),
    Callback(GapFn),
}

impl GapSide {
    fn scalar_at(&self, position: Position, oe: OpenExtend) -> Option<f64> {
        match self {
            GapSide::Scalar(s) => {
                let c = s.at(position);
                Some(match oe {
                    OpenExtend::Open => c.open,
                    OpenExtend::Extend => c.extend,
                })
            }
            GapSide::Callback(_) => None,
        }
    }

    fn set_scalar_at(&mut self, position: Position, oe: OpenExtend, value: f64) {
        if !matches!(self, GapSide::Scalar(_)) {
            *self = GapSide::Scalar(ScalarGaps::default());
        }
        if let GapSide::Scalar(s) = self {
            let c = s.at_mut(position);
            match oe {
                OpenExtend::Open => c.open = value,
                OpenExtend::Extend => c.extend = value,
            }
        }
    }

    fn is_linear(&self) -> bool {
        match self {
            GapSide::Scalar(s) => {
                s.internal.open == s.internal.extend
                    && s.left.open == s.left.extend
                    && s.right.open == s.right.extend
            }
            GapSide::Callback(_) => false,
        }
    }
}

/// A square, float-typed substitution matrix indexed by integer code.
#[derive(Debug, Clone)]
pub struct SubstitutionMatrix {
    dim: usize,
    data: Vec<f64>,
}

impl SubstitutionMatrix {
    /// Builds a `dim x dim` substitution matrix from row-major `data`.
    pub fn new(dim: usize, data: Vec<f64>) -> Result<Self> {
        if dim == 0 {
            return Err(AlignError::BadInputShape(
                "substitution matrix must not be empty".to_string(),
            ));
        }
        if data.len() != dim * dim {
            return Err(AlignError::BadInputShape(format!(
                "substitution matrix data has {} entries, expected {} for a {}x{} matrix",
                data.len(),
                dim * dim,
                dim,
                dim
            )));
        }
        Ok(Self { dim, data })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn score(&self, a: usize, b: usize) -> f64 {
        self.data[a * self.dim + b]
    }
}

/// Where match/mismatch scoring comes from (spec §4.1: the matrix, when
/// present, overrides the scalar match/mismatch/wildcard triple).
pub enum ScoreSource {
    Compare {
        match_score: f64,
        mismatch_score: f64,
        wildcard: Option<i32>,
    },
    Matrix(SubstitutionMatrix),
}

/// Enumerates the twelve named gap scalars and the aggregate groups spec §6
/// lists alongside them, dispatched through one getter/setter pair instead
/// of twenty near-identical methods (an Open Question decision recorded in
/// DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapAggregate {
    /// All twelve scalars.
    Gap,
    /// All six `open_*` scalars.
    OpenGap,
    /// All six `extend_*` scalars.
    ExtendGap,
    /// `{open,extend} x {internal} x {insertion,deletion}`.
    InternalGap,
    /// `{open,extend} x {left,right} x {insertion,deletion}`.
    EndGap,
    /// `{open,extend} x {left} x {insertion,deletion}`.
    LeftGap,
    /// `{open,extend} x {right} x {insertion,deletion}`.
    RightGap,
    OpenInternalGap,
    ExtendInternalGap,
    OpenEndGap,
    ExtendEndGap,
    OpenLeftGap,
    ExtendLeftGap,
    OpenRightGap,
    ExtendRightGap,
    /// `{open,extend} x {internal,left,right}` for insertion only.
    InsertionScore,
    /// Same, for deletion only.
    DeletionScore,
}

impl GapAggregate {
    fn combos(self) -> Vec<(Direction, Position, OpenExtend)> {
        use Direction::*;
        use OpenExtend::*;
        use Position::*;
        let all_dirs = [Insertion, Deletion];
        let all_pos = |positions: &[Position], oe: &[OpenExtend]| -> Vec<_> {
            let mut v = Vec::new();
            for &d in &all_dirs {
                for &p in positions {
                    for &o in oe {
                        v.push((d, p, o));
                    }
                }
            }
            v
        };
        match self {
            GapAggregate::Gap => all_pos(&[Internal, Left, Right], &[Open, Extend]),
            GapAggregate::OpenGap => all_pos(&[Internal, Left, Right], &[Open]),
            GapAggregate::ExtendGap => all_pos(&[Internal, Left, Right], &[Extend]),
            GapAggregate::InternalGap => all_pos(&[Internal], &[Open, Extend]),
            GapAggregate::EndGap => all_pos(&[Left, Right], &[Open, Extend]),
            GapAggregate::LeftGap => all_pos(&[Left], &[Open, Extend]),
            GapAggregate::RightGap => all_pos(&[Right], &[Open, Extend]),
            GapAggregate::OpenInternalGap => all_pos(&[Internal], &[Open]),
            GapAggregate::ExtendInternalGap => all_pos(&[Internal], &[Extend]),
            GapAggregate::OpenEndGap => all_pos(&[Left, Right], &[Open]),
            GapAggregate::ExtendEndGap => all_pos(&[Left, Right], &[Extend]),
            GapAggregate::OpenLeftGap => all_pos(&[Left], &[Open]),
            GapAggregate::ExtendLeftGap => all_pos(&[Left], &[Extend]),
            GapAggregate::OpenRightGap => all_pos(&[Right], &[Open]),
            GapAggregate::ExtendRightGap => all_pos(&[Right], &[Extend]),
            GapAggregate::InsertionScore => {
                let mut v = Vec::new();
                for &p in &[Internal, Left, Right] {
                    for &o in &[Open, Extend] {
                        v.push((Insertion, p, o));
                    }
                }
                v
            }
            GapAggregate::DeletionScore => {
                let mut v = Vec::new();
                for &p in &[Internal, Left, Right] {
                    for &o in &[Open, Extend] {
                        v.push((Deletion, p, o));
                    }
                }
                v
            }
        }
    }

    fn label(self) -> &'static str {
        match self {
            GapAggregate::Gap => "gap_score",
            GapAggregate::OpenGap => "open_gap_score",
            GapAggregate::ExtendGap => "extend_gap_score",
            GapAggregate::InternalGap => "internal_gap_score",
            GapAggregate::EndGap => "end_gap_score",
            GapAggregate::LeftGap => "left_gap_score",
            GapAggregate::RightGap => "right_gap_score",
            GapAggregate::OpenInternalGap => "open_internal_gap_score",
            GapAggregate::ExtendInternalGap => "extend_internal_gap_score",
            GapAggregate::OpenEndGap => "open_end_gap_score",
            GapAggregate::ExtendEndGap => "extend_end_gap_score",
            GapAggregate::OpenLeftGap => "open_left_gap_score",
            GapAggregate::ExtendLeftGap => "extend_left_gap_score",
            GapAggregate::OpenRightGap => "open_right_gap_score",
            GapAggregate::ExtendRightGap => "extend_right_gap_score",
            GapAggregate::InsertionScore => "insertion_score",
            GapAggregate::DeletionScore => "deletion_score",
        }
    }
}

/// All scoring parameters for a single `Aligner` (spec §3 table).
pub struct ScoringModel {
    pub mode: Mode,
    pub score_source: ScoreSource,
    pub insertion: GapSide,
    pub deletion: GapSide,
    pub epsilon: f64,
    algorithm: Option<Algorithm>,
}

impl ScoringModel {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            score_source: ScoreSource::Compare {
                match_score: 1.0,
                mismatch_score: -1.0,
                wildcard: None,
            },
            insertion: GapSide::Scalar(ScalarGaps::default()),
            deletion: GapSide::Scalar(ScalarGaps::default()),
            epsilon: 1e-6,
            algorithm: None,
        }
    }

    fn invalidate(&mut self) {
        self.algorithm = None;
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.invalidate();
    }

    pub fn set_match_mismatch(&mut self, match_score: f64, mismatch_score: f64) {
        let wildcard = match &self.score_source {
            ScoreSource::Compare { wildcard, .. } => *wildcard,
            ScoreSource::Matrix(_) => None,
        };
        self.score_source = ScoreSource::Compare {
            match_score,
            mismatch_score,
            wildcard,
        };
        self.invalidate();
    }

    pub fn set_wildcard(&mut self, wildcard: Option<i32>) {
        if let ScoreSource::Compare { wildcard: w, .. } = &mut self.score_source {
            *w = wildcard;
        }
        self.invalidate();
    }

    pub fn set_substitution_matrix(&mut self, matrix: SubstitutionMatrix) {
        self.score_source = ScoreSource::Matrix(matrix);
        self.invalidate();
    }

    /// The matrix dimension, or 256 for compare-by-equality mode (spec §3
    /// "Sequences").
    pub fn code_bound(&self) -> usize {
        match &self.score_source {
            ScoreSource::Compare { .. } => 256,
            ScoreSource::Matrix(m) => m.dim(),
        }
    }

    pub fn substitution_score(&self, a: i32, b: i32) -> f64 {
        match &self.score_source {
            ScoreSource::Compare {
                match_score,
                mismatch_score,
                wildcard,
            } => {
                if Some(a) == *wildcard || Some(b) == *wildcard {
                    0.0
                } else if a == b {
                    *match_score
                } else {
                    *mismatch_score
                }
            }
            ScoreSource::Matrix(m) => m.score(a as usize, b as usize),
        }
    }

    fn gap_side(&self, direction: Direction) -> &GapSide {
        match direction {
            Direction::Insertion => &self.insertion,
            Direction::Deletion => &self.deletion,
        }
    }

    fn gap_side_mut(&mut self, direction: Direction) -> &mut GapSide {
        match direction {
            Direction::Insertion => &mut self.insertion,
            Direction::Deletion => &mut self.deletion,
        }
    }

    pub fn set_gap_fn(&mut self, direction: Direction, f: GapFn) {
        *self.gap_side_mut(direction) = GapSide::Callback(f);
        self.invalidate();
    }

    pub fn set_gap_scalar(
        &mut self,
        direction: Direction,
        position: Position,
        oe: OpenExtend,
        value: f64,
    ) {
        self.gap_side_mut(direction).set_scalar_at(position, oe, value);
        self.invalidate();
    }

    pub fn gap_scalar(&self, direction: Direction, position: Position, oe: OpenExtend) -> Option<f64> {
        self.gap_side(direction).scalar_at(position, oe)
    }

    /// Affine cost at `position` for `direction`, or `None` if that
    /// direction is driven by a user callback.
    pub fn affine_cost(&self, direction: Direction, position: Position) -> Option<AffineCost> {
        match self.gap_side(direction) {
            GapSide::Scalar(s) => Some(s.at(position)),
            GapSide::Callback(_) => None,
        }
    }

    pub fn gap_fn_cost(&self, direction: Direction, position: usize, length: u32) -> Option<Result<f64>> {
        match self.gap_side(direction) {
            GapSide::Scalar(_) => None,
            GapSide::Callback(f) => Some(f(position, length)),
        }
    }

    pub fn gap_aggregate(&self, agg: GapAggregate) -> Result<f64> {
        let combos = agg.combos();
        let mut values = combos
            .iter()
            .map(|&(d, p, oe)| self.gap_scalar(d, p, oe).ok_or(AlignError::ScoresDiffer(agg.label())));
        let first = values.next().expect("aggregate combos are never empty")?;
        for v in values {
            if v? != first {
                return Err(AlignError::ScoresDiffer(agg.label()));
            }
        }
        Ok(first)
    }

    pub fn set_gap_aggregate(&mut self, agg: GapAggregate, value: f64) {
        for (d, p, oe) in agg.combos() {
            self.set_gap_scalar(d, p, oe, value);
        }
    }

    /// `true` when every `open_* == extend_*` scalar (spec §3 selection
    /// rule, step 3). Always `false` if either direction uses a callback.
    fn is_linear_gap(&self) -> bool {
        self.insertion.is_linear() && self.deletion.is_linear()
    }

    fn uses_gap_fn(&self) -> bool {
        matches!(self.insertion, GapSide::Callback(_)) || matches!(self.deletion, GapSide::Callback(_))
    }

    /// Resolves and memoizes the algorithm family per spec §3's selection
    /// rule. Any setter above invalidates the memo.
    pub fn resolve(&mut self) -> Algorithm {
        if let Some(a) = self.algorithm {
            return a;
        }
        let resolved = if self.mode == Mode::Fogsaa {
            Algorithm::Fogsaa
        } else if self.uses_gap_fn() {
            Algorithm::WatermanSmithBeyer
        } else if self.is_linear_gap() {
            Algorithm::NeedlemanWunschSmithWaterman
        } else {
            Algorithm::Gotoh
        };
        self.algorithm = Some(resolved);
        resolved
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm.unwrap_or(Algorithm::Unknown)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_to_linear_needleman_wunsch_smith_waterman() {
        let mut m = ScoringModel::new(Mode::Global);
        assert_eq!(m.resolve(), Algorithm::NeedlemanWunschSmithWaterman);
    }

    #[test]
    fn unequal_open_extend_selects_gotoh() {
        let mut m = ScoringModel::new(Mode::Global);
        m.set_gap_scalar(Direction::Insertion, Position::Internal, OpenExtend::Open, -10.0);
        m.set_gap_scalar(Direction::Insertion, Position::Internal, OpenExtend::Extend, -1.0);
        assert_eq!(m.resolve(), Algorithm::Gotoh);
    }

    #[test]
    fn gap_fn_selects_waterman_smith_beyer_even_in_fogsaa_free_mode() {
        let mut m = ScoringModel::new(Mode::Global);
        m.set_gap_fn(Direction::Deletion, Box::new(|_, k| Ok(2.0 + k as f64)));
        assert_eq!(m.resolve(), Algorithm::WatermanSmithBeyer);
    }

    #[test]
    fn fogsaa_mode_always_wins() {
        let mut m = ScoringModel::new(Mode::Fogsaa);
        m.set_gap_fn(Direction::Deletion, Box::new(|_, k| Ok(2.0 + k as f64)));
        assert_eq!(m.resolve(), Algorithm::Fogsaa);
    }

    #[test]
    fn setter_invalidates_memoized_algorithm() {
        let mut m = ScoringModel::new(Mode::Global);
        assert_eq!(m.resolve(), Algorithm::NeedlemanWunschSmithWaterman);
        m.set_gap_scalar(Direction::Insertion, Position::Internal, OpenExtend::Open, -5.0);
        assert_eq!(m.resolve(), Algorithm::Gotoh);
    }

    #[test]
    fn gap_aggregate_reads_uniform_scalars() {
        let mut m = ScoringModel::new(Mode::Global);
        m.set_gap_aggregate(GapAggregate::Gap, -2.0);
        assert_eq!(m.gap_aggregate(GapAggregate::Gap).unwrap(), -2.0);
        m.set_gap_scalar(Direction::Insertion, Position::Left, OpenExtend::Open, -9.0);
        assert!(m.gap_aggregate(GapAggregate::Gap).is_err());
        assert_eq!(
            m.gap_aggregate(GapAggregate::OpenLeftGap).unwrap_err().to_string(),
            AlignError::ScoresDiffer("open_left_gap_score").to_string()
        );
    }

    #[test]
    fn callback_direction_breaks_scalar_aggregates() {
        let mut m = ScoringModel::new(Mode::Global);
        m.set_gap_fn(Direction::Insertion, Box::new(|_, _| Ok(-1.0)));
        assert!(m.gap_aggregate(GapAggregate::InsertionScore).is_err());
        // the other direction is untouched
        assert!(m.gap_aggregate(GapAggregate::DeletionScore).is_ok());
    }

    #[test]
    fn substitution_matrix_overrides_compare_mode() {
        let mut m = ScoringModel::new(Mode::Global);
        let matrix = SubstitutionMatrix::new(2, vec![1.0, -1.0, -1.0, 1.0]).unwrap();
        m.set_substitution_matrix(matrix);
        assert_eq!(m.substitution_score(0, 0), 1.0);
        assert_eq!(m.substitution_score(0, 1), -1.0);
        assert_eq!(m.code_bound(), 2);
    }

    #[test]
    fn wildcard_scores_zero_against_anything() {
        let mut m = ScoringModel::new(Mode::Global);
        m.set_match_mismatch(2.0, -3.0);
        m.set_wildcard(Some(9));
        assert_eq!(m.substitution_score(9, 1), 0.0);
        assert_eq!(m.substitution_score(1, 9), 0.0);
        assert_eq!(m.substitution_score(1, 1), 2.0);
    }
}
