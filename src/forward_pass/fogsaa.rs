//! FOGSAA: best-first branch-and-bound over the `(nA+1)x(nB+1)` grid (spec
//! §4.2.4). Always global; always produces exactly one canonical path
//! (`PathCounter` reports 1 for this algorithm, spec §4.3).

use crate::error::{AlignError, Result};
use crate::matrix::Matrix;
use crate::scoring::{Direction, Position, ScoringModel};
use crate::trace::{Aux, TraceStore, DIAGONAL, ENDPOINT, HORIZONTAL, STARTPOINT, VERTICAL};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Bounds {
    lower: f64,
    upper: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Move {
    Diagonal,
    Horizontal,
    Vertical,
}

#[derive(Clone, Copy, Debug)]
struct Node {
    i: usize,
    j: usize,
    present: f64,
    bounds: Bounds,
    came_from: Option<Move>,
}

/// Ordered by `(upper, lower)` descending, so `BinaryHeap` (a max-heap) pops
/// the most promising frontier node first (spec §4.2.4 step 4).
#[derive(Clone, Copy, Debug)]
struct HeapEntry(Node);

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.0.bounds.upper == other.0.bounds.upper && self.0.bounds.lower == other.0.bounds.lower
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .bounds
            .upper
            .partial_cmp(&other.0.bounds.upper)
            .unwrap_or(Ordering::Equal)
            .then(
                self.0
                    .bounds
                    .lower
                    .partial_cmp(&other.0.bounds.lower)
                    .unwrap_or(Ordering::Equal),
            )
    }
}

fn check_admissibility(model: &ScoringModel) {
    let match_score = match &model.score_source {
        crate::scoring::ScoreSource::Compare { match_score, .. } => *match_score,
        crate::scoring::ScoreSource::Matrix(_) => return,
    };
    let mismatch = match &model.score_source {
        crate::scoring::ScoreSource::Compare { mismatch_score, .. } => *mismatch_score,
        crate::scoring::ScoreSource::Matrix(_) => return,
    };
    let mut ok = mismatch < match_score;
    for direction in [Direction::Insertion, Direction::Deletion] {
        for position in [Position::Internal, Position::Left, Position::Right] {
            if let Some(cost) = model.affine_cost(direction, position) {
                if cost.open > mismatch || cost.extend > mismatch {
                    ok = false;
                }
            }
        }
    }
    if !ok {
        log::warn!(
            "FOGSAA admissibility assumption (mismatch < match and gap scores <= mismatch) is violated; bounds may be non-admissible and results are best-effort (spec §9)"
        );
    }
}

/// Admissible bound on the best achievable score to close out an alignment
/// from `(i, j)` to `(na, nb)`: the best case assumes every remaining
/// position matches, adjusted for the length gap between the two residual
/// tails via a single gap (open once, extend the rest).
fn residual_upper_bound(model: &ScoringModel, i: usize, j: usize, na: usize, nb: usize) -> f64 {
    let ra = na - i;
    let rb = nb - j;
    let common = ra.min(rb);
    let best_match = match &model.score_source {
        crate::scoring::ScoreSource::Compare { match_score, .. } => *match_score,
        crate::scoring::ScoreSource::Matrix(m) => {
            let mut best = f64::NEG_INFINITY;
            for x in 0..m.dim() {
                best = best.max(m.score(x, x));
            }
            best
        }
    };
    let mut bound = common as f64 * best_match;
    let extra = ra.abs_diff(rb);
    if extra > 0 {
        let (direction, position) = if ra > rb {
            (Direction::Insertion, if j == nb { Position::Right } else { Position::Internal })
        } else {
            (Direction::Deletion, if i == na { Position::Right } else { Position::Internal })
        };
        let gap_cost = model
            .affine_cost(direction, position)
            .map(|c| c.cost(extra as u32))
            .unwrap_or(0.0);
        bound += gap_cost;
    }
    bound
}

/// Admissible lower bound: worst case assumes every remaining position
/// mismatches and the length gap is covered by a single gap run.
fn residual_lower_bound(model: &ScoringModel, i: usize, j: usize, na: usize, nb: usize) -> f64 {
    let ra = na - i;
    let rb = nb - j;
    let common = ra.min(rb);
    let worst_match = match &model.score_source {
        crate::scoring::ScoreSource::Compare { mismatch_score, .. } => *mismatch_score,
        crate::scoring::ScoreSource::Matrix(m) => {
            let mut worst = f64::INFINITY;
            for x in 0..m.dim() {
                for y in 0..m.dim() {
                    worst = worst.min(m.score(x, y));
                }
            }
            worst
        }
    };
    let mut bound = common as f64 * worst_match;
    let extra = ra.abs_diff(rb);
    if extra > 0 {
        let (direction, position) = if ra > rb {
            (Direction::Insertion, if j == nb { Position::Right } else { Position::Internal })
        } else {
            (Direction::Deletion, if i == na { Position::Right } else { Position::Internal })
        };
        let gap_cost = model
            .affine_cost(direction, position)
            .map(|c| c.cost(extra as u32))
            .unwrap_or(0.0);
        bound += gap_cost;
    }
    bound
}

fn child(model: &ScoringModel, a: &[i32], b: &[i32], i: usize, j: usize, present: f64, mv: Move) -> Option<Node> {
    let na = a.len();
    let nb = b.len();
    let (ni, nj) = match mv {
        Move::Diagonal => (i + 1, j + 1),
        Move::Horizontal => (i, j + 1),
        Move::Vertical => (i + 1, j),
    };
    if ni > na || nj > nb {
        return None;
    }
    let step_cost = match mv {
        Move::Diagonal => model.substitution_score(a[i], b[j]),
        Move::Horizontal => {
            let position = if i == 0 { Position::Left } else if i == na { Position::Right } else { Position::Internal };
            model.affine_cost(Direction::Deletion, position)?.cost(1)
        }
        Move::Vertical => {
            let position = if j == 0 { Position::Left } else if j == nb { Position::Right } else { Position::Internal };
            model.affine_cost(Direction::Insertion, position)?.cost(1)
        }
    };
    let new_present = present + step_cost;
    let lower = new_present + residual_lower_bound(model, ni, nj, na, nb);
    let upper = new_present + residual_upper_bound(model, ni, nj, na, nb);
    Some(Node {
        i: ni,
        j: nj,
        present: new_present,
        bounds: Bounds { lower, upper },
        came_from: Some(mv),
    })
}

pub fn score(model: &ScoringModel, a: &[i32], b: &[i32]) -> Result<f64> {
    run(model, a, b).map(|(s, _, _)| s)
}

pub fn align(model: &ScoringModel, a: &[i32], b: &[i32]) -> Result<(f64, TraceStore)> {
    let (s, moves, _) = run(model, a, b)?;
    let nrows = a.len() + 1;
    let ncols = b.len() + 1;
    let mut store = TraceStore::new(nrows, ncols, Aux::None)?;
    store.m[(0, 0)].or_trace(STARTPOINT);
    store.m[(nrows - 1, ncols - 1)].or_trace(ENDPOINT);

    let mut i = 0usize;
    let mut j = 0usize;
    for mv in &moves {
        match mv {
            Move::Diagonal => {
                store.m[(i + 1, j + 1)].or_trace(DIAGONAL);
                i += 1;
                j += 1;
            }
            Move::Horizontal => {
                store.m[(i, j + 1)].or_trace(HORIZONTAL);
                j += 1;
            }
            Move::Vertical => {
                store.m[(i + 1, j)].or_trace(VERTICAL);
                i += 1;
            }
        }
    }
    Ok((s, store))
}

/// Returns `(score, move_sequence)`. `move_sequence` replays the canonical
/// path from `(0,0)` to `(nA,nB)` found by the branch-and-bound.
fn run(model: &ScoringModel, a: &[i32], b: &[i32]) -> Result<(f64, Vec<Move>, usize)> {
    check_admissibility(model);
    let na = a.len();
    let nb = b.len();
    let epsilon = model.epsilon;

    let mut best_present = Matrix::filled(f64::NEG_INFINITY, na + 1, nb + 1)?;
    let mut best_parent: Matrix<Option<Move>> = Matrix::filled(None, na + 1, nb + 1)?;
    best_present[(0, 0)] = 0.0;

    let root_bounds = Bounds {
        lower: residual_lower_bound(model, 0, 0, na, nb),
        upper: residual_upper_bound(model, 0, 0, na, nb),
    };
    let mut cursor = Node {
        i: 0,
        j: 0,
        present: 0.0,
        bounds: root_bounds,
        came_from: None,
    };
    let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::new();
    let mut lower_bound = f64::NEG_INFINITY;
    let mut best_goal: Option<(f64, usize, usize)> = None;

    loop {
        if cursor.i == na && cursor.j == nb {
            if cursor.present > lower_bound {
                lower_bound = cursor.present;
                best_goal = Some((cursor.present, cursor.i, cursor.j));
            }
        } else {
            let moves = [Move::Diagonal, Move::Horizontal, Move::Vertical];
            let mut children: Vec<Node> = moves
                .into_iter()
                .filter_map(|mv| child(model, a, b, cursor.i, cursor.j, cursor.present, mv))
                .collect();
            children.sort_by(|x, y| {
                y.bounds
                    .upper
                    .partial_cmp(&x.bounds.upper)
                    .unwrap_or(Ordering::Equal)
            });

            let mut advanced = false;
            for (rank, n) in children.into_iter().enumerate() {
                if rank == 0 {
                    if best_present[(n.i, n.j)] >= n.present + epsilon {
                        continue;
                    }
                    best_present[(n.i, n.j)] = n.present;
                    best_parent[(n.i, n.j)] = n.came_from;
                    cursor = n;
                    advanced = true;
                } else {
                    heap.push(HeapEntry(n));
                }
            }
            if advanced {
                continue;
            }
        }

        match heap.pop() {
            Some(HeapEntry(n)) => {
                if n.bounds.upper <= lower_bound + epsilon {
                    heap.push(HeapEntry(n));
                    break;
                }
                if best_present[(n.i, n.j)] >= n.present + epsilon {
                    continue;
                }
                best_present[(n.i, n.j)] = n.present;
                best_parent[(n.i, n.j)] = n.came_from;
                cursor = n;
            }
            None => break,
        }
    }

    let (final_score, gi, gj) = best_goal.ok_or(AlignError::InvalidMode(
        "FOGSAA failed to reach the alignment corner".to_string(),
    ))?;

    if let Some(HeapEntry(top)) = heap.peek() {
        let gap = top.bounds.upper - lower_bound;
        if gap > epsilon {
            return Err(AlignError::AlgorithmInconsistency { gap });
        }
    }

    let mut path = Vec::new();
    let (mut i, mut j) = (gi, gj);
    while (i, j) != (0, 0) {
        let mv = best_parent[(i, j)].expect("every non-root cell on the traced path has a recorded move");
        path.push(mv);
        match mv {
            Move::Diagonal => {
                i -= 1;
                j -= 1;
            }
            Move::Horizontal => j -= 1,
            Move::Vertical => i -= 1,
        }
    }
    path.reverse();

    Ok((final_score, path, na))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scoring::Mode;

    #[test]
    fn global_fogsaa_matches_linear_identity() {
        let mut model = ScoringModel::new(Mode::Fogsaa);
        model.set_match_mismatch(1.0, -1.0);
        model.set_gap_aggregate(crate::scoring::GapAggregate::Gap, -1.0);
        let seq: Vec<i32> = "ACGTACGT".bytes().map(i32::from).collect();
        let s = score(&model, &seq, &seq).unwrap();
        assert_eq!(s, 8.0);
    }

    #[test]
    fn fogsaa_counter_is_always_one() {
        let mut model = ScoringModel::new(Mode::Fogsaa);
        model.set_match_mismatch(2.0, -1.0);
        model.set_gap_aggregate(crate::scoring::GapAggregate::Gap, -2.0);
        let a: Vec<i32> = "GAATTC".bytes().map(i32::from).collect();
        let b: Vec<i32> = "GAC".bytes().map(i32::from).collect();
        let (_s, store) = align(&model, &a, &b).unwrap();
        assert!(store.m[(a.len(), b.len())].has_trace(ENDPOINT));
    }
}
