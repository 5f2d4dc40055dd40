//! Needleman-Wunsch (global) / Smith-Waterman (local), linear gap (spec
//! §4.2.1). One score matrix; rolling one-row buffers for the score-only
//! variant, a full trace grid for `align`.

use super::{best_of_3, GapCosts};
use crate::error::Result;
use crate::scoring::ScoringModel;
use crate::trace::{Aux, TraceStore, DIAGONAL, ENDPOINT, HORIZONTAL, PATH_NONE, STARTPOINT, VERTICAL};

pub fn score(model: &ScoringModel, gaps: &GapCosts, a: &[i32], b: &[i32], local: bool) -> Result<f64> {
    let (nrows, ncols) = (a.len() + 1, b.len() + 1);
    let mut prev = vec![0.0f64; ncols];
    let mut cur = vec![0.0f64; ncols];
    let epsilon = model.epsilon;

    if !local {
        for j in 1..ncols {
            prev[j] = prev[j - 1] + gaps.deletion_cost(0, nrows, j as u32);
        }
    }

    let mut global_max = f64::NEG_INFINITY;
    for i in 1..nrows {
        cur[0] = if local {
            0.0
        } else {
            prev[0] + gaps.insertion_cost(0, ncols, i as u32)
        };
        for j in 1..ncols {
            let diag = prev[j - 1] + model.substitution_score(a[i - 1], b[j - 1]);
            let horiz = cur[j - 1] + gaps.deletion_cost(i, nrows, 1);
            let vert = prev[j] + gaps.insertion_cost(j, ncols, 1);
            let (mut val, _) = best_of_3([(diag, DIAGONAL), (horiz, HORIZONTAL), (vert, VERTICAL)], epsilon);
            if local {
                val = val.max(0.0);
                if val > global_max {
                    global_max = val;
                }
            }
            cur[j] = val;
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    if local {
        Ok(global_max.max(0.0))
    } else {
        Ok(prev[ncols - 1])
    }
}

pub fn align(
    model: &ScoringModel,
    gaps: &GapCosts,
    a: &[i32],
    b: &[i32],
    local: bool,
) -> Result<(f64, TraceStore)> {
    let nrows = a.len() + 1;
    let ncols = b.len() + 1;
    let epsilon = model.epsilon;
    let mut store = TraceStore::new(nrows, ncols, Aux::None)?;
    let mut prev = vec![0.0f64; ncols];
    let mut cur = vec![0.0f64; ncols];
    let mut reachable = crate::matrix::Matrix::filled(false, nrows, ncols)?;

    if local {
        store.m[(0, 0)].or_trace(STARTPOINT);
        reachable[(0, 0)] = true;
    } else {
        store.m[(0, 0)].or_trace(STARTPOINT);
        reachable[(0, 0)] = true;
        for j in 1..ncols {
            prev[j] = prev[j - 1] + gaps.deletion_cost(0, nrows, j as u32);
            store.m[(0, j)].set_trace(HORIZONTAL);
            reachable[(0, j)] = true;
        }
    }

    let mut global_max = f64::NEG_INFINITY;
    let mut max_cells: Vec<(usize, usize)> = Vec::new();

    for i in 1..nrows {
        cur[0] = if local {
            0.0
        } else {
            let v = prev[0] + gaps.insertion_cost(0, ncols, i as u32);
            store.m[(i, 0)].set_trace(VERTICAL);
            reachable[(i, 0)] = true;
            v
        };
        if local {
            store.m[(i, 0)].or_trace(STARTPOINT);
            reachable[(i, 0)] = true;
        }
        for j in 1..ncols {
            let diag = prev[j - 1] + model.substitution_score(a[i - 1], b[j - 1]);
            let horiz = cur[j - 1] + gaps.deletion_cost(i, nrows, 1);
            let vert = prev[j] + gaps.insertion_cost(j, ncols, 1);
            let (mut val, mut bits) =
                best_of_3([(diag, DIAGONAL), (horiz, HORIZONTAL), (vert, VERTICAL)], epsilon);

            if local && val <= epsilon {
                val = 0.0;
                bits = 0;
                store.m[(i, j)].or_trace(STARTPOINT);
            }
            store.m[(i, j)].set_trace(bits);
            cur[j] = val;

            let r = (bits & DIAGONAL != 0 && reachable[(i - 1, j - 1)])
                || (bits & HORIZONTAL != 0 && reachable[(i, j - 1)])
                || (bits & VERTICAL != 0 && reachable[(i - 1, j)])
                || store.m[(i, j)].has_trace(STARTPOINT);
            reachable[(i, j)] = r;

            if local {
                if val > global_max + epsilon {
                    global_max = val;
                    max_cells.clear();
                    max_cells.push((i, j));
                } else if (val - global_max).abs() <= epsilon {
                    max_cells.push((i, j));
                }
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    let score = if local {
        if global_max <= epsilon {
            store.m[(0, 0)].set_path(PATH_NONE);
            0.0
        } else {
            for &(i, j) in &max_cells {
                store.m[(i, j)].or_trace(ENDPOINT);
            }
            prune_unreachable(&mut store, &reachable, nrows, ncols);
            global_max
        }
    } else {
        store.m[(nrows - 1, ncols - 1)].or_trace(ENDPOINT);
        prev[ncols - 1]
    };

    Ok((score, store))
}

/// Clears trace bits pointing into cells the reachability sweep found
/// unreachable from any STARTPOINT, and demotes ENDPOINT accordingly (spec
/// §4.2.1 "Post-processing for Smith-Waterman only").
pub(crate) fn prune_unreachable(
    store: &mut TraceStore,
    reachable: &crate::matrix::Matrix<bool>,
    nrows: usize,
    ncols: usize,
) {
    for i in 0..nrows {
        for j in 0..ncols {
            let mut bits = store.m[(i, j)].trace();
            if bits & DIAGONAL != 0 && (i == 0 || j == 0 || !reachable[(i - 1, j - 1)]) {
                bits &= !DIAGONAL;
            }
            if bits & HORIZONTAL != 0 && (j == 0 || !reachable[(i, j - 1)]) {
                bits &= !HORIZONTAL;
            }
            if bits & VERTICAL != 0 && (i == 0 || !reachable[(i - 1, j)]) {
                bits &= !VERTICAL;
            }
            let keep_mask = bits | (store.m[(i, j)].trace() & (STARTPOINT | ENDPOINT));
            store.m[(i, j)].set_trace(keep_mask);
            if store.m[(i, j)].has_trace(ENDPOINT) && !reachable[(i, j)] {
                store.m[(i, j)].clear_trace_bits(ENDPOINT);
            }
        }
    }
}
