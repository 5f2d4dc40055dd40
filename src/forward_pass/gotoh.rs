//! Gotoh affine-gap alignment: three state arrays `M`/`Ix`/`Iy` (spec
//! §4.2.2). `Ix` is the "gap in B" (insertion, vertical move) state, `Iy` the
//! "gap in A" (deletion, horizontal move) state; `M` always advances
//! diagonally, choosing which of the three states fed its predecessor cell.

use super::GapCosts;
use crate::error::Result;
use crate::matrix::Matrix;
use crate::scoring::ScoringModel;
use crate::trace::{Aux, TraceStore, ENDPOINT, IX_MATRIX, IY_MATRIX, M_MATRIX, STARTPOINT};

const NEG_INF: f64 = f64::NEG_INFINITY;

fn best3(values: [(f64, u8); 3], epsilon: f64) -> (f64, u8) {
    super::best_of_3(values, epsilon)
}

pub fn score(model: &ScoringModel, gaps: &GapCosts, a: &[i32], b: &[i32], local: bool) -> Result<f64> {
    let nrows = a.len() + 1;
    let ncols = b.len() + 1;
    let epsilon = model.epsilon;

    let mut prev_m = vec![NEG_INF; ncols];
    let mut prev_ix = vec![NEG_INF; ncols];
    let mut prev_iy = vec![NEG_INF; ncols];
    prev_m[0] = 0.0;
    for j in 1..ncols {
        prev_iy[j] = if j == 1 {
            prev_m[0] + gaps.deletion_open(0, nrows)
        } else {
            prev_iy[j - 1] + gaps.deletion_extend(0, nrows)
        };
    }

    let mut cur_m = vec![NEG_INF; ncols];
    let mut cur_ix = vec![NEG_INF; ncols];
    let mut cur_iy = vec![NEG_INF; ncols];
    let mut global_max = f64::NEG_INFINITY;

    for i in 1..nrows {
        cur_m[0] = NEG_INF;
        cur_iy[0] = NEG_INF;
        cur_ix[0] = if i == 1 {
            prev_m[0] + gaps.insertion_open(0, ncols)
        } else {
            prev_ix[0] + gaps.insertion_extend(0, ncols)
        };

        for j in 1..ncols {
            let m_val = {
                let (mut v, _) = best3(
                    [
                        (prev_m[j - 1], M_MATRIX),
                        (prev_ix[j - 1], IX_MATRIX),
                        (prev_iy[j - 1], IY_MATRIX),
                    ],
                    epsilon,
                );
                v += model.substitution_score(a[i - 1], b[j - 1]);
                if local {
                    v = v.max(0.0);
                    if v > global_max {
                        global_max = v;
                    }
                }
                v
            };
            let ix_val = {
                let (v, _) = best3(
                    [
                        (prev_m[j] + gaps.insertion_open(j, ncols), M_MATRIX),
                        (prev_ix[j] + gaps.insertion_extend(j, ncols), IX_MATRIX),
                        (prev_iy[j] + gaps.insertion_open(j, ncols), IY_MATRIX),
                    ],
                    epsilon,
                );
                v
            };
            let iy_val = {
                let (v, _) = best3(
                    [
                        (cur_m[j - 1] + gaps.deletion_open(i, nrows), M_MATRIX),
                        (cur_ix[j - 1] + gaps.deletion_open(i, nrows), IX_MATRIX),
                        (cur_iy[j - 1] + gaps.deletion_extend(i, nrows), IY_MATRIX),
                    ],
                    epsilon,
                );
                v
            };
            cur_m[j] = m_val;
            cur_ix[j] = ix_val;
            cur_iy[j] = iy_val;
        }
        std::mem::swap(&mut prev_m, &mut cur_m);
        std::mem::swap(&mut prev_ix, &mut cur_ix);
        std::mem::swap(&mut prev_iy, &mut cur_iy);
    }

    if local {
        Ok(global_max.max(0.0))
    } else {
        Ok(prev_m[ncols - 1].max(prev_ix[ncols - 1]).max(prev_iy[ncols - 1]))
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

    let ix_aux = Matrix::filled(0u8, nrows, ncols)?;
    let iy_aux = Matrix::filled(0u8, nrows, ncols)?;
    let mut store = TraceStore::new(nrows, ncols, Aux::Gotoh { ix: ix_aux, iy: iy_aux })?;

    let mut reach_m = Matrix::filled(false, nrows, ncols)?;
    let mut reach_ix = Matrix::filled(false, nrows, ncols)?;
    let mut reach_iy = Matrix::filled(false, nrows, ncols)?;

    let mut prev_m = vec![NEG_INF; ncols];
    let mut prev_ix = vec![NEG_INF; ncols];
    let mut prev_iy = vec![NEG_INF; ncols];
    prev_m[0] = 0.0;
    store.m[(0, 0)].or_trace(STARTPOINT);
    reach_m[(0, 0)] = true;
    for j in 1..ncols {
        prev_iy[j] = if j == 1 {
            prev_m[0] + gaps.deletion_open(0, nrows)
        } else {
            prev_iy[j - 1] + gaps.deletion_extend(0, nrows)
        };
        let flag = if j == 1 { M_MATRIX } else { IY_MATRIX };
        if let Aux::Gotoh { iy, .. } = &mut store.aux {
            iy[(0, j)] = flag;
        }
        reach_iy[(0, j)] = if j == 1 { reach_m[(0, 0)] } else { reach_iy[(0, j - 1)] };
    }

    let mut cur_m = vec![NEG_INF; ncols];
    let mut cur_ix = vec![NEG_INF; ncols];
    let mut cur_iy = vec![NEG_INF; ncols];
    let mut global_max = f64::NEG_INFINITY;
    let mut max_cells: Vec<(usize, usize)> = Vec::new();

    for i in 1..nrows {
        cur_m[0] = NEG_INF;
        cur_iy[0] = NEG_INF;
        cur_ix[0] = if i == 1 {
            prev_m[0] + gaps.insertion_open(0, ncols)
        } else {
            prev_ix[0] + gaps.insertion_extend(0, ncols)
        };
        let flag = if i == 1 { M_MATRIX } else { IX_MATRIX };
        if let Aux::Gotoh { ix, .. } = &mut store.aux {
            ix[(i, 0)] = flag;
        }
        reach_ix[(i, 0)] = if i == 1 { reach_m[(0, 0)] } else { reach_ix[(i - 1, 0)] };

        for j in 1..ncols {
            let (mut m_raw, m_bits) = best3(
                [
                    (prev_m[j - 1], M_MATRIX),
                    (prev_ix[j - 1], IX_MATRIX),
                    (prev_iy[j - 1], IY_MATRIX),
                ],
                epsilon,
            );
            m_raw += model.substitution_score(a[i - 1], b[j - 1]);

            let mut m_bits = m_bits;
            let mut m_val = m_raw;
            if local && m_val <= epsilon {
                m_val = 0.0;
                m_bits = 0;
                store.m[(i, j)].or_trace(STARTPOINT);
            }
            store.m[(i, j)].set_trace(m_bits);
            let m_reach = (m_bits & M_MATRIX != 0 && reach_m[(i - 1, j - 1)])
                || (m_bits & IX_MATRIX != 0 && reach_ix[(i - 1, j - 1)])
                || (m_bits & IY_MATRIX != 0 && reach_iy[(i - 1, j - 1)])
                || store.m[(i, j)].has_trace(STARTPOINT);
            reach_m[(i, j)] = m_reach;

            if local {
                if m_val > global_max + epsilon {
                    global_max = m_val;
                    max_cells.clear();
                    max_cells.push((i, j));
                } else if (m_val - global_max).abs() <= epsilon {
                    max_cells.push((i, j));
                }
            }

            let (ix_val, ix_bits) = best3(
                [
                    (prev_m[j] + gaps.insertion_open(j, ncols), M_MATRIX),
                    (prev_ix[j] + gaps.insertion_extend(j, ncols), IX_MATRIX),
                    (prev_iy[j] + gaps.insertion_open(j, ncols), IY_MATRIX),
                ],
                epsilon,
            );
            if let Aux::Gotoh { ix, .. } = &mut store.aux {
                ix[(i, j)] = ix_bits;
            }
            reach_ix[(i, j)] = (ix_bits & M_MATRIX != 0 && reach_m[(i - 1, j)])
                || (ix_bits & IX_MATRIX != 0 && reach_ix[(i - 1, j)])
                || (ix_bits & IY_MATRIX != 0 && reach_iy[(i - 1, j)]);

            let (iy_val, iy_bits) = best3(
                [
                    (cur_m[j - 1] + gaps.deletion_open(i, nrows), M_MATRIX),
                    (cur_ix[j - 1] + gaps.deletion_open(i, nrows), IX_MATRIX),
                    (cur_iy[j - 1] + gaps.deletion_extend(i, nrows), IY_MATRIX),
                ],
                epsilon,
            );
            if let Aux::Gotoh { iy, .. } = &mut store.aux {
                iy[(i, j)] = iy_bits;
            }
            reach_iy[(i, j)] = (iy_bits & M_MATRIX != 0 && reach_m[(i, j - 1)])
                || (iy_bits & IX_MATRIX != 0 && reach_ix[(i, j - 1)])
                || (iy_bits & IY_MATRIX != 0 && reach_iy[(i, j - 1)]);

            cur_m[j] = m_val;
            cur_ix[j] = ix_val;
            cur_iy[j] = iy_val;
        }
        std::mem::swap(&mut prev_m, &mut cur_m);
        std::mem::swap(&mut prev_ix, &mut cur_ix);
        std::mem::swap(&mut prev_iy, &mut cur_iy);
    }

    let score = if local {
        if global_max <= epsilon {
            store.m[(0, 0)].set_path(crate::trace::PATH_NONE);
            0.0
        } else {
            for &(i, j) in &max_cells {
                store.m[(i, j)].or_trace(ENDPOINT);
            }
            prune_unreachable(&mut store, &reach_m, &reach_ix, &reach_iy, nrows, ncols);
            global_max
        }
    } else {
        // A global affine alignment may optimally end in an open gap, not a
        // match/mismatch; the corner's true score is whichever of M/Ix/Iy is
        // largest there, with ENDPOINT marked on every state that ties it so
        // the path generator can root from any of them.
        let end = (nrows - 1, ncols - 1);
        let (final_max, end_bits) = best3(
            [
                (prev_m[ncols - 1], M_MATRIX),
                (prev_ix[ncols - 1], IX_MATRIX),
                (prev_iy[ncols - 1], IY_MATRIX),
            ],
            epsilon,
        );
        if end_bits & M_MATRIX != 0 {
            store.m[end].or_trace(ENDPOINT);
        }
        if let Aux::Gotoh { ix, iy } = &mut store.aux {
            if end_bits & IX_MATRIX != 0 {
                ix[end] |= ENDPOINT;
            }
            if end_bits & IY_MATRIX != 0 {
                iy[end] |= ENDPOINT;
            }
        }
        final_max
    };

    Ok((score, store))
}

fn prune_unreachable(
    store: &mut TraceStore,
    reach_m: &Matrix<bool>,
    reach_ix: &Matrix<bool>,
    reach_iy: &Matrix<bool>,
    nrows: usize,
    ncols: usize,
) {
    for i in 0..nrows {
        for j in 0..ncols {
            let mut m_bits = store.m[(i, j)].trace();
            if m_bits & M_MATRIX != 0 && (i == 0 || j == 0 || !reach_m[(i - 1, j - 1)]) {
                m_bits &= !M_MATRIX;
            }
            if m_bits & IX_MATRIX != 0 && (i == 0 || j == 0 || !reach_ix[(i - 1, j - 1)]) {
                m_bits &= !IX_MATRIX;
            }
            if m_bits & IY_MATRIX != 0 && (i == 0 || j == 0 || !reach_iy[(i - 1, j - 1)]) {
                m_bits &= !IY_MATRIX;
            }
            let keep = m_bits | (store.m[(i, j)].trace() & (STARTPOINT | ENDPOINT));
            store.m[(i, j)].set_trace(keep);
            if store.m[(i, j)].has_trace(ENDPOINT) && !reach_m[(i, j)] {
                store.m[(i, j)].clear_trace_bits(ENDPOINT);
            }

            if let Aux::Gotoh { ix, iy } = &mut store.aux {
                let mut ix_bits = ix[(i, j)];
                if ix_bits & M_MATRIX != 0 && (i == 0 || !reach_m[(i - 1, j)]) {
                    ix_bits &= !M_MATRIX;
                }
                if ix_bits & IX_MATRIX != 0 && (i == 0 || !reach_ix[(i - 1, j)]) {
                    ix_bits &= !IX_MATRIX;
                }
                if ix_bits & IY_MATRIX != 0 && (i == 0 || !reach_iy[(i - 1, j)]) {
                    ix_bits &= !IY_MATRIX;
                }
                ix[(i, j)] = ix_bits;

                let mut iy_bits = iy[(i, j)];
                if iy_bits & M_MATRIX != 0 && (j == 0 || !reach_m[(i, j - 1)]) {
                    iy_bits &= !M_MATRIX;
                }
                if iy_bits & IX_MATRIX != 0 && (j == 0 || !reach_ix[(i, j - 1)]) {
                    iy_bits &= !IX_MATRIX;
                }
                if iy_bits & IY_MATRIX != 0 && (j == 0 || !reach_iy[(i, j - 1)]) {
                    iy_bits &= !IY_MATRIX;
                }
                iy[(i, j)] = iy_bits;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scoring::{Direction, GapAggregate, Mode, OpenExtend, Position};
    use crate::sequence::Strand;

    fn affine_model(match_score: f64, mismatch: f64, open: f64, extend: f64, mode: Mode) -> ScoringModel {
        let mut m = ScoringModel::new(mode);
        m.set_match_mismatch(match_score, mismatch);
        m.set_gap_aggregate(GapAggregate::OpenGap, open);
        m.set_gap_aggregate(GapAggregate::ExtendGap, extend);
        m
    }

    #[test]
    fn global_affine_matches_literal_scenario() {
        let mut model = affine_model(2.0, -1.0, -2.0, -1.0, Mode::Global);
        let a: Vec<i32> = "GAATTC".bytes().map(i32::from).collect();
        let b: Vec<i32> = "GAC".bytes().map(i32::from).collect();
        let gaps = GapCosts::resolve(&model, Strand::Plus);
        let s = score(&model, &gaps, &a, &b, false).unwrap();
        assert_eq!(s, 2.0);
        model.resolve();
        let (s2, _store) = align(&model, &gaps, &a, &b, false).unwrap();
        assert_eq!(s2, 2.0);
    }

    #[test]
    fn linear_gap_equivalence_with_needleman_wunsch() {
        let mut model = affine_model(1.0, -1.0, -2.0, -2.0, Mode::Global);
        let a: Vec<i32> = "ACGTAC".bytes().map(i32::from).collect();
        let b: Vec<i32> = "AGTC".bytes().map(i32::from).collect();
        let gaps = GapCosts::resolve(&model, Strand::Plus);
        let gotoh_score = score(&model, &gaps, &a, &b, false).unwrap();
        let nw_score = super::super::nw_sw::score(&model, &gaps, &a, &b, false).unwrap();
        assert_eq!(gotoh_score, nw_score);
        let _ = Direction::Insertion;
        let _ = Position::Internal;
        let _ = OpenExtend::Open;
    }
}
