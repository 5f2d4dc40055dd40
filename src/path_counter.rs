//! Counts the number of distinct co-optimal paths recorded in a
//! `TraceStore`, with saturating arithmetic (spec §4.3).

use crate::error::{AlignError, Result};
use crate::matrix::Matrix;
use crate::trace::{Aux, TraceStore, ENDPOINT, IX_MATRIX, IY_MATRIX, M_MATRIX, STARTPOINT};

/// The platform "signed word" this engine saturates against (spec §4.3,
/// §9 "Saturating arithmetic").
pub type Count = i64;

/// Pre-checked saturating add (spec §9: "detect overflow before it
/// happens"). `None` signals overflow.
fn sat_add(a: Count, b: Count) -> Option<Count> {
    if a > Count::MAX - b {
        None
    } else {
        Some(a + b)
    }
}

fn sat_sum(values: impl IntoIterator<Item = Count>) -> Result<Count> {
    let mut total: Count = 0;
    for v in values {
        total = sat_add(total, v).ok_or(AlignError::ArithmeticOverflow)?;
    }
    Ok(total)
}

/// Total number of distinct co-optimal paths through `store`.
pub fn count(store: &TraceStore, local: bool) -> Result<Count> {
    match &store.aux {
        Aux::None => count_single_state(store, local),
        Aux::Gotoh { ix, iy } => count_three_state(store, ix, iy, local),
        Aux::WatermanSmithBeyer(lengths) => count_wsb(store, lengths, local),
    }
}

fn count_single_state(store: &TraceStore, local: bool) -> Result<Count> {
    let (nrows, ncols) = (store.nrows, store.ncols);
    let mut counts = Matrix::filled(0 as Count, nrows, ncols)?;

    for i in 0..nrows {
        for j in 0..ncols {
            let cell = store.m[(i, j)];
            if cell.has_trace(STARTPOINT) {
                counts[(i, j)] = 1;
                continue;
            }
            let bits = cell.trace();
            let mut parts = Vec::with_capacity(3);
            if bits & crate::trace::DIAGONAL != 0 {
                parts.push(counts[(i - 1, j - 1)]);
            }
            if bits & crate::trace::HORIZONTAL != 0 {
                parts.push(counts[(i, j - 1)]);
            }
            if bits & crate::trace::VERTICAL != 0 {
                parts.push(counts[(i - 1, j)]);
            }
            counts[(i, j)] = sat_sum(parts)?;
        }
    }

    if local {
        let mut endpoints = Vec::new();
        for i in 0..nrows {
            for j in 0..ncols {
                if store.m[(i, j)].has_trace(ENDPOINT) {
                    endpoints.push(counts[(i, j)]);
                }
            }
        }
        sat_sum(endpoints)
    } else {
        Ok(counts[(nrows - 1, ncols - 1)])
    }
}

fn count_three_state(
    store: &TraceStore,
    aux_ix: &Matrix<u8>,
    aux_iy: &Matrix<u8>,
    local: bool,
) -> Result<Count> {
    let (nrows, ncols) = (store.nrows, store.ncols);
    let mut cm = Matrix::filled(0 as Count, nrows, ncols)?;
    let mut cix = Matrix::filled(0 as Count, nrows, ncols)?;
    let mut ciy = Matrix::filled(0 as Count, nrows, ncols)?;

    for i in 0..nrows {
        for j in 0..ncols {
            let cell = store.m[(i, j)];
            if cell.has_trace(STARTPOINT) {
                cm[(i, j)] = 1;
            } else if i >= 1 && j >= 1 {
                let bits = cell.trace();
                let mut parts = Vec::with_capacity(3);
                if bits & M_MATRIX != 0 {
                    parts.push(cm[(i - 1, j - 1)]);
                }
                if bits & IX_MATRIX != 0 {
                    parts.push(cix[(i - 1, j - 1)]);
                }
                if bits & IY_MATRIX != 0 {
                    parts.push(ciy[(i - 1, j - 1)]);
                }
                cm[(i, j)] = sat_sum(parts)?;
            }

            if i >= 1 {
                let bits = aux_ix[(i, j)];
                let mut parts = Vec::with_capacity(3);
                if bits & M_MATRIX != 0 {
                    parts.push(cm[(i - 1, j)]);
                }
                if bits & IX_MATRIX != 0 {
                    parts.push(cix[(i - 1, j)]);
                }
                if bits & IY_MATRIX != 0 {
                    parts.push(ciy[(i - 1, j)]);
                }
                cix[(i, j)] = sat_sum(parts)?;
            }

            if j >= 1 {
                let bits = aux_iy[(i, j)];
                let mut parts = Vec::with_capacity(3);
                if bits & M_MATRIX != 0 {
                    parts.push(cm[(i, j - 1)]);
                }
                if bits & IX_MATRIX != 0 {
                    parts.push(cix[(i, j - 1)]);
                }
                if bits & IY_MATRIX != 0 {
                    parts.push(ciy[(i, j - 1)]);
                }
                ciy[(i, j)] = sat_sum(parts)?;
            }
        }
    }

    if local {
        let mut endpoints = Vec::new();
        for i in 0..nrows {
            for j in 0..ncols {
                if store.m[(i, j)].has_trace(ENDPOINT) {
                    endpoints.push(cm[(i, j)]);
                }
            }
        }
        sat_sum(endpoints)
    } else {
        let end = (nrows - 1, ncols - 1);
        let mut parts = Vec::with_capacity(3);
        if store.m[end].has_trace(ENDPOINT) {
            parts.push(cm[end]);
        }
        if aux_ix[end] & ENDPOINT != 0 {
            parts.push(cix[end]);
        }
        if aux_iy[end] & ENDPOINT != 0 {
            parts.push(ciy[end]);
        }
        sat_sum(parts)
    }
}

fn count_wsb(
    store: &TraceStore,
    lengths: &Matrix<crate::trace::GapLengths>,
    local: bool,
) -> Result<Count> {
    let (nrows, ncols) = (store.nrows, store.ncols);
    let mut cm = Matrix::filled(0 as Count, nrows, ncols)?;
    let mut cix = Matrix::filled(0 as Count, nrows, ncols)?;
    let mut ciy = Matrix::filled(0 as Count, nrows, ncols)?;

    for i in 0..nrows {
        for j in 0..ncols {
            let cell = store.m[(i, j)];
            if cell.has_trace(STARTPOINT) {
                cm[(i, j)] = 1;
            } else if i >= 1 && j >= 1 {
                let bits = cell.trace();
                let mut parts = Vec::with_capacity(3);
                if bits & M_MATRIX != 0 {
                    parts.push(cm[(i - 1, j - 1)]);
                }
                if bits & IX_MATRIX != 0 {
                    parts.push(cix[(i - 1, j - 1)]);
                }
                if bits & IY_MATRIX != 0 {
                    parts.push(ciy[(i - 1, j - 1)]);
                }
                cm[(i, j)] = sat_sum(parts)?;
            }

            let gl = &lengths[(i, j)];
            if i >= 1 {
                let mut parts = Vec::with_capacity(gl.m_to_ix.len() + gl.iy_to_ix.len());
                for &k in &gl.m_to_ix {
                    parts.push(cm[(i - k as usize, j)]);
                }
                for &k in &gl.iy_to_ix {
                    parts.push(ciy[(i - k as usize, j)]);
                }
                cix[(i, j)] = sat_sum(parts)?;
            }
            if j >= 1 {
                let mut parts = Vec::with_capacity(gl.m_to_iy.len() + gl.ix_to_iy.len());
                for &k in &gl.m_to_iy {
                    parts.push(cm[(i, j - k as usize)]);
                }
                for &k in &gl.ix_to_iy {
                    parts.push(cix[(i, j - k as usize)]);
                }
                ciy[(i, j)] = sat_sum(parts)?;
            }
        }
    }

    if local {
        let mut endpoints = Vec::new();
        for i in 0..nrows {
            for j in 0..ncols {
                if store.m[(i, j)].has_trace(ENDPOINT) {
                    endpoints.push(cm[(i, j)]);
                }
            }
        }
        sat_sum(endpoints)
    } else {
        sat_sum([
            cm[(nrows - 1, ncols - 1)],
            cix[(nrows - 1, ncols - 1)],
            ciy[(nrows - 1, ncols - 1)],
        ])
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::forward_pass::nw_sw;
    use crate::forward_pass::GapCosts;
    use crate::scoring::{GapAggregate, Mode, ScoringModel};
    use crate::sequence::Strand;

    #[test]
    fn counts_four_equivalent_insert_placements() {
        let mut model = ScoringModel::new(Mode::Global);
        model.set_match_mismatch(1.0, 0.0);
        model.set_gap_aggregate(GapAggregate::Gap, 0.0);
        let gaps = GapCosts::resolve(&model, Strand::Plus);
        let a: Vec<i32> = "AAAC".bytes().map(i32::from).collect();
        let b: Vec<i32> = "AAC".bytes().map(i32::from).collect();
        let (_s, store) = nw_sw::align(&model, &gaps, &a, &b, false).unwrap();
        assert_eq!(count(&store, false).unwrap(), 4);
    }

    #[test]
    fn local_pre_exhausted_counts_zero() {
        let mut model = ScoringModel::new(Mode::Local);
        model.set_match_mismatch(1.0, -1.0);
        model.set_gap_aggregate(GapAggregate::Gap, -1.0);
        let gaps = GapCosts::resolve(&model, Strand::Plus);
        let a: Vec<i32> = "AAA".bytes().map(i32::from).collect();
        let b: Vec<i32> = "TTT".bytes().map(i32::from).collect();
        let (_s, store) = nw_sw::align(&model, &gaps, &a, &b, true).unwrap();
        assert_eq!(count(&store, true).unwrap(), 0);
    }

    #[test]
    fn detects_saturating_overflow() {
        let mut model = ScoringModel::new(Mode::Global);
        model.set_match_mismatch(0.0, 0.0);
        model.set_wildcard(Some(0));
        model.set_gap_aggregate(GapAggregate::Gap, 0.0);
        let gaps = GapCosts::resolve(&model, Strand::Plus);
        // All-wildcard sequences: every cell ties, central binomial blow-up.
        let n = 64usize;
        let a = vec![0i32; n];
        let b = vec![0i32; n];
        let (_s, store) = nw_sw::align(&model, &gaps, &a, &b, false).unwrap();
        assert!(matches!(count(&store, false), Err(AlignError::ArithmeticOverflow)));
    }
}
