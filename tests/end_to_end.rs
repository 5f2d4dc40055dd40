//! End-to-end scenarios and cross-cutting invariants run through the
//! public `Aligner` facade.

use pairwise_aligner::{AlignError, Aligner, Mode, ScoringModel, Strand};
use pairwise_aligner::scoring::{Direction, GapAggregate};

fn seq(s: &str) -> Vec<i32> {
    s.bytes().map(i32::from).collect()
}

fn linear_global(match_score: f64, mismatch: f64, gap: f64) -> Aligner {
    let mut m = ScoringModel::new(Mode::Global);
    m.set_match_mismatch(match_score, mismatch);
    m.set_gap_aggregate(GapAggregate::Gap, gap);
    Aligner::new(m)
}

fn linear_local(match_score: f64, mismatch: f64, gap: f64) -> Aligner {
    let mut m = ScoringModel::new(Mode::Local);
    m.set_match_mismatch(match_score, mismatch);
    m.set_gap_aggregate(GapAggregate::Gap, gap);
    Aligner::new(m)
}

fn affine_global(match_score: f64, mismatch: f64, open: f64, extend: f64) -> Aligner {
    let mut m = ScoringModel::new(Mode::Global);
    m.set_match_mismatch(match_score, mismatch);
    m.set_gap_aggregate(GapAggregate::OpenGap, open);
    m.set_gap_aggregate(GapAggregate::ExtendGap, extend);
    Aligner::new(m)
}

fn affine_local(match_score: f64, mismatch: f64, open: f64, extend: f64) -> Aligner {
    let mut m = ScoringModel::new(Mode::Local);
    m.set_match_mismatch(match_score, mismatch);
    m.set_gap_aggregate(GapAggregate::OpenGap, open);
    m.set_gap_aggregate(GapAggregate::ExtendGap, extend);
    Aligner::new(m)
}

// Scenario 1: AAAC/AAC, Global NW linear, 1/0/0/0 -> score 3, 4 paths.
#[test]
fn scenario_1_global_linear_four_insert_placements() {
    let mut aligner = linear_global(1.0, 0.0, 0.0);
    let a = seq("AAAC");
    let b = seq("AAC");
    let s = aligner.score(&a, &b, Strand::Plus).unwrap();
    assert_eq!(s, 3.0);
    let (s2, mut gen) = aligner.align(&a, &b, Strand::Plus).unwrap();
    assert_eq!(s2, s);
    assert_eq!(gen.length().unwrap(), 4);
    let mut n = 0;
    let mut seen = std::collections::HashSet::new();
    while let Some(p) = gen.next_path() {
        seen.insert(p);
        n += 1;
    }
    assert_eq!(n, 4);
    assert_eq!(seen.len(), 4);
}

// Scenario 2: AAAC/AAC, Local SW linear, 1/0/0/0 -> score 3, 1 path.
#[test]
fn scenario_2_local_linear_single_optimal_placement() {
    let mut aligner = linear_local(1.0, 0.0, 0.0);
    let a = seq("AAAC");
    let b = seq("AAC");
    let s = aligner.score(&a, &b, Strand::Plus).unwrap();
    assert_eq!(s, 3.0);
    let (s2, mut gen) = aligner.align(&a, &b, Strand::Plus).unwrap();
    assert_eq!(s2, 3.0);
    assert_eq!(gen.length().unwrap(), 1);
    assert!(gen.next_path().is_some());
    assert!(gen.next_path().is_none());
}

// Scenario 3: GAATTC/GAC, Global Gotoh, 2/-1/-2/-1 -> score 2, 1 path.
#[test]
fn scenario_3_global_gotoh_literal_scenario() {
    let mut aligner = affine_global(2.0, -1.0, -2.0, -1.0);
    let a = seq("GAATTC");
    let b = seq("GAC");
    let s = aligner.score(&a, &b, Strand::Plus).unwrap();
    assert_eq!(s, 2.0);
    let (s2, mut gen) = aligner.align(&a, &b, Strand::Plus).unwrap();
    assert_eq!(s2, 2.0);
    assert_eq!(gen.length().unwrap(), 1);
}

// Scenario 4: ACGT/ACGT, Local SW, 1/-1/-1/-1 -> identity, score 4, 1 path.
#[test]
fn scenario_4_local_identity() {
    let mut aligner = affine_local(1.0, -1.0, -1.0, -1.0);
    let a = seq("ACGT");
    let b = seq("ACGT");
    let (score, mut gen) = aligner.align(&a, &b, Strand::Plus).unwrap();
    assert_eq!(score, 4.0);
    assert_eq!(gen.length().unwrap(), 1);
    let (row_a, row_b) = gen.next_path().unwrap();
    assert_eq!(row_a, vec![0, 4]);
    assert_eq!(row_b, vec![0, 4]);
}

// Scenario 5: AAA/TTT, Local SW, 1/-1/-1/-1 -> score 0, pre-exhausted generator.
#[test]
fn scenario_5_local_pre_exhausted() {
    let mut aligner = affine_local(1.0, -1.0, -1.0, -1.0);
    let a = seq("AAA");
    let b = seq("TTT");
    let (score, mut gen) = aligner.align(&a, &b, Strand::Plus).unwrap();
    assert_eq!(score, 0.0);
    assert_eq!(gen.length().unwrap(), 0);
    assert!(gen.next_path().is_none());
}

// Scenario 6: ACG/AG, Global WSB with g(n) = 2+n, match/mismatch 1/0.
#[test]
fn scenario_6_wsb_user_gap_function() {
    let mut model = ScoringModel::new(Mode::Global);
    model.set_match_mismatch(1.0, 0.0);
    model.set_gap_fn(Direction::Deletion, Box::new(|_pos, k| Ok(-(2.0 + k as f64))));
    model.set_gap_fn(Direction::Insertion, Box::new(|_pos, k| Ok(-(2.0 + k as f64))));
    let mut aligner = Aligner::new(model);
    let a = seq("ACG");
    let b = seq("AG");
    let s = aligner.score(&a, &b, Strand::Plus).unwrap();
    assert_eq!(s, -1.0);
    let (s2, mut gen) = aligner.align(&a, &b, Strand::Plus).unwrap();
    assert_eq!(s2, -1.0);
    assert!(gen.length().unwrap() >= 1);
}

// Invariant 1: score(A,B,s) == align(A,B,s).0 exactly.
#[test]
fn invariant_score_align_agreement() {
    for (a, b) in [("GAATTC", "GAC"), ("ACGTACGT", "ACGTCGT"), ("AAAC", "AAC")] {
        let mut aligner = affine_global(2.0, -1.0, -3.0, -1.0);
        let av = seq(a);
        let bv = seq(b);
        let s1 = aligner.score(&av, &bv, Strand::Plus).unwrap();
        let (s2, _gen) = aligner.align(&av, &bv, Strand::Plus).unwrap();
        assert_eq!(s1, s2);
    }
}

// Invariant 2: linear-gap NW and Gotoh agree when open == extend.
#[test]
fn invariant_linear_gap_equivalence() {
    let mut nw = linear_global(1.0, -1.0, -2.0);
    let mut gotoh = affine_global(1.0, -1.0, -2.0, -2.0);
    let a = seq("ACGTAC");
    let b = seq("AGTC");
    assert_eq!(
        nw.model_mut().resolve(),
        pairwise_aligner::Algorithm::NeedlemanWunschSmithWaterman
    );
    let s1 = nw.score(&a, &b, Strand::Plus).unwrap();
    assert_eq!(gotoh.model_mut().resolve(), pairwise_aligner::Algorithm::Gotoh);
    let s2 = gotoh.score(&a, &b, Strand::Plus).unwrap();
    assert_eq!(s1, s2);
}

// Invariant 4: path-set agreement -- length() equals the count from iterating,
// and every emitted path recomputes to the optimum.
#[test]
fn invariant_path_set_agreement_and_recomputed_score() {
    let mut aligner = affine_global(2.0, -1.0, -2.0, -1.0);
    let a = seq("GAATTC");
    let b = seq("GAC");
    let (optimum, mut gen) = aligner.align(&a, &b, Strand::Plus).unwrap();
    let claimed = gen.length().unwrap();
    let mut n = 0i64;
    while let Some((row_a, row_b)) = gen.next_path() {
        n += 1;
        assert_eq!(row_a.len(), row_b.len());
        let recomputed = recompute_score(&a, &b, &row_a, &row_b, 2.0, -1.0, -2.0, -1.0);
        assert!((recomputed - optimum).abs() < 1e-6);
    }
    assert_eq!(n, claimed);
}

/// Recomputes a path's score from its run-length-encoded coordinate list,
/// assuming one substitution/gap-open model (affine, internal-only — the
/// scenarios this helper checks never touch an edge gap).
fn recompute_score(
    a: &[i32],
    b: &[i32],
    row_a: &[usize],
    row_b: &[usize],
    match_score: f64,
    mismatch: f64,
    open: f64,
    extend: f64,
) -> f64 {
    let mut total = 0.0;
    for w in row_a.windows(2).zip(row_b.windows(2)) {
        let (ai, bi) = w;
        let (da, db) = (ai[1] - ai[0], bi[1] - bi[0]);
        if da > 0 && db > 0 {
            for k in 0..da {
                let x = a[ai[0] + k];
                let y = b[bi[0] + k];
                total += if x == y { match_score } else { mismatch };
            }
        } else if da > 0 {
            total += open + extend * (da as f64 - 1.0);
        } else if db > 0 {
            total += open + extend * (db as f64 - 1.0);
        }
    }
    total
}

// Invariant 5: strand symmetry. Uses distinct left/right edge-gap costs so
// the swap-on-minus-strand logic actually has something to exercise.
#[test]
fn invariant_strand_symmetry() {
    fn asymmetric_edges() -> ScoringModel {
        let mut m = ScoringModel::new(Mode::Global);
        m.set_match_mismatch(1.0, -1.0);
        m.set_gap_aggregate(GapAggregate::InternalGap, -1.0);
        m.set_gap_aggregate(GapAggregate::LeftGap, -5.0);
        m.set_gap_aggregate(GapAggregate::RightGap, -2.0);
        m
    }

    let a = seq("ACGTAC");
    let b = seq("TACGTA");
    let mut reversed_b: Vec<i32> = b.clone();
    reversed_b.reverse();

    let mut plus_aligner = Aligner::new(asymmetric_edges());
    let s_plus = plus_aligner.score(&a, &reversed_b, Strand::Plus).unwrap();

    let mut minus_aligner = Aligner::new(asymmetric_edges());
    let s_minus = minus_aligner.score(&a, &b, Strand::Minus).unwrap();

    assert_eq!(s_plus, s_minus);
}

// Invariant 6: determinism across repeated calls and after reset.
#[test]
fn invariant_determinism_and_reset() {
    let mut aligner = affine_global(2.0, -1.0, -2.0, -1.0);
    let a = seq("GAATTC");
    let b = seq("GAC");
    let (s1, mut gen1) = aligner.align(&a, &b, Strand::Plus).unwrap();
    let first_path = gen1.next_path();

    let mut aligner2 = affine_global(2.0, -1.0, -2.0, -1.0);
    let (s2, mut gen2) = aligner2.align(&a, &b, Strand::Plus).unwrap();
    assert_eq!(s1, s2);
    assert_eq!(gen2.next_path(), first_path);

    gen1.reset();
    assert_eq!(gen1.next_path(), first_path);
}

// Invariant 7: local scores are never negative.
#[test]
fn invariant_local_non_negativity() {
    let mut aligner = affine_local(1.0, -3.0, -5.0, -5.0);
    let a = seq("AAAAA");
    let b = seq("TTTTT");
    let s = aligner.score(&a, &b, Strand::Plus).unwrap();
    assert!(s >= 0.0);
}

// Invariant 8: counter saturation reports overflow rather than wrapping.
#[test]
fn invariant_counter_saturation() {
    let mut model = ScoringModel::new(Mode::Global);
    model.set_match_mismatch(0.0, 0.0);
    model.set_wildcard(Some(0));
    model.set_gap_aggregate(GapAggregate::Gap, 0.0);
    let mut aligner = Aligner::new(model);
    let a = vec![0i32; 64];
    let b = vec![0i32; 64];
    let (_s, mut gen) = aligner.align(&a, &b, Strand::Plus).unwrap();
    assert!(matches!(gen.length(), Err(AlignError::ArithmeticOverflow)));
}

// Boundary: nA == 1 reduces to a single row; every placement of the lone
// match among the uniform-cost gap run ties (4 equivalent placements).
#[test]
fn boundary_single_row() {
    let mut aligner = linear_global(1.0, -1.0, -1.0);
    let a = seq("A");
    let b = seq("AAAA");
    let (score, mut gen) = aligner.align(&a, &b, Strand::Plus).unwrap();
    assert_eq!(score, 1.0 - 3.0);
    assert_eq!(gen.length().unwrap(), 4);
    assert!(gen.next_path().is_some());
}

// Boundary: zero-length input is rejected as BadInputShape.
#[test]
fn boundary_zero_length_rejected() {
    let mut aligner = linear_global(1.0, -1.0, -1.0);
    let a: Vec<i32> = Vec::new();
    let b = seq("A");
    assert!(matches!(
        aligner.score(&a, &b, Strand::Plus),
        Err(AlignError::BadInputShape(_))
    ));
}
