//! A resumable cursor enumerating every co-optimal path in a `TraceStore`
//! exactly once (spec §4.4).
//!
//! One reference design embeds the cursor bit-by-bit in each cell's `path`
//! field; this implementation keeps the `path` field only for the
//! `DONE`/`NONE` sentinels callers may already be checking (spec §4.2.1,
//! §4.4) and otherwise holds the walk's choice-stack directly on
//! `PathGenerator` as a `Vec<Frame>`. Each `next()` still walks to the
//! deepest frame with an untried alternative, rewrites from there, and
//! redescends — just with the state living in a plain Rust `Vec` instead of
//! re-derived from packed bits on each step (see DESIGN.md).

use crate::error::Result;
use crate::path_counter::{self, Count};
use crate::sequence::Strand;
use crate::trace::{Aux, TraceStore, DIAGONAL, ENDPOINT, HORIZONTAL, PATH_DONE, STARTPOINT, VERTICAL};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    M,
    Ix,
    Iy,
}

type Pos = (usize, usize);

struct Frame {
    pos: Pos,
    options: Vec<(Pos, State)>,
    chosen: usize,
}

/// A lazily-walked enumerator over every optimal alignment path recorded in
/// a `TraceStore`. Owns the store exclusively (spec §3 ownership invariant).
pub struct PathGenerator {
    store: TraceStore,
    local: bool,
    strand: Strand,
    roots: Vec<(Pos, State)>,
    root_idx: usize,
    stack: Vec<Frame>,
    done: bool,
    length: Option<Count>,
}

impl PathGenerator {
    pub fn new(store: TraceStore, local: bool, strand: Strand) -> Self {
        let roots = compute_roots(&store, local);
        let done = roots.is_empty();
        PathGenerator {
            store,
            local,
            strand,
            roots,
            root_idx: 0,
            stack: Vec::new(),
            done,
            length: None,
        }
    }

    /// Number of remaining co-optimal paths (computed once and cached; spec
    /// §4.4 / §6).
    pub fn length(&mut self) -> Result<Count> {
        if let Some(n) = self.length {
            return Ok(n);
        }
        let n = path_counter::count(&self.store, self.local)?;
        self.length = Some(n);
        Ok(n)
    }

    /// Rewinds the cursor so iteration restarts from the first path.
    pub fn reset(&mut self) {
        self.root_idx = 0;
        self.stack.clear();
        self.done = self.roots.is_empty();
    }

    fn options_for(&self, pos: Pos, state: State) -> Vec<(Pos, State)> {
        let (i, j) = pos;
        match state {
            State::M => {
                let cell = self.store.m[(i, j)];
                if cell.has_trace(STARTPOINT) {
                    return Vec::new();
                }
                let bits = cell.trace();
                match &self.store.aux {
                    Aux::None => {
                        let mut v = Vec::with_capacity(3);
                        if bits & DIAGONAL != 0 {
                            v.push(((i - 1, j - 1), State::M));
                        }
                        if bits & VERTICAL != 0 {
                            v.push(((i - 1, j), State::M));
                        }
                        if bits & HORIZONTAL != 0 {
                            v.push(((i, j - 1), State::M));
                        }
                        v
                    }
                    Aux::Gotoh { .. } | Aux::WatermanSmithBeyer(_) => {
                        let mut v = Vec::with_capacity(3);
                        if bits & crate::trace::M_MATRIX != 0 {
                            v.push(((i - 1, j - 1), State::M));
                        }
                        if bits & crate::trace::IX_MATRIX != 0 {
                            v.push(((i - 1, j - 1), State::Ix));
                        }
                        if bits & crate::trace::IY_MATRIX != 0 {
                            v.push(((i - 1, j - 1), State::Iy));
                        }
                        v
                    }
                }
            }
            State::Ix => match &self.store.aux {
                Aux::Gotoh { ix, .. } => {
                    let bits = ix[(i, j)];
                    let mut v = Vec::with_capacity(3);
                    if bits & crate::trace::M_MATRIX != 0 {
                        v.push(((i - 1, j), State::M));
                    }
                    if bits & crate::trace::IX_MATRIX != 0 {
                        v.push(((i - 1, j), State::Ix));
                    }
                    if bits & crate::trace::IY_MATRIX != 0 {
                        v.push(((i - 1, j), State::Iy));
                    }
                    v
                }
                Aux::WatermanSmithBeyer(grid) => {
                    let gl = &grid[(i, j)];
                    let mut v = Vec::with_capacity(gl.m_to_ix.len() + gl.iy_to_ix.len());
                    for &k in &gl.m_to_ix {
                        v.push(((i - k as usize, j), State::M));
                    }
                    for &k in &gl.iy_to_ix {
                        v.push(((i - k as usize, j), State::Iy));
                    }
                    v
                }
                Aux::None => Vec::new(),
            },
            State::Iy => match &self.store.aux {
                Aux::Gotoh { iy, .. } => {
                    let bits = iy[(i, j)];
                    let mut v = Vec::with_capacity(3);
                    if bits & crate::trace::M_MATRIX != 0 {
                        v.push(((i, j - 1), State::M));
                    }
                    if bits & crate::trace::IX_MATRIX != 0 {
                        v.push(((i, j - 1), State::Ix));
                    }
                    if bits & crate::trace::IY_MATRIX != 0 {
                        v.push(((i, j - 1), State::Iy));
                    }
                    v
                }
                Aux::WatermanSmithBeyer(grid) => {
                    let gl = &grid[(i, j)];
                    let mut v = Vec::with_capacity(gl.m_to_iy.len() + gl.ix_to_iy.len());
                    for &k in &gl.m_to_iy {
                        v.push(((i, j - k as usize), State::M));
                    }
                    for &k in &gl.ix_to_iy {
                        v.push(((i, j - k as usize), State::Ix));
                    }
                    v
                }
                Aux::None => Vec::new(),
            },
        }
    }

    fn descend_from(&mut self, pos: Pos, state: State) {
        let mut cur_pos = pos;
        let mut cur_state = state;
        loop {
            let options = self.options_for(cur_pos, cur_state);
            if options.is_empty() {
                self.stack.push(Frame { pos: cur_pos, options, chosen: 0 });
                return;
            }
            let (next_pos, next_state) = options[0];
            self.stack.push(Frame { pos: cur_pos, options, chosen: 0 });
            cur_pos = next_pos;
            cur_state = next_state;
        }
    }

    fn materialize(&self) -> (Vec<usize>, Vec<usize>) {
        let mut positions: Vec<Pos> = self.stack.iter().map(|f| f.pos).collect();
        positions.reverse();
        let nb = self.store.ncols - 1;

        #[derive(PartialEq, Clone, Copy)]
        enum Dir {
            Diag,
            Horiz,
            Vert,
        }

        let mut coords = vec![positions[0]];
        let mut last: Option<Dir> = None;
        for w in positions.windows(2) {
            let (pi, pj) = w[0];
            let (ni, nj) = w[1];
            let dir = if ni > pi && nj > pj {
                Dir::Diag
            } else if nj > pj {
                Dir::Horiz
            } else {
                Dir::Vert
            };
            if Some(dir) != last {
                coords.push(w[0]);
                last = Some(dir);
            }
        }
        coords.push(*positions.last().unwrap());
        coords.dedup();

        let row_a: Vec<usize> = coords.iter().map(|&(i, _)| i).collect();
        let row_b: Vec<usize> = coords
            .iter()
            .map(|&(_, j)| if self.strand.is_reverse() { nb - j } else { j })
            .collect();
        (row_a, row_b)
    }

    /// Advances to the next path, or `None` when enumeration is exhausted.
    pub fn next_path(&mut self) -> Option<(Vec<usize>, Vec<usize>)> {
        if self.done {
            return None;
        }
        loop {
            if self.stack.is_empty() {
                if self.root_idx >= self.roots.len() {
                    self.done = true;
                    self.store.m[(0, 0)].set_path(PATH_DONE);
                    return None;
                }
                let (pos, state) = self.roots[self.root_idx];
                self.descend_from(pos, state);
                return Some(self.materialize());
            }

            // Backtrack: find the deepest frame with an untried alternative.
            let mut pivot = None;
            for idx in (0..self.stack.len()).rev() {
                if self.stack[idx].chosen + 1 < self.stack[idx].options.len() {
                    pivot = Some(idx);
                    break;
                }
            }
            match pivot {
                Some(idx) => {
                    self.stack.truncate(idx + 1);
                    self.stack[idx].chosen += 1;
                    let choice = self.stack[idx].options[self.stack[idx].chosen];
                    self.descend_from(choice.0, choice.1);
                    return Some(self.materialize());
                }
                None => {
                    self.stack.clear();
                    self.root_idx += 1;
                    continue;
                }
            }
        }
    }
}

impl Iterator for PathGenerator {
    type Item = (Vec<usize>, Vec<usize>);

    fn next(&mut self) -> Option<Self::Item> {
        self.next_path()
    }
}

fn compute_roots(store: &TraceStore, local: bool) -> Vec<(Pos, State)> {
    let end = (store.nrows - 1, store.ncols - 1);
    if local {
        let mut endpoints = Vec::new();
        for i in 0..store.nrows {
            for j in 0..store.ncols {
                if store.m[(i, j)].has_trace(ENDPOINT) {
                    endpoints.push((i, j));
                }
            }
        }
        endpoints.into_iter().map(|p| (p, State::M)).collect()
    } else {
        match &store.aux {
            Aux::None => vec![(end, State::M)],
            Aux::Gotoh { ix, iy } => {
                let mut roots = Vec::new();
                if store.m[end].has_trace(ENDPOINT) {
                    roots.push((end, State::M));
                }
                if ix[end] & ENDPOINT != 0 {
                    roots.push((end, State::Ix));
                }
                if iy[end] & ENDPOINT != 0 {
                    roots.push((end, State::Iy));
                }
                roots
            }
            Aux::WatermanSmithBeyer(grid) => {
                let mut roots = Vec::new();
                if store.m[end].trace() != 0 || store.m[end].has_trace(STARTPOINT) {
                    roots.push((end, State::M));
                }
                let gl = &grid[end];
                if !gl.m_to_ix.is_empty() || !gl.iy_to_ix.is_empty() {
                    roots.push((end, State::Ix));
                }
                if !gl.m_to_iy.is_empty() || !gl.ix_to_iy.is_empty() {
                    roots.push((end, State::Iy));
                }
                roots
            }
        }
    }
}
