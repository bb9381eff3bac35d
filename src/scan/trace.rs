//! Direction matrix and alignment reconstruction.
//!
//! While the backward scan runs, each visited cell records which
//! predecessors achieved its best score, plus flags telling whether a gap
//! run opens at the cell. Once the start-point is known, [`reconstruct`]
//! walks those records from the start offsets back toward the end-point and
//! emits the aligned codon pair for every step.

use crate::scoring::Codon;
use crate::store::{SequenceId, SequenceStore};

/// One traceback step away from the end-point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    /// Consume one codon from each sequence.
    Diagonal,
    /// Consume a main codon against a gap in the match sequence.
    GapInMatch,
    /// Consume a match codon against a gap in the main sequence.
    GapInMain,
}

/// Predecessor record for one cell of the scan band.
///
/// `diagonal`, `gap_in_match` and `gap_in_main` mark which moves achieved
/// the cell's best score; several may be set on ties. The `opens_*` flags
/// mark that the corresponding running gap score was refreshed from this
/// cell, which is how the traceback tells a gap-opening cell from a
/// gap-continuation cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct TraceCell {
    pub diagonal: bool,
    pub gap_in_match: bool,
    pub gap_in_main: bool,
    pub opens_match_gap: bool,
    pub opens_main_gap: bool,
}

impl TraceCell {
    /// Whether a gap arriving in `dir` opens at this cell rather than
    /// continuing through it.
    fn opens(self, dir: Direction) -> bool {
        match dir {
            Direction::Diagonal => true,
            Direction::GapInMatch => self.opens_match_gap,
            Direction::GapInMain => self.opens_main_gap,
        }
    }

    /// Recorded predecessors in tie-break order: diagonal first, then the
    /// gap in the match sequence, then the gap in the main sequence. The
    /// first direction that leads to a complete path wins, so this order
    /// decides which of several optimal alignments is reported.
    fn directions(self) -> Choices {
        let mut choices = Choices::default();
        if self.diagonal {
            choices.push(Direction::Diagonal);
        }
        if self.gap_in_match {
            choices.push(Direction::GapInMatch);
        }
        if self.gap_in_main {
            choices.push(Direction::GapInMain);
        }
        choices
    }
}

/// Up to three candidate directions for one frame.
#[derive(Debug, Clone, Copy, Default)]
struct Choices {
    dirs: [Option<Direction>; 3],
    len: usize,
}

impl Choices {
    fn push(&mut self, dir: Direction) {
        self.dirs[self.len] = Some(dir);
        self.len += 1;
    }

    fn forced(dir: Direction) -> Self {
        let mut choices = Self::default();
        choices.push(dir);
        choices
    }

    fn get(&self, idx: usize) -> Option<Direction> {
        if idx < self.len {
            self.dirs[idx]
        } else {
            None
        }
    }
}

/// Square predecessor matrix covering the scan band, indexed by backward
/// offsets `(e, f)` from the end-point.
#[derive(Debug)]
pub(crate) struct TraceMatrix {
    side: usize,
    cells: Vec<TraceCell>,
}

impl TraceMatrix {
    pub(crate) fn new(side: usize) -> Self {
        Self {
            side,
            cells: vec![TraceCell::default(); side * side],
        }
    }

    pub(crate) fn get(&self, e: usize, f: usize) -> TraceCell {
        self.cells[e * self.side + f]
    }

    pub(crate) fn get_mut(&mut self, e: usize, f: usize) -> &mut TraceCell {
        &mut self.cells[e * self.side + f]
    }
}

/// One suspended step of the depth-first walk.
#[derive(Debug)]
struct Frame {
    i: i64,
    j: i64,
    choices: Choices,
    next: usize,
}

/// Reconstruct the aligned codon pair for a scan that found its goal score
/// at backward offsets `(start_e, start_f)`.
///
/// The walk starts at the discovered start cell and steps toward the
/// end-point until either backward offset passes `-1`, emitting one codon
/// pair per step in forward (start-to-end) order. Arriving at a cell while
/// extending a gap forces the walk onward in the same direction unless the
/// cell's gap-opening flag says the run opens there; everywhere else the
/// recorded predecessors are tried in tie-break order and the walk
/// backtracks out of dead ends. Cells whose score went non-positive carry no
/// predecessors, so a path through them can only be completed inside a
/// forced gap run; a search that backtracks dry returns `None` and the
/// caller discards the report.
pub(crate) fn reconstruct<S: SequenceStore>(
    matrix: &TraceMatrix,
    store: &S,
    end_main: u64,
    end_match: u64,
    start_e: usize,
    start_f: usize,
) -> Option<(Vec<Codon>, Vec<Codon>)> {
    let mut stack = vec![Frame {
        i: start_e as i64,
        j: start_f as i64,
        choices: matrix.get(start_e, start_f).directions(),
        next: 0,
    }];

    loop {
        let top = stack.last_mut()?;
        let Some(dir) = top.choices.get(top.next) else {
            // Dead end. Drop the frame and resume the parent's choices.
            stack.pop();
            if stack.is_empty() {
                return None;
            }
            continue;
        };
        top.next += 1;

        let (child_i, child_j, forced) = match dir {
            Direction::Diagonal => (top.i - 1, top.j - 1, None),
            Direction::GapInMatch => (top.i - 1, top.j, Some(Direction::GapInMatch)),
            Direction::GapInMain => (top.i, top.j - 1, Some(Direction::GapInMain)),
        };

        if child_i == -1 || child_j == -1 {
            // Both offsets are exhausted at this point: the frames on the
            // stack, bottom to top, spell the alignment start to end.
            break;
        }

        let cell = matrix.get(child_i as usize, child_j as usize);
        let choices = match forced {
            Some(gap_dir) if !cell.opens(gap_dir) => Choices::forced(gap_dir),
            _ => cell.directions(),
        };
        stack.push(Frame {
            i: child_i,
            j: child_j,
            choices,
            next: 0,
        });
    }

    let mut aligned_main = Vec::with_capacity(stack.len());
    let mut aligned_match = Vec::with_capacity(stack.len());
    for frame in &stack {
        let dir = frame
            .choices
            .get(frame.next - 1)
            .unwrap_or_else(|| unreachable!("every stacked frame has a committed direction"));
        let main_pos = end_main - frame.i as u64;
        let match_pos = end_match - frame.j as u64;
        match dir {
            Direction::Diagonal => {
                aligned_main.push(store.read(SequenceId::Main, main_pos));
                aligned_match.push(store.read(SequenceId::Match, match_pos));
            }
            Direction::GapInMatch => {
                aligned_main.push(store.read(SequenceId::Main, main_pos));
                aligned_match.push(Codon::HYPHEN);
            }
            Direction::GapInMain => {
                aligned_main.push(Codon::HYPHEN);
                aligned_match.push(store.read(SequenceId::Match, match_pos));
            }
        }
    }
    Some((aligned_main, aligned_match))
}
