//! Backward banded scan locating the start-point of a reported alignment.
//!
//! The forward pass that discovered the end-points runs an affine-gap
//! Smith-Waterman over the whole sequence pair; this scan re-runs the same
//! recurrence from a single known end-point, walking anti-diagonals outward
//! (backward through the main sequence, forward through the match offsets)
//! until some cell's score equals the reported goal. That cell is the
//! start-point. Because the goal is known, intermediate scores are allowed
//! to go negative here, which the forward pass never produces; cells whose
//! score drops to zero or below keep no predecessor record, so a goal
//! reached through such a cell can fail reconstruction and the report is
//! then discarded.
//!
//! The search is banded: backward offsets past twice the match limit are
//! never interesting, so the predecessor matrix is a fixed square and a
//! report whose true alignment would leave the band is reported unsolvable
//! rather than approximated.

mod trace;

use self::trace::{TraceCell, TraceMatrix};

use crate::pipeline::{AcceptedAlignment, AlignmentRegistry};
use crate::scoring::{Score, SimilarityModel};
use crate::store::{SequenceId, SequenceStore};

/// One end-point and score pair reported by the forward scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EndpointReport {
    /// Offset of the alignment's last codon in the main sequence.
    pub main_end: u64,
    /// Offset of the alignment's last codon in the match sequence.
    pub match_end: u64,
    /// Score of the alignment ending there.
    pub score: Score,
}

impl EndpointReport {
    /// Bundle an end-point pair with its reported score.
    pub fn new(main_end: u64, match_end: u64, score: Score) -> Self {
        Self {
            main_end,
            match_end,
            score,
        }
    }
}

/// How a single report's scan concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanResolution {
    /// A start-point with the goal score was found and reconstructed.
    Accepted(AcceptedAlignment),
    /// The start-point found lies too close to an already accepted one.
    SeparationConflict,
    /// The goal score was reached but no valid path survived traceback.
    NoPath,
    /// The band was exhausted without reaching the goal score.
    BandExhausted,
}

/// Backward banded affine-gap scanner over a sequence store.
#[derive(Debug)]
pub struct BackwardScanner<'a, S> {
    model: &'a SimilarityModel,
    store: &'a S,
    band: usize,
}

impl<'a, S: SequenceStore> BackwardScanner<'a, S> {
    /// Build a scanner over the given model and store. `longest_marker` is
    /// the longest validation marker embedded in the generated sequences;
    /// the band is sized to twice the larger of it and the match limit.
    pub fn new(model: &'a SimilarityModel, store: &'a S, longest_marker: usize) -> Self {
        Self {
            model,
            store,
            band: 2 * model.match_limit().max(longest_marker),
        }
    }

    /// Side length of the scan band.
    pub fn band(&self) -> usize {
        self.band
    }

    /// Search backward from `report`'s end-point for a start-point whose
    /// alignment scores exactly the reported goal.
    ///
    /// The candidate start is checked against `registry` before any
    /// reconstruction work; a separation conflict abandons the report
    /// rather than searching for a weaker alternative start.
    pub fn scan(&self, report: &EndpointReport, registry: &AlignmentRegistry) -> ScanResolution {
        let ei = report.main_end;
        let ej = report.match_end;
        let goal = report.score;

        let gap_extend = self.model.gap_extend();
        let gap_first = self.model.gap_first();
        // Low enough that no reachable score loses to it, high enough that
        // subtracting a gap penalty cannot wrap.
        let floor = Score::MIN + gap_first;

        let main_end_codon = self.store.read(SequenceId::Main, ei);
        let match_end_codon = self.store.read(SequenceId::Match, ej);
        let seed = self.model.similarity(main_end_codon, match_end_codon);

        // The end-point alone may already carry the goal score.
        if seed == goal {
            if !registry.try_accept(ei, ej) {
                return ScanResolution::SeparationConflict;
            }
            return ScanResolution::Accepted(AcceptedAlignment {
                start_main: ei,
                start_match: ej,
                end_main: ei,
                end_match: ej,
                score: goal,
                aligned_main: vec![main_end_codon],
                aligned_match: vec![match_end_codon],
            });
        }

        let m = ei.max(ej) as usize;
        let mut rows = [vec![floor; m + 2], vec![floor; m + 2]];
        let mut gap_main = vec![floor; m + 1];
        let mut gap_match = vec![floor; m + 1];
        let mut matrix = TraceMatrix::new(self.band);

        rows[0][1] = seed;
        gap_main[0] = seed - gap_first;
        gap_match[0] = seed - gap_first;
        *matrix.get_mut(0, 0) = TraceCell {
            diagonal: true,
            opens_main_gap: true,
            opens_match_gap: true,
            ..TraceCell::default()
        };

        let band = self.band as u64;
        for d in 1..=ei + ej {
            // Cells on this anti-diagonal satisfy e + f == d, di >= 0,
            // dj >= 0 and both offsets inside the band.
            let e_lo = d.saturating_sub(ej).max(d.saturating_sub(band - 1));
            let e_hi = d.min(ei).min(band - 1);
            if e_lo > e_hi {
                // The window only narrows as d grows.
                break;
            }
            let cur = (d & 1) as usize;
            for e in e_lo..=e_hi {
                let f = d - e;
                let di = ei - e;
                let dj = ej - f;
                let eu = e as usize;
                let fu = f as usize;

                let main_codon = self.store.read(SequenceId::Main, di);
                let match_codon = self.store.read(SequenceId::Match, dj);
                // The diagonal predecessor lives two anti-diagonals back on
                // the same row parity, one slot over.
                let diag = self
                    .model
                    .similarity(main_codon, match_codon)
                    .saturating_add(rows[cur][fu]);
                let score = diag.max(gap_main[eu]).max(gap_match[fu]);
                rows[cur][fu + 1] = score;

                *matrix.get_mut(eu, fu) = if score > 0 {
                    TraceCell {
                        diagonal: score == diag,
                        gap_in_match: score == gap_match[fu],
                        gap_in_main: score == gap_main[eu],
                        ..TraceCell::default()
                    }
                } else {
                    // A non-positive score eliminates this path.
                    TraceCell::default()
                };

                if score == goal {
                    if !registry.try_accept(di, dj) {
                        return ScanResolution::SeparationConflict;
                    }
                    return match trace::reconstruct(&matrix, self.store, ei, ej, eu, fu) {
                        Some((aligned_main, aligned_match)) => {
                            ScanResolution::Accepted(AcceptedAlignment {
                                start_main: di,
                                start_match: dj,
                                end_main: ei,
                                end_match: ej,
                                score: goal,
                                aligned_main,
                                aligned_match,
                            })
                        }
                        None => ScanResolution::NoPath,
                    };
                }

                let opened = score.saturating_sub(gap_first);
                gap_main[eu] = gap_main[eu].saturating_sub(gap_extend).max(opened);
                gap_match[fu] = gap_match[fu].saturating_sub(gap_extend).max(opened);
                let cell = matrix.get_mut(eu, fu);
                cell.opens_main_gap = gap_main[eu] == opened;
                cell.opens_match_gap = gap_match[fu] == opened;
            }
        }

        ScanResolution::BandExhausted
    }
}
