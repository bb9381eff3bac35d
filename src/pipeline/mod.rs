//! Report loop, acceptance policy and the collected results.
//!
//! Reports are processed strictly in the order given: every accepted
//! alignment constrains the start-points later reports may claim, so the
//! loop is sequential and stops early once the configured number of
//! alignments has been collected. Reports that cannot be resolved are
//! skipped with a diagnostic and recorded in the outcome; they never abort
//! the run.

use tracing::{debug, warn};

use crate::scan::{BackwardScanner, EndpointReport, ScanResolution};
use crate::scoring::{Codon, Score, SimilarityModel};
use crate::store::SequenceStore;

/// One fully reconstructed alignment.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct AcceptedAlignment {
    /// Offset of the first aligned codon in the main sequence.
    pub start_main: u64,
    /// Offset of the first aligned codon in the match sequence.
    pub start_match: u64,
    /// Offset of the last aligned codon in the main sequence.
    pub end_main: u64,
    /// Offset of the last aligned codon in the match sequence.
    pub end_match: u64,
    /// Score the alignment was reported and reconstructed with.
    pub score: Score,
    /// Main-side codons of the alignment, gaps included.
    pub aligned_main: Vec<Codon>,
    /// Match-side codons of the alignment, gaps included.
    pub aligned_match: Vec<Codon>,
}

impl AcceptedAlignment {
    /// Number of alignment columns, gaps included.
    pub fn len(&self) -> usize {
        self.aligned_main.len()
    }

    /// Whether the alignment holds no columns.
    pub fn is_empty(&self) -> bool {
        self.aligned_main.is_empty()
    }
}

/// Ordered collection of accepted alignments plus the separation policy.
#[derive(Debug)]
pub struct AlignmentRegistry {
    max_reports: usize,
    min_separation: u64,
    accepted: Vec<AcceptedAlignment>,
}

impl AlignmentRegistry {
    /// Storage for up to `max_reports` alignments whose start-points keep a
    /// Chebyshev distance of at least `min_separation` from each other.
    pub fn new(max_reports: usize, min_separation: u64) -> Self {
        Self {
            max_reports,
            min_separation,
            accepted: Vec::with_capacity(max_reports),
        }
    }

    /// Whether a candidate start-point is far enough from every accepted
    /// alignment's start.
    pub fn try_accept(&self, start_main: u64, start_match: u64) -> bool {
        self.accepted.iter().all(|r| {
            let spread = r
                .start_main
                .abs_diff(start_main)
                .max(r.start_match.abs_diff(start_match));
            spread >= self.min_separation
        })
    }

    /// Append an alignment to the collection.
    pub fn commit(&mut self, alignment: AcceptedAlignment) {
        debug_assert!(self.accepted.len() < self.max_reports);
        self.accepted.push(alignment);
    }

    /// Number of alignments committed so far.
    pub fn count(&self) -> usize {
        self.accepted.len()
    }

    /// Whether the configured maximum has been reached.
    pub fn is_full(&self) -> bool {
        self.accepted.len() >= self.max_reports
    }

    /// The alignments committed so far, in acceptance order.
    pub fn alignments(&self) -> &[AcceptedAlignment] {
        &self.accepted
    }

    fn into_alignments(self) -> Vec<AcceptedAlignment> {
        self.accepted
    }
}

/// Why a report produced no alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum SkipReason {
    /// The scan band was exhausted without reaching the goal score.
    BandExhausted,
    /// The goal score was reached but no traceback path survived.
    NoPath,
    /// The discovered start lies too close to an accepted alignment.
    SeparationConflict,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::BandExhausted => write!(f, "no start-point with the reported score"),
            SkipReason::NoPath => write!(f, "no valid traceback path"),
            SkipReason::SeparationConflict => {
                write!(f, "start too close to an accepted alignment")
            }
        }
    }
}

/// A report that was skipped, with its position in the input list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SkippedReport {
    /// Index of the report in the input list.
    pub report: usize,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanOutcome {
    /// Accepted alignments in acceptance order.
    pub alignments: Vec<AcceptedAlignment>,
    /// How many reports were supplied.
    pub requested: usize,
    /// Reports that produced no alignment, in processing order.
    pub skipped: Vec<SkippedReport>,
}

impl ScanOutcome {
    /// Number of alignments accepted.
    pub fn accepted_count(&self) -> usize {
        self.alignments.len()
    }
}

/// Tuning for one run of the report loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanParams {
    /// Stop once this many alignments have been accepted.
    pub max_reports: usize,
    /// Minimum Chebyshev distance between accepted start-points.
    pub min_separation: u64,
    /// Longest validation marker embedded in the sequences; widens the scan
    /// band when it exceeds the match limit.
    pub longest_marker: usize,
}

impl ScanParams {
    /// Parameters with no validation-marker widening.
    pub fn new(max_reports: usize, min_separation: u64) -> Self {
        Self {
            max_reports,
            min_separation,
            longest_marker: 0,
        }
    }

    /// Override the longest validation marker length.
    pub fn with_longest_marker(mut self, longest_marker: usize) -> Self {
        self.longest_marker = longest_marker;
        self
    }
}

/// Drives the scan, separation check and traceback for a report list.
#[derive(Debug)]
pub struct ScanOrchestrator<'a, S> {
    scanner: BackwardScanner<'a, S>,
    params: ScanParams,
}

impl<'a, S: SequenceStore> ScanOrchestrator<'a, S> {
    /// Wire the scanner up to a model and store.
    pub fn new(model: &'a SimilarityModel, store: &'a S, params: ScanParams) -> Self {
        Self {
            scanner: BackwardScanner::new(model, store, params.longest_marker),
            params,
        }
    }

    /// Process `reports` in order until the list is exhausted or
    /// `max_reports` alignments have been accepted.
    pub fn run(&self, reports: &[EndpointReport]) -> ScanOutcome {
        let mut registry = AlignmentRegistry::new(self.params.max_reports, self.params.min_separation);
        let mut skipped = Vec::new();

        for (index, report) in reports.iter().enumerate() {
            match self.scanner.scan(report, &registry) {
                ScanResolution::Accepted(alignment) => {
                    debug!(
                        report = index,
                        score = alignment.score,
                        start_main = alignment.start_main,
                        start_match = alignment.start_match,
                        "alignment accepted"
                    );
                    registry.commit(alignment);
                }
                ScanResolution::SeparationConflict => {
                    debug!(report = index, "start too close to an accepted alignment, report discarded");
                    skipped.push(SkippedReport {
                        report: index,
                        reason: SkipReason::SeparationConflict,
                    });
                }
                ScanResolution::NoPath => {
                    warn!(report = index, "no traceback path, report discarded");
                    skipped.push(SkippedReport {
                        report: index,
                        reason: SkipReason::NoPath,
                    });
                }
                ScanResolution::BandExhausted => {
                    warn!(report = index, "could not find sequence");
                    skipped.push(SkippedReport {
                        report: index,
                        reason: SkipReason::BandExhausted,
                    });
                }
            }
            if registry.is_full() {
                break;
            }
        }

        ScanOutcome {
            alignments: registry.into_alignments(),
            requested: reports.len(),
            skipped,
        }
    }
}
