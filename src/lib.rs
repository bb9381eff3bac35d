//! # codonscan
//!
//! Backward scan-and-traceback engine for codon sequence alignment.
//!
//! An upstream forward scan reports where interesting local alignments of
//! two codon sequences *end* and what they score. This crate recovers the
//! alignments themselves: for each reported end-point it re-runs the
//! affine-gap Smith-Waterman recurrence backward inside a bounded band
//! until it finds the start-point whose score equals the reported goal,
//! then reconstructs the exact aligned subsequences, gap runs included,
//! from the recorded per-cell predecessors.
//!
//! The two working sequences are addressed through a storage capability
//! that may be backed by flat local arrays or by shards spread across a
//! global index space, where each element access becomes a synchronous
//! one-sided fetch from the owning shard. The scan never learns which
//! backing it is running against.
//!
//! Accepted alignments are constrained against each other: a start-point
//! closer than a configured minimum separation to any previously accepted
//! start is rejected, and the report loop stops once a maximum number of
//! alignments has been collected.
//!
//! ## Usage
//!
//! ```
//! use codonscan::{
//!     EndpointReport, LocalStore, ScanOrchestrator, ScanParams, SimilarityModel,
//!     SimilarityParams,
//! };
//!
//! let model = SimilarityModel::new(SimilarityParams::default())?;
//! let sequence = model.encode_chain("ACD");
//! let store = LocalStore::new(sequence.clone(), sequence);
//!
//! // The forward scan reported an alignment ending at (2, 2) scoring 15.
//! let reports = [EndpointReport::new(2, 2, 15)];
//! let orchestrator = ScanOrchestrator::new(&model, &store, ScanParams::new(10, 5));
//! let outcome = orchestrator.run(&reports);
//!
//! assert_eq!(outcome.accepted_count(), 1);
//! assert_eq!(outcome.alignments[0].start_main, 0);
//! assert_eq!(model.amino_chain(&outcome.alignments[0].aligned_main), "ACD");
//! # Ok::<(), codonscan::ModelError>(())
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod pipeline; // Report loop, separation policy, collected results
pub mod scan; // Backward banded scanner and traceback
pub mod scoring; // Codon alphabet and similarity model
pub mod store; // Local and sharded sequence storage

// Re-exports for convenience
pub use pipeline::{
    AcceptedAlignment, AlignmentRegistry, ScanOrchestrator, ScanOutcome, ScanParams, SkipReason,
    SkippedReport,
};
pub use scan::{BackwardScanner, EndpointReport, ScanResolution};
pub use scoring::{Codon, ModelError, Score, SimilarityModel, SimilarityParams};
pub use store::{
    InProcessTransport, LocalStore, OneSidedTransport, SequenceId, SequenceStore, ShardId,
    ShardedStore, StoreError,
};
