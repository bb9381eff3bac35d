//! Index-addressed codon sequence storage.
//!
//! The scan and traceback engines address the two working sequences through
//! the [`SequenceStore`] capability and never learn which shard owns a given
//! index. Two backings are provided: [`LocalStore`] keeps both sequences in
//! flat local arrays, while [`ShardedStore`] splits the global index range
//! evenly across shards and turns every element access into a synchronous
//! one-sided transfer against the owning shard via [`OneSidedTransport`].
//!
//! Reads and writes are synchronous: a call returns only once the owning
//! shard has supplied or absorbed the value. An out-of-range global index is
//! a contract violation by the caller and fails a hard assertion rather than
//! returning an error.

use std::sync::RwLock;

use thiserror::Error;

use crate::scoring::Codon;

/// Identifier of a shard owning one contiguous slice of the index space.
pub type ShardId = usize;

/// Which of the two working sequences an access targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum SequenceId {
    /// The main sequence.
    Main,
    /// The match sequence.
    Match,
}

/// Synchronous, index-addressed access to the two working sequences.
pub trait SequenceStore {
    /// Global codon count of a sequence.
    fn len(&self, id: SequenceId) -> u64;

    /// Fetch one codon. Blocks until the owning shard has supplied the
    /// value. Panics if `index >= len(id)`.
    fn read(&self, id: SequenceId, index: u64) -> Codon;

    /// Store one codon. Blocks until the owning shard has absorbed the
    /// value. Panics if `index >= len(id)`.
    fn write(&mut self, id: SequenceId, index: u64, value: Codon);

    /// Whether a sequence holds no codons.
    fn is_empty(&self, id: SequenceId) -> bool {
        self.len(id) == 0
    }
}

/// One-sided element transfer against the shard owning part of a sequence.
///
/// This is the transport capability the sharded backing consumes. A `get`
/// or `put` completes the transfer before returning; latency is unspecified
/// but bounded. Implementations over a real fabric live outside this crate;
/// [`InProcessTransport`] emulates a set of shards in one process.
pub trait OneSidedTransport {
    /// Read one element from `shard` at `offset` within its local buffer.
    fn get(&self, id: SequenceId, shard: ShardId, offset: u64) -> Codon;

    /// Write one element to `shard` at `offset` within its local buffer.
    fn put(&self, id: SequenceId, shard: ShardId, offset: u64, value: Codon);
}

/// Errors raised while setting up a sharded store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A sequence length does not divide evenly across the shards.
    #[error("sequence length {length} is not divisible by shard count {shards}")]
    UnevenPartition {
        /// Global codon count of the offending sequence.
        length: u64,
        /// Number of shards the store was asked to span.
        shards: usize,
    },

    /// The store was asked to span zero shards.
    #[error("shard count must be positive")]
    NoShards,
}

/// Both sequences held in flat local arrays. The single-shard backing.
#[derive(Debug, Clone)]
pub struct LocalStore {
    main: Vec<Codon>,
    matched: Vec<Codon>,
}

impl LocalStore {
    /// Wrap two local codon arrays.
    pub fn new(main: Vec<Codon>, matched: Vec<Codon>) -> Self {
        Self { main, matched }
    }

    fn seq(&self, id: SequenceId) -> &Vec<Codon> {
        match id {
            SequenceId::Main => &self.main,
            SequenceId::Match => &self.matched,
        }
    }

    fn seq_mut(&mut self, id: SequenceId) -> &mut Vec<Codon> {
        match id {
            SequenceId::Main => &mut self.main,
            SequenceId::Match => &mut self.matched,
        }
    }
}

impl SequenceStore for LocalStore {
    fn len(&self, id: SequenceId) -> u64 {
        self.seq(id).len() as u64
    }

    fn read(&self, id: SequenceId, index: u64) -> Codon {
        let seq = self.seq(id);
        assert!(
            (index as usize) < seq.len(),
            "sequence read out of range: {index} >= {}",
            seq.len()
        );
        seq[index as usize]
    }

    fn write(&mut self, id: SequenceId, index: u64, value: Codon) {
        let seq = self.seq_mut(id);
        assert!(
            (index as usize) < seq.len(),
            "sequence write out of range: {index} >= {}",
            seq.len()
        );
        seq[index as usize] = value;
    }
}

/// Layout of one sequence split evenly across the shards.
#[derive(Debug, Clone, Copy)]
struct Partition {
    length: u64,
    local_size: u64,
}

impl Partition {
    fn new(length: u64, shards: usize) -> Result<Self, StoreError> {
        if length % shards as u64 != 0 {
            return Err(StoreError::UnevenPartition { length, shards });
        }
        Ok(Self {
            length,
            local_size: length / shards as u64,
        })
    }

    /// Owning shard and local offset for a global index.
    fn locate(&self, index: u64) -> (ShardId, u64) {
        assert!(
            index < self.length,
            "sequence access out of range: {index} >= {}",
            self.length
        );
        ((index / self.local_size) as ShardId, index % self.local_size)
    }
}

/// Both sequences partitioned by contiguous index ranges across shards.
///
/// Every access resolves the owning shard from the global index and issues a
/// one-sided transfer through the transport, which is free to short-circuit
/// transfers that target memory it holds locally.
#[derive(Debug)]
pub struct ShardedStore<T> {
    main: Partition,
    matched: Partition,
    transport: T,
}

impl<T: OneSidedTransport> ShardedStore<T> {
    /// Set up the partition layout over an existing transport. Both lengths
    /// must divide evenly by `shards`.
    pub fn new(main_len: u64, match_len: u64, shards: usize, transport: T) -> Result<Self, StoreError> {
        if shards == 0 {
            return Err(StoreError::NoShards);
        }
        Ok(Self {
            main: Partition::new(main_len, shards)?,
            matched: Partition::new(match_len, shards)?,
            transport,
        })
    }

    fn partition(&self, id: SequenceId) -> &Partition {
        match id {
            SequenceId::Main => &self.main,
            SequenceId::Match => &self.matched,
        }
    }

    /// The transport this store issues transfers through.
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl ShardedStore<InProcessTransport> {
    /// Distribute two sequences across `shards` in-process shard buffers.
    pub fn in_process(
        main: Vec<Codon>,
        matched: Vec<Codon>,
        shards: usize,
    ) -> Result<Self, StoreError> {
        if shards == 0 {
            return Err(StoreError::NoShards);
        }
        let main_len = main.len() as u64;
        let match_len = matched.len() as u64;
        let transport = InProcessTransport::new(main, matched, shards)?;
        Self::new(main_len, match_len, shards, transport)
    }
}

impl<T: OneSidedTransport> SequenceStore for ShardedStore<T> {
    fn len(&self, id: SequenceId) -> u64 {
        self.partition(id).length
    }

    fn read(&self, id: SequenceId, index: u64) -> Codon {
        let (shard, offset) = self.partition(id).locate(index);
        self.transport.get(id, shard, offset)
    }

    fn write(&mut self, id: SequenceId, index: u64, value: Codon) {
        let (shard, offset) = self.partition(id).locate(index);
        self.transport.put(id, shard, offset, value);
    }
}

/// Per-shard buffers for one sequence.
#[derive(Debug)]
struct ShardBuffers {
    shards: Vec<RwLock<Vec<Codon>>>,
    local_size: u64,
}

impl ShardBuffers {
    fn split(sequence: Vec<Codon>, shards: usize) -> Result<Self, StoreError> {
        let length = sequence.len() as u64;
        if length % shards as u64 != 0 {
            return Err(StoreError::UnevenPartition { length, shards });
        }
        let local_size = length / shards as u64;
        let buffers = sequence
            .chunks(local_size.max(1) as usize)
            .map(|chunk| RwLock::new(chunk.to_vec()))
            .collect::<Vec<_>>();
        Ok(Self {
            shards: buffers,
            local_size,
        })
    }

    fn get(&self, shard: ShardId, offset: u64) -> Codon {
        assert!(offset < self.local_size, "shard offset out of range");
        let buffer = self.shards[shard].read().expect("shard lock poisoned");
        buffer[offset as usize]
    }

    fn put(&self, shard: ShardId, offset: u64, value: Codon) {
        assert!(offset < self.local_size, "shard offset out of range");
        let mut buffer = self.shards[shard].write().expect("shard lock poisoned");
        buffer[offset as usize] = value;
    }
}

/// Transport emulation keeping every shard's buffer in process memory.
///
/// Gives the sharded access path something to run against in a single
/// process; tests use it to cover the same code path a fabric-backed
/// transport would take.
#[derive(Debug)]
pub struct InProcessTransport {
    main: ShardBuffers,
    matched: ShardBuffers,
}

impl InProcessTransport {
    /// Split both sequences into `shards` equal buffers.
    pub fn new(main: Vec<Codon>, matched: Vec<Codon>, shards: usize) -> Result<Self, StoreError> {
        if shards == 0 {
            return Err(StoreError::NoShards);
        }
        Ok(Self {
            main: ShardBuffers::split(main, shards)?,
            matched: ShardBuffers::split(matched, shards)?,
        })
    }

    fn buffers(&self, id: SequenceId) -> &ShardBuffers {
        match id {
            SequenceId::Main => &self.main,
            SequenceId::Match => &self.matched,
        }
    }
}

impl OneSidedTransport for InProcessTransport {
    fn get(&self, id: SequenceId, shard: ShardId, offset: u64) -> Codon {
        self.buffers(id).get(shard, offset)
    }

    fn put(&self, id: SequenceId, shard: ShardId, offset: u64, value: Codon) {
        self.buffers(id).put(shard, offset, value)
    }
}
