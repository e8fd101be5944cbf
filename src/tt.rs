//! Implements the transposition table.
//!
//! The transposition table is a fixed-capacity map from Zobrist
//! hashes to search results. A probe validates the stored hash
//! against the probed one, so that an index collision reads as a
//! miss. When the table is full, the quarter of the entries that have
//! gone unused for the longest time is evicted in one sweep, so the
//! table never grows past its capacity.
//!
//! The table is exclusively owned by one search engine and is only
//! ever touched from the search worker; no locking is involved.

use std::collections::HashMap;
use crate::basetypes::*;
use crate::moves::MoveDigest;

/// `BOUND_EXACT`, `BOUND_LOWER`, `BOUND_UPPER`, or `BOUND_NONE`.
pub type BoundType = u8;

/// The stored value is not bounded by the search window.
pub const BOUND_NONE: BoundType = 0;

/// The stored value failed high (it is a lower bound).
pub const BOUND_LOWER: BoundType = 0b10;

/// The stored value failed low (it is an upper bound).
pub const BOUND_UPPER: BoundType = 0b01;

/// The stored value is exact.
pub const BOUND_EXACT: BoundType = BOUND_UPPER | BOUND_LOWER;

/// A transposition table entry.
#[derive(Debug, Clone, Copy)]
pub struct TtEntry {
    value: Value,
    bound: BoundType,
    depth: i16,
    move_digest: MoveDigest,
    zobrist: u64,
    last_accessed: u32,
}

impl TtEntry {
    #[inline]
    pub fn value(&self) -> Value {
        self.value
    }

    #[inline]
    pub fn bound(&self) -> BoundType {
        self.bound
    }

    #[inline]
    pub fn depth(&self) -> i16 {
        self.depth
    }

    /// The digest of the best move found for the position, or `0`.
    #[inline]
    pub fn move_digest(&self) -> MoveDigest {
        self.move_digest
    }

    #[inline]
    pub fn zobrist(&self) -> u64 {
        self.zobrist
    }
}

/// The default capacity (in entries) of a transposition table.
pub const DEFAULT_TT_CAPACITY: usize = 1 << 20;

/// A fixed-capacity transposition table.
pub struct TranspositionTable {
    entries: HashMap<u64, TtEntry>,
    capacity: usize,

    // A logical clock: incremented on every access, recorded in the
    // touched entry. Eviction removes the entries with the smallest
    // recorded times.
    clock: u32,
}

impl TranspositionTable {
    /// Creates a new table with the given capacity in entries.
    pub fn new(capacity: usize) -> TranspositionTable {
        assert!(capacity >= 4);
        TranspositionTable {
            entries: HashMap::with_capacity(capacity),
            capacity,
            clock: 0,
        }
    }

    /// Probes the table.
    ///
    /// Returns the stored entry only when its recorded hash equals
    /// `zobrist` (defense against index collisions).
    pub fn probe(&mut self, zobrist: u64) -> Option<TtEntry> {
        self.clock = self.clock.wrapping_add(1);
        let clock = self.clock;
        match self.entries.get_mut(&zobrist) {
            Some(entry) if entry.zobrist == zobrist => {
                entry.last_accessed = clock;
                Some(*entry)
            }
            _ => None,
        }
    }

    /// Stores an entry, evicting the stalest quarter of the table if
    /// it is full.
    pub fn store(&mut self,
                 zobrist: u64,
                 value: Value,
                 bound: BoundType,
                 depth: i16,
                 move_digest: MoveDigest) {
        debug_assert!(value != VALUE_UNKNOWN);
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&zobrist) {
            self.evict_stale_entries();
        }
        self.clock = self.clock.wrapping_add(1);
        let entry = TtEntry {
            value,
            bound,
            depth,
            move_digest,
            zobrist,
            last_accessed: self.clock,
        };
        self.entries.insert(zobrist, entry);
    }

    /// Removes everything from the table.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.clock = 0;
    }

    /// The number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evicts the oldest 25% of the entries (by access time).
    fn evict_stale_entries(&mut self) {
        let mut times: Vec<u32> = self.entries.values().map(|e| e.last_accessed).collect();
        times.sort_unstable();
        let threshold = times[times.len() / 4];
        self.entries.retain(|_, e| e.last_accessed > threshold);
    }
}
