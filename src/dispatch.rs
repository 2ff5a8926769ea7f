//! Unrolled batch dispatch.
//!
//! For a batch length `L`, [`BatchDispatch`] precomputes the final state of
//! every `(initial state, tag)` pair by folding the automaton over the tag's
//! sequence ahead of time. A run then costs one lookup per `L` gates instead
//! of `L` lookups, at the price of `48 · 5^L` table entries.
//!
//! The code specializer emits the same table into generated programs; this
//! in-process version is what it renders from and what the equivalence tests
//! check against.
//!
//! # Chunked runs
//!
//! The effect of a gate sequence on all 48 states at once is a [`StateMap`].
//! Maps compose, so a long input can be cut into chunks whose maps are
//! computed independently and then applied in order with [`compose`].
//! [`BatchDispatch::run_parallel`] does this on scoped threads.

use alloc::vec::Vec;

use crate::automaton::TransitionTable;
use crate::gate::{Gate, NUM_GATES};
use crate::sequence::{sequences, BatchLen, Tag};
use crate::state::{StateId, NUM_STATES};

/// Final state for every initial state, indexed by initial state id.
pub type StateMap = [StateId; NUM_STATES];

/// The map that leaves every state in place.
pub fn identity() -> StateMap {
    let mut map = [StateId::INITIAL; NUM_STATES];
    for (slot, state) in map.iter_mut().zip(StateId::all()) {
        *slot = state;
    }
    map
}

/// `first` followed by `then`.
#[inline]
pub fn compose(first: &StateMap, then: &StateMap) -> StateMap {
    first.map(|state| then[state.index()])
}

/// Tag of a full batch. `chunk.len()` is at most `MAX_BATCH_LEN`, so the
/// base-5 value cannot overflow.
#[inline]
fn chunk_tag(chunk: &[Gate]) -> Tag {
    chunk
        .iter()
        .fold(0, |acc, gate| acc * NUM_GATES as Tag + gate.ordinal() as Tag)
}

/// Final states for every batch sequence, one row per tag.
///
/// The transition table the rows were built from is kept for stepping
/// leftover gates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchDispatch {
    len: BatchLen,
    transitions: TransitionTable,
    rows: Vec<StateMap>,
}

impl BatchDispatch {
    /// Precompute the dispatch rows for `len`-gate batches.
    pub fn build(transitions: &TransitionTable, len: BatchLen) -> Self {
        let rows = sequences(len)
            .map(|gates| {
                let mut row = [StateId::INITIAL; NUM_STATES];
                for (slot, initial) in row.iter_mut().zip(StateId::all()) {
                    *slot = transitions.run(initial, gates.iter().copied());
                }
                row
            })
            .collect();
        Self {
            len,
            transitions: transitions.clone(),
            rows,
        }
    }

    #[inline]
    pub fn batch_len(&self) -> BatchLen {
        self.len
    }

    #[inline]
    pub fn transitions(&self) -> &TransitionTable {
        &self.transitions
    }

    /// Final state after applying the sequence for `tag` to `initial`.
    ///
    /// # Panics
    ///
    /// Panics if `tag` is not below `5^L`.
    #[inline]
    pub fn lookup(&self, initial: StateId, tag: Tag) -> StateId {
        self.rows[tag as usize][initial.index()]
    }

    /// The dispatch row for `tag`, indexed by initial state.
    #[inline]
    pub fn row(&self, tag: Tag) -> Option<&StateMap> {
        self.rows.get(tag as usize)
    }

    /// `(tag, row)` pairs in tag order.
    pub fn rows(&self) -> impl Iterator<Item = (Tag, &StateMap)> + '_ {
        self.rows.iter().enumerate().map(|(t, row)| (t as Tag, row))
    }

    /// Run a whole gate sequence: one lookup per full batch, then single
    /// steps for the remainder.
    pub fn run(&self, initial: StateId, gates: &[Gate]) -> StateId {
        let chunks = gates.chunks_exact(self.len.get());
        let remainder = chunks.remainder();
        let state = chunks.fold(initial, |state, chunk| {
            self.rows[chunk_tag(chunk) as usize][state.index()]
        });
        self.transitions.run(state, remainder.iter().copied())
    }

    /// Effect of `gates` on every state.
    pub fn map(&self, gates: &[Gate]) -> StateMap {
        let mut chunks = gates.chunks_exact(self.len.get());
        let mut map = identity();
        for chunk in &mut chunks {
            let row = &self.rows[chunk_tag(chunk) as usize];
            for state in map.iter_mut() {
                *state = row[state.index()];
            }
        }
        for &gate in chunks.remainder() {
            for state in map.iter_mut() {
                *state = self.transitions.apply(*state, gate);
            }
        }
        map
    }

    /// [`run`](Self::run) split over up to `threads` scoped threads.
    ///
    /// The first chunk is run from `initial` on the calling thread; every
    /// later chunk computes its full [`StateMap`], and the maps are applied
    /// in input order. Chunk boundaries fall on multiples of the batch length
    /// so only the last chunk has leftover gates.
    #[cfg(feature = "std")]
    pub fn run_parallel(&self, initial: StateId, gates: &[Gate], threads: usize) -> StateId {
        let batch = self.len.get();
        let threads = threads.max(1);
        let per_thread = (gates.len() + threads - 1) / threads;
        let chunk_len = ((per_thread + batch - 1) / batch * batch).max(batch);

        let mut chunks = gates.chunks(chunk_len);
        let head = chunks.next().unwrap_or(&[]);
        std::thread::scope(|scope| {
            let tails: Vec<_> = chunks
                .map(|chunk| scope.spawn(move || self.map(chunk)))
                .collect();
            let mut state = self.run(initial, head);
            for tail in tails {
                let map = match tail.join() {
                    Ok(map) => map,
                    Err(panic) => std::panic::resume_unwind(panic),
                };
                state = map[state.index()];
            }
            state
        })
    }
}
