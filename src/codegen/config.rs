//! Configuration for code specialization.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::sequence::{BatchLen, SequenceError};
use crate::state::StateId;

/// Inputs shorter than this are never split across threads by default.
pub const DEFAULT_PARALLEL_MIN_GATES: usize = 1 << 16;

/// How the generated program dispatches gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Strategy {
    /// One transition-table lookup per gate.
    Stepped,
    /// One precomputed lookup per batch of `L` gates; leftovers are stepped.
    Unrolled(BatchLen),
}

/// Configuration for [`specialize`](super::specialize).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpecializerConfig {
    /// Dispatch strategy (default: stepped)
    pub strategy: Strategy,
    /// State the simulation starts from (default: |0⟩)
    pub initial_state: StateId,
    /// Worker threads for chunked simulation (default: 1, sequential)
    pub threads: usize,
    /// Shortest input that is split across threads (default: 65536)
    pub parallel_min_gates: usize,
}

impl Default for SpecializerConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Stepped,
            initial_state: StateId::INITIAL,
            threads: 1,
            parallel_min_gates: DEFAULT_PARALLEL_MIN_GATES,
        }
    }
}

impl SpecializerConfig {
    /// Per-gate table stepping.
    pub fn stepped() -> Self {
        Self::default()
    }

    /// Batched dispatch over `batch_len` gates.
    ///
    /// Lengths above [`MAX_BATCH_LEN`](crate::sequence::MAX_BATCH_LEN) are
    /// rejected here, before anything is rendered.
    pub fn unrolled(batch_len: usize) -> Result<Self, SequenceError> {
        Ok(Self {
            strategy: Strategy::Unrolled(BatchLen::new(batch_len)?),
            ..Self::default()
        })
    }

    /// Set the initial state.
    pub fn with_initial_state(mut self, state: StateId) -> Self {
        self.initial_state = state;
        self
    }

    /// Split long inputs into `threads` chunks whose state maps are computed
    /// concurrently. Zero is treated as one.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Set the shortest input length that is split across threads.
    pub fn with_parallel_min_gates(mut self, gates: usize) -> Self {
        self.parallel_min_gates = gates;
        self
    }

    /// Batch length of the unrolled strategy, if selected.
    pub fn batch_len(&self) -> Option<BatchLen> {
        match self.strategy {
            Strategy::Stepped => None,
            Strategy::Unrolled(len) => Some(len),
        }
    }

    /// Whether the generated `simulate` splits work across threads.
    pub fn is_parallel(&self) -> bool {
        self.threads > 1
    }
}
