//! # qubitfsm
//!
//! Exact single-qubit simulation as a 48-state finite automaton.
//!
//! Every state reachable from |0⟩ under the gates H, X, Y, Z and S has
//! amplitudes drawn from seven values: `0`, `±1/2`, `±1/√2` and `±1`. There
//! are exactly 48 such states, so a gate sequence can be simulated with one
//! table lookup per gate, or one lookup per batch of gates, with no floating
//! point arithmetic at all.
//!
//! ## Module Organization
//!
//! - [`gate`] - the five-gate alphabet
//! - [`amplitude`], [`state`] - the exact amplitude values and state vectors
//! - [`table`], [`automaton`] - embedded tables, validation and the automaton
//! - [`sequence`], [`dispatch`] - batch tags and per-batch dispatch tables
//! - [`input`], [`protocol`] - gate files and the simulator output format
//! - [`codegen`] - renders a specialized simulator program
//! - [`score`] - timing aggregation and scoring
//! - `harness` - builds, checks and times a simulator (requires `std`)
//!
//! ## Quick Start
//!
//! ```
//! use qubitfsm::{Automaton, Gate, StateId};
//!
//! let automaton = Automaton::canonical().unwrap();
//!
//! // H|0⟩ = (|0⟩ + |1⟩)/√2
//! let state = automaton.run(StateId::INITIAL, [Gate::H]);
//! assert_eq!(state.get(), 38);
//!
//! // H is its own inverse
//! assert_eq!(automaton.run(StateId::INITIAL, [Gate::H, Gate::H]), StateId::INITIAL);
//! ```
//!
//! ## Features
//!
//! - `std` (default) - `std::error::Error` impls and the `harness` module
//! - `serde` - Serialization of gates, tables and evaluation reports
//! - `cli` - The `qubitfsm` command-line tool

// Use no_std unless std feature is enabled or we're in test mode
#![cfg_attr(not(any(test, feature = "std")), no_std)]

// When using no_std, we need to explicitly link the alloc crate
#[cfg(not(any(test, feature = "std")))]
extern crate alloc;

// When using std, re-export alloc types from std for compatibility
#[cfg(any(test, feature = "std"))]
extern crate std as alloc;

// =============================================================================
// Core modules
// =============================================================================

/// The gate alphabet.
pub mod gate;

/// Exact amplitude values.
pub mod amplitude;

/// State identifiers, state vectors and the state table.
pub mod state;

/// Embedded tables and their text formats.
pub mod table;

/// Transition table and automaton.
pub mod automaton;

// =============================================================================
// Batching
// =============================================================================

/// Batch tags and sequence enumeration.
pub mod sequence;

/// Per-batch dispatch tables.
pub mod dispatch;

// =============================================================================
// Simulator programs
// =============================================================================

/// Binary gate files.
pub mod input;

/// Simulator output lines.
pub mod protocol;

/// Simulator source generation.
pub mod codegen;

/// Timing aggregation and scoring.
pub mod score;

/// Build, verify and time simulator programs.
#[cfg(feature = "std")]
pub mod harness;

// =============================================================================
// Public re-exports
// =============================================================================

pub use amplitude::Amplitude;
pub use automaton::{Automaton, TransitionTable};
pub use codegen::{specialize, SpecializerConfig, Strategy};
pub use dispatch::{BatchDispatch, StateMap};
pub use gate::Gate;
pub use protocol::FinalState;
pub use sequence::{BatchLen, Tag};
pub use state::{StateId, StateTable, StateVector, NUM_STATES};
pub use table::TableError;
