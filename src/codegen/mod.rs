//! Code specialization: render the automaton as a standalone Rust program.
//!
//! The generated program bakes the state and transition tables into static
//! arrays, reads a gate file named on its command line, runs the automaton
//! from the configured initial state and prints the answer and timing lines
//! understood by [`crate::protocol`]. Only the simulation loop is timed.
//!
//! Two dispatch strategies are available:
//!
//! - [`Strategy::Stepped`] looks up one transition per gate.
//! - [`Strategy::Unrolled`] precomputes, for every batch of `L` gates, the
//!   final state reached from each of the 48 states, so `L` gates cost one
//!   lookup. Inputs whose length is not a multiple of `L` finish with stepped
//!   lookups.
//!
//! Either strategy can also split long inputs across threads
//! ([`SpecializerConfig::with_threads`]). Each chunk after the first computes
//! where it sends every one of the 48 states, and the chunk maps are applied
//! in input order, so the result is identical to a sequential run.
//!
//! Rendering is a pure function of its inputs: equal automata and equal
//! configurations always produce byte-identical source.
//!
//! # Example
//!
//! ```
//! use qubitfsm::codegen::{specialize, SpecializerConfig};
//! use qubitfsm::Automaton;
//!
//! let automaton = Automaton::canonical().unwrap();
//! let source = specialize(&automaton, &SpecializerConfig::unrolled(2).unwrap());
//! assert!(source.contains("const BATCH_LEN: usize = 2;"));
//! assert!(source.contains("fn main()"));
//! ```

mod config;
mod render;

pub use config::{SpecializerConfig, Strategy, DEFAULT_PARALLEL_MIN_GATES};

use alloc::string::String;

use crate::automaton::Automaton;

/// Render the simulator program for `automaton`.
pub fn specialize(automaton: &Automaton, config: &SpecializerConfig) -> String {
    let mut out = String::with_capacity(match config.strategy {
        Strategy::Stepped => 8 * 1024,
        Strategy::Unrolled(len) => 8 * 1024 + 160 * len.tag_count() as usize,
    });
    // fmt::Write into a String never fails
    let _ = render::program(&mut out, automaton, config);
    out
}
