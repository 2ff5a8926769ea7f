//! The five-gate single-qubit alphabet.
//!
//! Gate ordinals are shared by every table in the crate: they index the
//! transition table columns and are the digits of a sequence [`Tag`].
//!
//! [`Tag`]: crate::sequence::Tag

use alloc::string::String;
use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of gates in the alphabet.
pub const NUM_GATES: usize = 5;

/// Gate symbols in ordinal order.
pub const GATE_SYMBOLS: &[u8; NUM_GATES] = b"HXYZS";

/// A single-qubit gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum Gate {
    /// Hadamard.
    H = 0,
    /// Pauli X (bit flip).
    X = 1,
    /// Pauli Y.
    Y = 2,
    /// Pauli Z (phase flip).
    Z = 3,
    /// Phase gate, a quarter turn about Z.
    S = 4,
}

impl Gate {
    /// All gates in ordinal order.
    pub const ALL: [Gate; NUM_GATES] = [Gate::H, Gate::X, Gate::Y, Gate::Z, Gate::S];

    /// Column index in the transition table and digit value in a tag.
    #[inline]
    pub const fn ordinal(self) -> usize {
        self as usize
    }

    /// Inverse of [`Gate::ordinal`].
    #[inline]
    pub const fn from_ordinal(ordinal: usize) -> Option<Gate> {
        if ordinal < NUM_GATES {
            Some(Self::ALL[ordinal])
        } else {
            None
        }
    }

    /// The byte used for this gate in input files.
    #[inline]
    pub const fn symbol(self) -> u8 {
        GATE_SYMBOLS[self as usize]
    }

    /// Parse a gate from its input-file byte.
    #[inline]
    pub const fn from_symbol(byte: u8) -> Option<Gate> {
        match byte {
            b'H' => Some(Gate::H),
            b'X' => Some(Gate::X),
            b'Y' => Some(Gate::Y),
            b'Z' => Some(Gate::Z),
            b'S' => Some(Gate::S),
            _ => None,
        }
    }
}

impl core::fmt::Display for Gate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.symbol() as char)
    }
}

/// A byte outside the gate alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidGate {
    /// Offset of the byte within the parsed input.
    pub offset: usize,
    /// The offending byte.
    pub byte: u8,
}

impl core::fmt::Display for InvalidGate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "invalid gate byte 0x{:02x} at offset {}",
            self.byte, self.offset
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for InvalidGate {}

/// Parse a string of gate symbols such as `"HXYZS"`.
pub fn parse_gates(symbols: &[u8]) -> Result<Vec<Gate>, InvalidGate> {
    symbols
        .iter()
        .enumerate()
        .map(|(offset, &byte)| Gate::from_symbol(byte).ok_or(InvalidGate { offset, byte }))
        .collect()
}

/// Render gates back to their symbol string.
pub fn format_gates(gates: &[Gate]) -> String {
    gates.iter().map(|g| g.symbol() as char).collect()
}
