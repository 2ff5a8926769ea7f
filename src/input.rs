//! Binary gate input files.
//!
//! Layout: an 8-byte little-endian `u64` gate count `N`, followed by `N`
//! bytes each drawn from `HXYZS`. Bytes past the declared count are ignored.

use alloc::vec::Vec;

use crate::gate::{Gate, InvalidGate};

/// Size of the count header in bytes.
pub const HEADER_LEN: usize = 8;

/// Problem decoding a gate file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    /// Fewer than [`HEADER_LEN`] bytes.
    MissingHeader { len: usize },
    /// The header declares more gates than the file holds.
    Truncated { declared: u64, available: usize },
    /// A gate byte outside the alphabet; `offset` counts from the first gate.
    InvalidGate(InvalidGate),
}

impl core::fmt::Display for InputError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::MissingHeader { len } => write!(
                f,
                "input is {} bytes, shorter than its {}-byte header",
                len, HEADER_LEN
            ),
            Self::Truncated {
                declared,
                available,
            } => write!(
                f,
                "input declares {} gates but holds {}",
                declared, available
            ),
            Self::InvalidGate(err) => write!(f, "{}", err),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for InputError {}

impl From<InvalidGate> for InputError {
    fn from(err: InvalidGate) -> Self {
        Self::InvalidGate(err)
    }
}

/// Borrow the gate bytes of a file after checking header and length.
pub fn gate_bytes(bytes: &[u8]) -> Result<&[u8], InputError> {
    let header: [u8; HEADER_LEN] = bytes
        .get(..HEADER_LEN)
        .and_then(|h| h.try_into().ok())
        .ok_or(InputError::MissingHeader { len: bytes.len() })?;
    let declared = u64::from_le_bytes(header);
    let body = &bytes[HEADER_LEN..];
    usize::try_from(declared)
        .ok()
        .and_then(|n| body.get(..n))
        .ok_or(InputError::Truncated {
            declared,
            available: body.len(),
        })
}

/// Decode a gate file into gates.
pub fn decode_gates(bytes: &[u8]) -> Result<Vec<Gate>, InputError> {
    Ok(crate::gate::parse_gates(gate_bytes(bytes)?)?)
}

/// Encode gates as a gate file.
pub fn encode_gates(gates: &[Gate]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + gates.len());
    out.extend_from_slice(&(gates.len() as u64).to_le_bytes());
    out.extend(gates.iter().map(|g| g.symbol()));
    out
}
