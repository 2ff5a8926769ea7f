//! Gate sequence enumeration and base-5 tags.
//!
//! A sequence `g₀ g₁ … g_{L-1}` has tag `Σ ordinal(gᵢ) · 5^(L-1-i)`, so the
//! first gate is the most significant digit. For a fixed length the tag is a
//! bijection onto `[0, 5^L)`.
//!
//! Enumeration counts tags upward and decodes each one, which visits every
//! sequence exactly once. Because tags are derived from sequence content, any
//! enumeration order would give the same tag-to-sequence mapping.
//!
//! ```
//! use qubitfsm::gate::Gate;
//! use qubitfsm::sequence::{sequences, tag, untag, BatchLen};
//!
//! let len = BatchLen::new(2).unwrap();
//! assert_eq!(sequences(len).len(), 25);
//! assert_eq!(tag(&[Gate::X, Gate::S]).unwrap(), 1 * 5 + 4);
//! assert_eq!(untag(9, len).unwrap(), vec![Gate::X, Gate::S]);
//! ```

use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::gate::{Gate, NUM_GATES};

/// Base-5 encoding of a gate sequence.
pub type Tag = u64;

/// Longest batch accepted for unrolled dispatch.
///
/// Generated code holds one dispatch row per tag, so its size grows as 5^L;
/// at L = 6 that is 15,625 rows.
pub const MAX_BATCH_LEN: usize = 6;

/// Errors from tag encoding and batch configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceError {
    /// Batch length of zero.
    EmptyBatch,
    /// Batch length above [`MAX_BATCH_LEN`].
    BatchTooLong { len: usize, max: usize },
    /// Tag not below `5^len`.
    TagOutOfRange { tag: Tag, len: usize },
    /// Sequence too long for its tag to fit in a [`Tag`].
    TagOverflow { len: usize },
}

impl core::fmt::Display for SequenceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::EmptyBatch => write!(f, "batch length must be at least 1"),
            Self::BatchTooLong { len, max } => write!(
                f,
                "batch length {} exceeds the maximum of {} ({} dispatch rows)",
                len,
                max,
                (NUM_GATES as u64).pow(*max as u32)
            ),
            Self::TagOutOfRange { tag, len } => {
                write!(f, "tag {} out of range for sequences of length {}", tag, len)
            }
            Self::TagOverflow { len } => {
                write!(f, "sequence of length {} does not fit in a 64-bit tag", len)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SequenceError {}

/// A validated batch length in `1..=MAX_BATCH_LEN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "usize", into = "usize"))]
pub struct BatchLen(u8);

impl BatchLen {
    /// Validate a batch length, failing closed above [`MAX_BATCH_LEN`].
    pub fn new(len: usize) -> Result<Self, SequenceError> {
        if len == 0 {
            return Err(SequenceError::EmptyBatch);
        }
        if len > MAX_BATCH_LEN {
            return Err(SequenceError::BatchTooLong {
                len,
                max: MAX_BATCH_LEN,
            });
        }
        Ok(Self(len as u8))
    }

    #[inline]
    pub const fn get(self) -> usize {
        self.0 as usize
    }

    /// Number of distinct sequences, `5^len`.
    #[inline]
    pub const fn tag_count(self) -> Tag {
        (NUM_GATES as Tag).pow(self.0 as u32)
    }
}

impl TryFrom<usize> for BatchLen {
    type Error = SequenceError;

    fn try_from(len: usize) -> Result<Self, SequenceError> {
        Self::new(len)
    }
}

impl From<BatchLen> for usize {
    fn from(len: BatchLen) -> usize {
        len.get()
    }
}

impl core::fmt::Display for BatchLen {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tag of a gate sequence.
///
/// Fails only when the sequence is too long for its tag to fit in 64 bits.
pub fn tag(gates: &[Gate]) -> Result<Tag, SequenceError> {
    gates.iter().try_fold(0, |acc: Tag, gate| {
        acc.checked_mul(NUM_GATES as Tag)
            .and_then(|v| v.checked_add(gate.ordinal() as Tag))
            .ok_or(SequenceError::TagOverflow { len: gates.len() })
    })
}

/// Decode a tag back into its length-`len` sequence.
pub fn untag(tag: Tag, len: BatchLen) -> Result<Vec<Gate>, SequenceError> {
    if tag >= len.tag_count() {
        return Err(SequenceError::TagOutOfRange {
            tag,
            len: len.get(),
        });
    }
    let mut gates = Vec::with_capacity(len.get());
    decode_into(tag, len.get(), &mut gates);
    Ok(gates)
}

/// Write the digits of `tag` into `out`, most significant first.
fn decode_into(mut tag: Tag, len: usize, out: &mut Vec<Gate>) {
    out.clear();
    out.resize(len, Gate::H);
    for slot in out.iter_mut().rev() {
        let digit = (tag % NUM_GATES as Tag) as usize;
        *slot = Gate::ALL[digit];
        tag /= NUM_GATES as Tag;
    }
}

/// All sequences of the given length, in tag order.
pub fn sequences(len: BatchLen) -> Sequences {
    Sequences {
        len: len.get(),
        next: 0,
        end: len.tag_count(),
    }
}

/// Iterator over every gate sequence of one length. See [`sequences`].
#[derive(Debug, Clone)]
pub struct Sequences {
    len: usize,
    next: Tag,
    end: Tag,
}

impl Iterator for Sequences {
    type Item = Vec<Gate>;

    fn next(&mut self) -> Option<Vec<Gate>> {
        if self.next >= self.end {
            return None;
        }
        let mut gates = Vec::with_capacity(self.len);
        decode_into(self.next, self.len, &mut gates);
        self.next += 1;
        Some(gates)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.end - self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Sequences {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_batch_len_bounds() {
        assert_eq!(BatchLen::new(0), Err(SequenceError::EmptyBatch));
        assert_eq!(BatchLen::new(1).unwrap().tag_count(), 5);
        assert_eq!(BatchLen::new(6).unwrap().tag_count(), 15_625);
        assert_eq!(
            BatchLen::new(7),
            Err(SequenceError::BatchTooLong { len: 7, max: 6 })
        );
        assert_eq!(BatchLen::try_from(4usize).map(usize::from), Ok(4));
        assert_eq!(BatchLen::try_from(0usize), Err(SequenceError::EmptyBatch));
    }

    #[test]
    fn test_tag_digit_weights() {
        assert_eq!(tag(&[]).unwrap(), 0);
        assert_eq!(tag(&[Gate::S]).unwrap(), 4);
        assert_eq!(tag(&[Gate::X, Gate::H]).unwrap(), 5);
        assert_eq!(tag(&[Gate::H, Gate::X]).unwrap(), 1);
        assert_eq!(tag(&[Gate::S, Gate::S, Gate::S]).unwrap(), 124);
    }

    #[test]
    fn test_tag_overflow() {
        // 5^27 < 2^64 < 5^28
        assert!(tag(&[Gate::S; 27]).is_ok());
        assert_eq!(
            tag(&[Gate::S; 28]),
            Err(SequenceError::TagOverflow { len: 28 })
        );
    }

    #[test]
    fn test_untag_out_of_range() {
        let len = BatchLen::new(3).unwrap();
        assert_eq!(
            untag(125, len),
            Err(SequenceError::TagOutOfRange { tag: 125, len: 3 })
        );
    }

    #[test]
    fn test_sequences_cover_tag_space_once() {
        for l in 1..=4 {
            let len = BatchLen::new(l).unwrap();
            let seqs: Vec<Vec<Gate>> = sequences(len).collect();
            assert_eq!(seqs.len() as Tag, len.tag_count());

            let unique: HashSet<&Vec<Gate>> = seqs.iter().collect();
            assert_eq!(unique.len(), seqs.len());

            for (position, seq) in seqs.iter().enumerate() {
                assert_eq!(seq.len(), l);
                assert_eq!(tag(seq).unwrap(), position as Tag);
                assert_eq!(&untag(position as Tag, len).unwrap(), seq);
            }
        }
    }

    #[test]
    fn test_sequences_exact_size() {
        let len = BatchLen::new(2).unwrap();
        let mut iter = sequences(len);
        assert_eq!(iter.len(), 25);
        iter.next();
        assert_eq!(iter.len(), 24);
    }
}
