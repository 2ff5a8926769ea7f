//! Canonical amplitude configurations of a single qubit.
//!
//! A [`StateVector`] holds four coded amplitudes read as
//! `(Re α, Im α, Re β, Im β)`. A [`StateTable`] is the validated list of all
//! 48 vectors reachable from |0⟩, addressed by [`StateId`].

use alloc::collections::{BTreeSet, VecDeque};
use alloc::vec::Vec;
use num_complex::Complex64;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::amplitude::Amplitude;
use crate::gate::Gate;
use crate::table::{TableError, CANONICAL_STATES};

/// Number of reachable amplitude configurations.
pub const NUM_STATES: usize = 48;

/// Index of one canonical amplitude configuration, always in `[0, 47]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
pub struct StateId(u8);

impl StateId {
    /// |0⟩, i.e. α = 1, β = 0 in the canonical table.
    pub const INITIAL: StateId = StateId(33);

    #[inline]
    pub const fn new(id: u8) -> Option<StateId> {
        if (id as usize) < NUM_STATES {
            Some(StateId(id))
        } else {
            None
        }
    }

    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// All ids in ascending order.
    pub fn all() -> impl Iterator<Item = StateId> + Clone {
        (0..NUM_STATES as u8).map(StateId)
    }
}

impl TryFrom<u8> for StateId {
    type Error = &'static str;

    fn try_from(id: u8) -> Result<Self, &'static str> {
        Self::new(id).ok_or("state id outside [0, 47]")
    }
}

impl From<StateId> for u8 {
    fn from(id: StateId) -> u8 {
        id.0
    }
}

impl core::fmt::Display for StateId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Exact single-qubit amplitudes `(Re α, Im α, Re β, Im β)`.
///
/// Ordering is lexicographic over the integer codes, which is the order of
/// the canonical table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StateVector([Amplitude; 4]);

impl StateVector {
    /// |0⟩.
    pub const ZERO_KET: StateVector = StateVector([
        Amplitude::One,
        Amplitude::Zero,
        Amplitude::Zero,
        Amplitude::Zero,
    ]);

    pub const fn new(coords: [Amplitude; 4]) -> Self {
        Self(coords)
    }

    /// Decode four integer codes, failing on the first invalid one.
    pub fn from_codes(codes: [i8; 4]) -> Result<Self, i8> {
        let mut coords = [Amplitude::Zero; 4];
        for (slot, code) in coords.iter_mut().zip(codes) {
            *slot = Amplitude::from_code(code).ok_or(code)?;
        }
        Ok(Self(coords))
    }

    #[inline]
    pub const fn coords(&self) -> [Amplitude; 4] {
        self.0
    }

    pub fn codes(&self) -> [i8; 4] {
        self.0.map(Amplitude::code)
    }

    /// `|α|² + |β|²` in units of 1/4.
    pub fn norm_quarters(&self) -> u32 {
        self.0.iter().map(|a| a.square_quarters()).sum()
    }

    #[inline]
    pub fn is_normalized(&self) -> bool {
        self.norm_quarters() == 4
    }

    /// Materialize as complex amplitudes `(α, β)`.
    pub fn to_real(&self) -> (Complex64, Complex64) {
        let [ar, ai, br, bi] = self.0;
        (
            Complex64::new(ar.to_f64(), ai.to_f64()),
            Complex64::new(br.to_f64(), bi.to_f64()),
        )
    }

    /// Apply a gate exactly.
    ///
    /// Returns `None` if an intermediate amplitude leaves the seven coded
    /// values, which cannot happen for vectors in the canonical table.
    pub fn apply(&self, gate: Gate) -> Option<StateVector> {
        let [ar, ai, br, bi] = self.0;
        let coords = match gate {
            // α' = (α + β)/√2, β' = (α - β)/√2
            Gate::H => [
                ar.add_div_sqrt2(br)?,
                ai.add_div_sqrt2(bi)?,
                ar.add_div_sqrt2(-br)?,
                ai.add_div_sqrt2(-bi)?,
            ],
            Gate::X => [br, bi, ar, ai],
            // α' = -iβ, β' = iα
            Gate::Y => [bi, -br, -ai, ar],
            Gate::Z => [ar, ai, -br, -bi],
            // β' = iβ
            Gate::S => [ar, ai, -bi, br],
        };
        Some(StateVector(coords))
    }
}

impl PartialOrd for StateVector {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StateVector {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.codes().cmp(&other.codes())
    }
}

/// The validated table of all canonical state vectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTable {
    entries: [StateVector; NUM_STATES],
}

impl StateTable {
    /// Load the embedded table.
    pub fn canonical() -> Result<Self, TableError> {
        Self::from_codes(&CANONICAL_STATES)
    }

    /// Validate coded rows indexed by state id.
    ///
    /// Every code must be in the amplitude alphabet, every vector exactly
    /// normalized, and no two ids may decode to the same vector.
    pub fn from_codes(rows: &[[i8; 4]; NUM_STATES]) -> Result<Self, TableError> {
        let mut entries = [StateVector::ZERO_KET; NUM_STATES];
        for (id, (slot, codes)) in entries.iter_mut().zip(rows).enumerate() {
            let id = id as u8;
            let vector = StateVector::from_codes(*codes)
                .map_err(|code| TableError::InvalidCode { id, code })?;
            if !vector.is_normalized() {
                return Err(TableError::NotNormalized {
                    id,
                    norm_quarters: vector.norm_quarters(),
                });
            }
            *slot = vector;
        }

        for first in 0..NUM_STATES {
            for second in first + 1..NUM_STATES {
                if entries[first] == entries[second] {
                    return Err(TableError::DuplicateState {
                        first: first as u8,
                        second: second as u8,
                    });
                }
            }
        }

        Ok(Self { entries })
    }

    /// Rebuild the table from first principles.
    ///
    /// Closes |0⟩ under all five gates using exact arithmetic, then orders the
    /// result by code tuple. For the canonical gate set this reproduces the
    /// embedded table row for row.
    pub fn enumerate_reachable() -> Result<Self, TableError> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::new();
        seen.insert(StateVector::ZERO_KET);
        queue.push_back(StateVector::ZERO_KET);

        while let Some(vector) = queue.pop_front() {
            for gate in Gate::ALL {
                let next = vector.apply(gate).ok_or(TableError::Unrepresentable {
                    codes: vector.codes(),
                    gate,
                })?;
                if seen.insert(next) {
                    if seen.len() > NUM_STATES {
                        return Err(TableError::StateCount { found: seen.len() });
                    }
                    queue.push_back(next);
                }
            }
        }

        if seen.len() != NUM_STATES {
            return Err(TableError::StateCount { found: seen.len() });
        }

        let mut rows = [[0i8; 4]; NUM_STATES];
        for (row, vector) in rows.iter_mut().zip(&seen) {
            *row = vector.codes();
        }
        Self::from_codes(&rows)
    }

    #[inline]
    pub fn decode(&self, id: StateId) -> StateVector {
        self.entries[id.index()]
    }

    /// Find the id of an exact vector.
    pub fn lookup(&self, vector: &StateVector) -> Option<StateId> {
        self.entries
            .iter()
            .position(|v| v == vector)
            .map(|idx| StateId(idx as u8))
    }

    /// `(id, vector)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (StateId, StateVector)> + '_ {
        StateId::all().zip(self.entries.iter().copied())
    }

    /// Coded rows, suitable for [`StateTable::from_codes`].
    pub fn to_codes(&self) -> [[i8; 4]; NUM_STATES] {
        self.entries.map(|v| v.codes())
    }

    pub fn vectors(&self) -> Vec<StateVector> {
        self.entries.to_vec()
    }
}
