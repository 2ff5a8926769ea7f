//! The transition automaton over canonical states.
//!
//! A [`TransitionTable`] maps `(state, gate)` to the successor state with a
//! single array lookup. Running a gate sequence is a left fold of
//! [`TransitionTable::apply`] from a caller-chosen initial state.
//!
//! # Validation
//!
//! Tables are checked once when loaded:
//! - every successor id lies in `[0, 47]`
//! - for each gate the column is a permutation of the states
//! - H, X, Y and Z are involutions, and S has order dividing four
//!
//! [`Automaton`] additionally checks every entry against exact gate
//! application on the paired [`StateTable`].

use crate::gate::{Gate, NUM_GATES};
use crate::protocol::FinalState;
use crate::state::{StateId, StateTable, StateVector, NUM_STATES};
use crate::table::{TableError, CANONICAL_TRANSITIONS};

/// Gates that must undo themselves when applied twice.
const INVOLUTIONS: [Gate; 4] = [Gate::H, Gate::X, Gate::Y, Gate::Z];

/// Validated successor table indexed by `[state][gate ordinal]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable {
    next: [[StateId; NUM_GATES]; NUM_STATES],
}

impl TransitionTable {
    /// Load the embedded table.
    pub fn canonical() -> Result<Self, TableError> {
        Self::from_rows(&CANONICAL_TRANSITIONS)
    }

    /// Validate raw successor rows indexed by state id.
    pub fn from_rows(rows: &[[u8; NUM_GATES]; NUM_STATES]) -> Result<Self, TableError> {
        let mut next = [[StateId::INITIAL; NUM_GATES]; NUM_STATES];
        for (id, (slot, row)) in next.iter_mut().zip(rows).enumerate() {
            for gate in Gate::ALL {
                let target = row[gate.ordinal()];
                slot[gate.ordinal()] = StateId::new(target).ok_or(TableError::TargetOutOfRange {
                    id: id as u8,
                    gate,
                    target,
                })?;
            }
        }

        let table = Self { next };
        table.check_permutations()?;
        table.check_orders()?;
        Ok(table)
    }

    /// Compute the table by applying every gate to every state exactly.
    pub fn derive(states: &StateTable) -> Result<Self, TableError> {
        let mut rows = [[0u8; NUM_GATES]; NUM_STATES];
        for (id, vector) in states.iter() {
            for gate in Gate::ALL {
                rows[id.index()][gate.ordinal()] = successor(states, id, &vector, gate)?.get();
            }
        }
        Self::from_rows(&rows)
    }

    fn check_permutations(&self) -> Result<(), TableError> {
        for gate in Gate::ALL {
            let mut hit = [false; NUM_STATES];
            for row in &self.next {
                let target = row[gate.ordinal()];
                if hit[target.index()] {
                    return Err(TableError::NotPermutation {
                        gate,
                        target: target.get(),
                    });
                }
                hit[target.index()] = true;
            }
        }
        Ok(())
    }

    fn check_orders(&self) -> Result<(), TableError> {
        for state in StateId::all() {
            for gate in INVOLUTIONS {
                if self.apply(self.apply(state, gate), gate) != state {
                    return Err(TableError::NotInvolution {
                        gate,
                        id: state.get(),
                    });
                }
            }
            if self.run(state, [Gate::S; 4]) != state {
                return Err(TableError::NotPeriodic {
                    gate: Gate::S,
                    id: state.get(),
                });
            }
        }
        Ok(())
    }

    /// Successor of `state` under `gate`.
    #[inline]
    pub fn apply(&self, state: StateId, gate: Gate) -> StateId {
        self.next[state.index()][gate.ordinal()]
    }

    /// Fold [`apply`](Self::apply) over `gates` starting from `initial`.
    #[inline]
    pub fn run<I>(&self, initial: StateId, gates: I) -> StateId
    where
        I: IntoIterator<Item = Gate>,
    {
        gates
            .into_iter()
            .fold(initial, |state, gate| self.apply(state, gate))
    }

    /// Successors of `state`, columns ordered H, X, Y, Z, S.
    #[inline]
    pub fn row(&self, state: StateId) -> [StateId; NUM_GATES] {
        self.next[state.index()]
    }

    /// `(state, successors)` pairs in id order.
    pub fn rows(&self) -> impl Iterator<Item = (StateId, [StateId; NUM_GATES])> + '_ {
        StateId::all().zip(self.next.iter().copied())
    }

    /// Raw rows, suitable for [`TransitionTable::from_rows`].
    pub fn to_rows(&self) -> [[u8; NUM_GATES]; NUM_STATES] {
        self.next.map(|row| row.map(StateId::get))
    }
}

fn successor(
    states: &StateTable,
    id: StateId,
    vector: &StateVector,
    gate: Gate,
) -> Result<StateId, TableError> {
    vector
        .apply(gate)
        .and_then(|next| states.lookup(&next))
        .ok_or(TableError::NotClosed { id: id.get(), gate })
}

/// A state table paired with a transition table that agrees with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Automaton {
    states: StateTable,
    transitions: TransitionTable,
}

impl Automaton {
    /// Load and cross-check the embedded tables.
    pub fn canonical() -> Result<Self, TableError> {
        Self::new(StateTable::canonical()?, TransitionTable::canonical()?)
    }

    /// Pair two tables, rejecting any transition that disagrees with exact
    /// gate application.
    pub fn new(states: StateTable, transitions: TransitionTable) -> Result<Self, TableError> {
        for (id, vector) in states.iter() {
            for gate in Gate::ALL {
                let computed = successor(&states, id, &vector, gate)?;
                let table = transitions.apply(id, gate);
                if computed != table {
                    return Err(TableError::Inconsistent {
                        id: id.get(),
                        gate,
                        table: table.get(),
                        computed: computed.get(),
                    });
                }
            }
        }
        Ok(Self {
            states,
            transitions,
        })
    }

    #[inline]
    pub fn states(&self) -> &StateTable {
        &self.states
    }

    #[inline]
    pub fn transitions(&self) -> &TransitionTable {
        &self.transitions
    }

    #[inline]
    pub fn apply(&self, state: StateId, gate: Gate) -> StateId {
        self.transitions.apply(state, gate)
    }

    #[inline]
    pub fn run<I>(&self, initial: StateId, gates: I) -> StateId
    where
        I: IntoIterator<Item = Gate>,
    {
        self.transitions.run(initial, gates)
    }

    #[inline]
    pub fn decode(&self, state: StateId) -> StateVector {
        self.states.decode(state)
    }

    /// Run `gates` from |0⟩ and decode the final amplitudes.
    ///
    /// This is the reference answer a simulator program must reproduce.
    pub fn final_state<I>(&self, gates: I) -> FinalState
    where
        I: IntoIterator<Item = Gate>,
    {
        let (alpha, beta) = self.decode(self.run(StateId::INITIAL, gates)).to_real();
        FinalState::new(alpha, beta)
    }
}
