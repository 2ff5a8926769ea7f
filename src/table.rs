//! Embedded state and transition tables, and their text forms.
//!
//! [`CANONICAL_STATES`] lists the 48 amplitude configurations reachable from
//! |0⟩ under H, X, Y, Z and S, sorted by code tuple. [`CANONICAL_TRANSITIONS`]
//! gives the successor of each state under each gate, columns ordered
//! H, X, Y, Z, S. Row index is the state id in both tables.
//!
//! The text forms are one row per line: `<id> <c1> <c2> <c3> <c4>` for states
//! and `<id> <h> <x> <y> <z> <s>` for transitions.

use alloc::string::String;
use core::fmt::Write;

use crate::automaton::TransitionTable;
use crate::gate::{Gate, NUM_GATES};
use crate::state::{StateTable, NUM_STATES};

/// Coded amplitude tuples `(Re α, Im α, Re β, Im β)` indexed by state id.
pub static CANONICAL_STATES: [[i8; 4]; NUM_STATES] = [
    [-4, -4, -4, -4],
    [-4, -4, -4, 4],
    [-4, -4, 4, -4],
    [-4, -4, 4, 4],
    [-4, 4, -4, -4],
    [-4, 4, -4, 4],
    [-4, 4, 4, -4],
    [-4, 4, 4, 4],
    [-2, -2, 0, 0],
    [-2, 0, -2, 0],
    [-2, 0, 0, -2],
    [-2, 0, 0, 2],
    [-2, 0, 2, 0],
    [-2, 2, 0, 0],
    [-1, 0, 0, 0],
    [0, -2, -2, 0],
    [0, -2, 0, -2],
    [0, -2, 0, 2],
    [0, -2, 2, 0],
    [0, -1, 0, 0],
    [0, 0, -2, -2],
    [0, 0, -2, 2],
    [0, 0, -1, 0],
    [0, 0, 0, -1],
    [0, 0, 0, 1],
    [0, 0, 1, 0],
    [0, 0, 2, -2],
    [0, 0, 2, 2],
    [0, 1, 0, 0],
    [0, 2, -2, 0],
    [0, 2, 0, -2],
    [0, 2, 0, 2],
    [0, 2, 2, 0],
    [1, 0, 0, 0],
    [2, -2, 0, 0],
    [2, 0, -2, 0],
    [2, 0, 0, -2],
    [2, 0, 0, 2],
    [2, 0, 2, 0],
    [2, 2, 0, 0],
    [4, -4, -4, -4],
    [4, -4, -4, 4],
    [4, -4, 4, -4],
    [4, -4, 4, 4],
    [4, 4, -4, -4],
    [4, 4, -4, 4],
    [4, 4, 4, -4],
    [4, 4, 4, 4],
];

/// Successor state ids indexed by `[state][gate ordinal]`.
pub static CANONICAL_TRANSITIONS: [[u8; NUM_GATES]; NUM_STATES] = [
    [8, 0, 6, 3, 2],
    [10, 4, 46, 2, 0],
    [15, 40, 2, 1, 3],
    [20, 44, 42, 0, 1],
    [11, 1, 4, 7, 6],
    [13, 5, 44, 6, 4],
    [21, 41, 0, 5, 7],
    [29, 45, 40, 4, 5],
    [0, 20, 26, 8, 8],
    [14, 9, 30, 12, 10],
    [1, 15, 10, 11, 12],
    [4, 29, 36, 10, 9],
    [22, 35, 16, 9, 11],
    [5, 21, 20, 13, 13],
    [9, 22, 23, 14, 14],
    [2, 10, 32, 18, 16],
    [19, 16, 12, 17, 18],
    [23, 30, 38, 16, 15],
    [40, 36, 18, 15, 17],
    [16, 23, 25, 19, 19],
    [3, 8, 13, 27, 26],
    [6, 13, 39, 26, 20],
    [12, 14, 28, 25, 23],
    [17, 19, 14, 24, 25],
    [30, 28, 33, 23, 22],
    [35, 33, 19, 22, 24],
    [41, 34, 8, 21, 27],
    [44, 39, 34, 20, 21],
    [31, 24, 22, 28, 28],
    [7, 11, 29, 32, 30],
    [24, 17, 9, 31, 32],
    [28, 31, 35, 30, 29],
    [45, 37, 15, 29, 31],
    [38, 25, 24, 33, 33],
    [42, 26, 27, 34, 34],
    [25, 12, 31, 38, 36],
    [43, 18, 11, 37, 38],
    [46, 32, 37, 36, 35],
    [33, 38, 17, 35, 37],
    [47, 27, 21, 39, 39],
    [18, 2, 7, 43, 42],
    [26, 6, 47, 42, 40],
    [34, 42, 3, 41, 43],
    [36, 46, 43, 40, 41],
    [27, 3, 5, 47, 46],
    [32, 7, 45, 46, 44],
    [37, 43, 1, 45, 47],
    [39, 47, 41, 44, 45],
];

/// Structural problem found while loading or validating a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// A text row could not be parsed.
    Syntax { line: usize, message: String },
    /// A row names an id outside `[0, 47]`.
    IdOutOfRange { line: usize, id: i64 },
    /// Two rows share the same id.
    DuplicateId { id: u8 },
    /// No row was given for this id.
    MissingId { id: u8 },
    /// A coefficient code is not one of `{-4, -2, -1, 0, 1, 2, 4}`.
    InvalidCode { id: u8, code: i8 },
    /// `|α|² + |β|²` is not exactly 1; the sum is reported in quarters.
    NotNormalized { id: u8, norm_quarters: u32 },
    /// Two ids decode to the same amplitudes.
    DuplicateState { first: u8, second: u8 },
    /// A successor id is outside `[0, 47]`.
    TargetOutOfRange { id: u8, gate: Gate, target: u8 },
    /// A gate column maps two states to the same target.
    NotPermutation { gate: Gate, target: u8 },
    /// Applying a self-inverse gate twice did not return to the start.
    NotInvolution { gate: Gate, id: u8 },
    /// Applying S four times did not return to the start.
    NotPeriodic { gate: Gate, id: u8 },
    /// Applying the gate yields amplitudes missing from the state table.
    NotClosed { id: u8, gate: Gate },
    /// Applying the gate produces an amplitude outside the coded alphabet.
    Unrepresentable { codes: [i8; 4], gate: Gate },
    /// The transition disagrees with exact gate application.
    Inconsistent { id: u8, gate: Gate, table: u8, computed: u8 },
    /// Enumeration reached a different number of states.
    StateCount { found: usize },
}

impl core::fmt::Display for TableError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Syntax { line, message } => write!(f, "line {}: {}", line, message),
            Self::IdOutOfRange { line, id } => {
                write!(f, "line {}: state id {} outside [0, {})", line, id, NUM_STATES)
            }
            Self::DuplicateId { id } => write!(f, "state id {} defined twice", id),
            Self::MissingId { id } => write!(f, "state id {} missing", id),
            Self::InvalidCode { id, code } => {
                write!(f, "state {}: invalid amplitude code {}", id, code)
            }
            Self::NotNormalized { id, norm_quarters } => write!(
                f,
                "state {}: squared norm is {}/4, expected 4/4",
                id, norm_quarters
            ),
            Self::DuplicateState { first, second } => {
                write!(f, "states {} and {} have identical amplitudes", first, second)
            }
            Self::TargetOutOfRange { id, gate, target } => write!(
                f,
                "state {} --{}--> {} outside [0, {})",
                id, gate, target, NUM_STATES
            ),
            Self::NotPermutation { gate, target } => write!(
                f,
                "gate {} is not a permutation: state {} reached twice",
                gate, target
            ),
            Self::NotInvolution { gate, id } => {
                write!(f, "{}{} does not return state {} to itself", gate, gate, id)
            }
            Self::NotPeriodic { gate, id } => write!(
                f,
                "{}{}{}{} does not return state {} to itself",
                gate, gate, gate, gate, id
            ),
            Self::NotClosed { id, gate } => {
                write!(f, "state {} under {} leaves the state table", id, gate)
            }
            Self::Unrepresentable { codes, gate } => write!(
                f,
                "{:?} under {} leaves the amplitude alphabet",
                codes, gate
            ),
            Self::Inconsistent {
                id,
                gate,
                table,
                computed,
            } => write!(
                f,
                "state {} --{}--> {} in table, but gate application gives {}",
                id, gate, table, computed
            ),
            Self::StateCount { found } => write!(
                f,
                "reachable set has {} states, expected {}",
                found, NUM_STATES
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for TableError {}

/// Parse the text form of the state table.
///
/// Blank lines and `#` comments are skipped; rows may come in any order but
/// every id in `[0, 47]` must appear exactly once.
pub fn parse_states(text: &str) -> Result<[[i8; 4]; NUM_STATES], TableError> {
    let mut rows = [[0i8; 4]; NUM_STATES];
    parse_rows(text, &mut rows, |line, field| {
        field.parse::<i8>().map_err(|_| TableError::Syntax {
            line,
            message: alloc::format!("invalid amplitude code '{}'", field),
        })
    })?;
    Ok(rows)
}

/// Parse the text form of the transition table.
pub fn parse_transitions(text: &str) -> Result<[[u8; NUM_GATES]; NUM_STATES], TableError> {
    let mut rows = [[0u8; NUM_GATES]; NUM_STATES];
    parse_rows(text, &mut rows, |line, field| {
        field.parse::<u8>().map_err(|_| TableError::Syntax {
            line,
            message: alloc::format!("invalid successor id '{}'", field),
        })
    })?;
    Ok(rows)
}

fn parse_rows<T: Copy, const N: usize>(
    text: &str,
    rows: &mut [[T; N]; NUM_STATES],
    mut parse_field: impl FnMut(usize, &str) -> Result<T, TableError>,
) -> Result<(), TableError> {
    let mut seen = [false; NUM_STATES];

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut fields = trimmed.split_whitespace();
        let id_field = fields.next().unwrap_or_default();
        let id: i64 = id_field.parse().map_err(|_| TableError::Syntax {
            line,
            message: alloc::format!("invalid state id '{}'", id_field),
        })?;
        if !(0..NUM_STATES as i64).contains(&id) {
            return Err(TableError::IdOutOfRange { line, id });
        }
        let id = id as usize;
        if seen[id] {
            return Err(TableError::DuplicateId { id: id as u8 });
        }
        seen[id] = true;

        let mut count = 0;
        for field in fields {
            if count == N {
                return Err(TableError::Syntax {
                    line,
                    message: alloc::format!("expected {} values after the id", N),
                });
            }
            rows[id][count] = parse_field(line, field)?;
            count += 1;
        }
        if count != N {
            return Err(TableError::Syntax {
                line,
                message: alloc::format!("expected {} values after the id, found {}", N, count),
            });
        }
    }

    match seen.iter().position(|&s| !s) {
        Some(missing) => Err(TableError::MissingId { id: missing as u8 }),
        None => Ok(()),
    }
}

/// Render a state table in its text form.
pub fn format_states(states: &StateTable) -> String {
    let mut out = String::new();
    for (id, vector) in states.iter() {
        let [a, b, c, d] = vector.codes();
        let _ = writeln!(out, "{} {} {} {} {}", id, a, b, c, d);
    }
    out
}

/// Render a transition table in its text form.
pub fn format_transitions(transitions: &TransitionTable) -> String {
    let mut out = String::new();
    for (id, row) in transitions.rows() {
        let _ = write!(out, "{}", id);
        for gate in Gate::ALL {
            let _ = write!(out, " {}", row[gate.ordinal()]);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical_state_text() -> String {
        let mut text = String::new();
        for (id, row) in CANONICAL_STATES.iter().enumerate() {
            let _ = writeln!(text, "{} {} {} {} {}", id, row[0], row[1], row[2], row[3]);
        }
        text
    }

    #[test]
    fn test_states_sorted_by_codes() {
        for pair in CANONICAL_STATES.windows(2) {
            assert!(pair[0] < pair[1], "{:?} !< {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_parse_states_roundtrip() {
        let rows = parse_states(&canonical_state_text()).unwrap();
        assert_eq!(rows, CANONICAL_STATES);
    }

    #[test]
    fn test_parse_states_any_order_with_comments() {
        let text = canonical_state_text();
        let mut lines: Vec<&str> = text.lines().collect();
        lines.reverse();
        let shuffled = alloc::format!("# reversed\n\n{}\n", lines.join("\n"));
        assert_eq!(parse_states(&shuffled).unwrap(), CANONICAL_STATES);
    }

    #[test]
    fn test_parse_states_duplicate_id() {
        let text = alloc::format!("{}5 1 0 0 0\n", canonical_state_text());
        assert_eq!(parse_states(&text), Err(TableError::DuplicateId { id: 5 }));
    }

    #[test]
    fn test_parse_states_missing_id() {
        let text: String = canonical_state_text()
            .lines()
            .filter(|l| !l.starts_with("47 "))
            .map(|l| alloc::format!("{}\n", l))
            .collect();
        assert_eq!(parse_states(&text), Err(TableError::MissingId { id: 47 }));
    }

    #[test]
    fn test_parse_states_id_out_of_range() {
        assert_eq!(
            parse_states("48 1 0 0 0\n"),
            Err(TableError::IdOutOfRange { line: 1, id: 48 })
        );
        assert_eq!(
            parse_states("-1 1 0 0 0\n"),
            Err(TableError::IdOutOfRange { line: 1, id: -1 })
        );
    }

    #[test]
    fn test_parse_states_wrong_arity() {
        assert!(matches!(
            parse_states("0 1 0 0\n"),
            Err(TableError::Syntax { line: 1, .. })
        ));
        assert!(matches!(
            parse_states("0 1 0 0 0 0\n"),
            Err(TableError::Syntax { line: 1, .. })
        ));
        assert!(matches!(
            parse_states("0 1 zero 0 0\n"),
            Err(TableError::Syntax { line: 1, .. })
        ));
    }

    #[test]
    fn test_parse_transitions_roundtrip() {
        let table = TransitionTable::canonical().unwrap();
        let rows = parse_transitions(&format_transitions(&table)).unwrap();
        assert_eq!(rows, CANONICAL_TRANSITIONS);
    }

    #[test]
    fn test_format_states_head() {
        let states = StateTable::canonical().unwrap();
        let text = format_states(&states);
        let head: Vec<&str> = text.lines().take(3).collect();
        insta::assert_snapshot!(head.join("\n"), @r"
        0 -4 -4 -4 -4
        1 -4 -4 -4 4
        2 -4 -4 4 -4
        ");
    }

    #[test]
    fn test_format_transitions_head() {
        let table = TransitionTable::canonical().unwrap();
        let text = format_transitions(&table);
        let head: Vec<&str> = text.lines().take(2).collect();
        insta::assert_snapshot!(head.join("\n"), @r"
        0 8 0 6 3 2
        1 10 4 46 2 0
        ");
    }
}
