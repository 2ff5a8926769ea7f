//! Table loading, validation and derivation commands.

use anyhow::{bail, Context, Result};
use std::path::Path;

use qubitfsm::table::{format_states, format_transitions, parse_states, parse_transitions};
use qubitfsm::{Automaton, StateTable, TransitionTable};

/// Load the automaton from text tables, falling back to the embedded ones.
pub fn load_automaton(states: Option<&Path>, transitions: Option<&Path>) -> Result<Automaton> {
    let states = match states {
        Some(path) => {
            let text = read_text(path)?;
            let rows = parse_states(&text).with_context(|| format!("In {}", path.display()))?;
            StateTable::from_codes(&rows).with_context(|| format!("In {}", path.display()))?
        }
        None => StateTable::canonical().context("Embedded state table is invalid")?,
    };
    let transitions = match transitions {
        Some(path) => {
            let text = read_text(path)?;
            let rows =
                parse_transitions(&text).with_context(|| format!("In {}", path.display()))?;
            TransitionTable::from_rows(&rows).with_context(|| format!("In {}", path.display()))?
        }
        None => TransitionTable::canonical().context("Embedded transition table is invalid")?,
    };
    Automaton::new(states, transitions).context("State and transition tables disagree")
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Both tables in their text form, separated by a comment line.
pub fn dump(automaton: &Automaton) -> String {
    let mut out = String::from("# states: id re(alpha) im(alpha) re(beta) im(beta)\n");
    out.push_str(&format_states(automaton.states()));
    out.push_str("# transitions: id H X Y Z S\n");
    out.push_str(&format_transitions(automaton.transitions()));
    out
}

/// Re-derive both tables by closure from |0⟩ and compare with `automaton`.
pub fn derive_and_compare(automaton: &Automaton) -> Result<()> {
    let states = StateTable::enumerate_reachable().context("Closure from |0> failed")?;
    if &states != automaton.states() {
        bail!("Derived state table differs from the loaded one");
    }
    let transitions = TransitionTable::derive(&states).context("Derivation failed")?;
    if &transitions != automaton.transitions() {
        bail!("Derived transition table differs from the loaded one");
    }
    Ok(())
}
