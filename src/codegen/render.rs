//! Source rendering for the generated simulator.
//!
//! Every function appends one section of the program to `out`. Writing into
//! a `String` cannot fail, but the `fmt::Result` is threaded through so the
//! sections compose with `?`.

use alloc::string::String;
use core::fmt::{self, Write};

use super::config::{SpecializerConfig, Strategy};
use crate::automaton::Automaton;
use crate::dispatch::BatchDispatch;
use crate::gate::{format_gates, Gate, NUM_GATES};
use crate::sequence::{sequences, BatchLen};
use crate::state::NUM_STATES;

pub(super) fn program(
    out: &mut String,
    automaton: &Automaton,
    config: &SpecializerConfig,
) -> fmt::Result {
    header(out, config)?;
    state_table(out, automaton)?;
    transition_table(out, automaton)?;
    gate_columns(out)?;
    step_fn(out)?;
    match config.strategy {
        Strategy::Stepped => {
            stepped_run(out)?;
            if config.is_parallel() {
                stepped_chunk_map(out)?;
            }
        }
        Strategy::Unrolled(len) => {
            batch_table(out, automaton, len)?;
            batch_tag_fn(out, len)?;
            unrolled_run(out)?;
            if config.is_parallel() {
                unrolled_chunk_map(out)?;
            }
        }
    }
    if config.is_parallel() {
        parallel_simulate(out, config)?;
    } else {
        sequential_simulate(out)?;
    }
    loader_and_main(out)
}

fn header(out: &mut String, config: &SpecializerConfig) -> fmt::Result {
    writeln!(
        out,
        "// Generated by qubitfsm {}. Do not edit.",
        env!("CARGO_PKG_VERSION")
    )?;
    writeln!(out, "//")?;
    match config.strategy {
        Strategy::Stepped => writeln!(out, "// Dispatch: stepped, one table lookup per gate.")?,
        Strategy::Unrolled(len) => writeln!(
            out,
            "// Dispatch: unrolled, one lookup per {} gates ({} batch rows).",
            len,
            len.tag_count()
        )?,
    }
    writeln!(out, "// Initial state: {}.", config.initial_state)?;
    if config.is_parallel() {
        writeln!(
            out,
            "// Threads: {}, for inputs of at least {} gates.",
            config.threads, config.parallel_min_gates
        )?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "#![allow(clippy::excessive_precision, clippy::unreadable_literal)]"
    )?;
    writeln!(out)?;
    writeln!(out, "use std::process;")?;
    writeln!(out, "use std::time::Instant;")?;
    writeln!(out)?;
    writeln!(out, "const NUM_STATES: usize = {};", NUM_STATES)?;
    writeln!(out, "const INITIAL_STATE: u8 = {};", config.initial_state)?;
    writeln!(out, "const HEADER_LEN: usize = 8;")?;
    writeln!(out, "const INVALID_GATE: u8 = 0xff;")?;
    writeln!(out)
}

fn state_table(out: &mut String, automaton: &Automaton) -> fmt::Result {
    writeln!(out, "/// (Re alpha, Im alpha, Re beta, Im beta) per state.")?;
    writeln!(out, "static STATES: [[f64; 4]; NUM_STATES] = [")?;
    for (id, vector) in automaton.states().iter() {
        let [ar, ai, br, bi] = vector.coords();
        writeln!(
            out,
            "    [{}, {}, {}, {}], // {}",
            ar.literal(),
            ai.literal(),
            br.literal(),
            bi.literal(),
            id
        )?;
    }
    writeln!(out, "];")?;
    writeln!(out)
}

fn transition_table(out: &mut String, automaton: &Automaton) -> fmt::Result {
    writeln!(out, "/// Successor per state, columns H, X, Y, Z, S.")?;
    writeln!(
        out,
        "static TRANSITIONS: [[u8; {}]; NUM_STATES] = [",
        NUM_GATES
    )?;
    for (id, row) in automaton.transitions().rows() {
        write!(out, "    [")?;
        for (i, next) in row.iter().enumerate() {
            if i > 0 {
                write!(out, ", ")?;
            }
            write!(out, "{}", next)?;
        }
        writeln!(out, "], // {}", id)?;
    }
    writeln!(out, "];")?;
    writeln!(out)
}

fn gate_columns(out: &mut String) -> fmt::Result {
    writeln!(out, "/// Transition column per input byte.")?;
    writeln!(out, "static GATE_COLUMN: [u8; 256] = {{")?;
    writeln!(out, "    let mut table = [INVALID_GATE; 256];")?;
    for gate in Gate::ALL {
        writeln!(
            out,
            "    table[b'{}' as usize] = {};",
            gate,
            gate.ordinal()
        )?;
    }
    writeln!(out, "    table")?;
    writeln!(out, "}};")?;
    writeln!(out)
}

fn step_fn(out: &mut String) -> fmt::Result {
    out.push_str(
        "#[inline(always)]
fn step(state: u8, gate: u8) -> u8 {
    TRANSITIONS[state as usize][GATE_COLUMN[gate as usize] as usize]
}

",
    );
    Ok(())
}

fn stepped_run(out: &mut String) -> fmt::Result {
    out.push_str(
        "fn run_from(mut state: u8, gates: &[u8]) -> u8 {
    for &gate in gates {
        state = step(state, gate);
    }
    state
}

",
    );
    Ok(())
}

fn stepped_chunk_map(out: &mut String) -> fmt::Result {
    out.push_str(
        "/// Final state of `gates` from every initial state.
fn chunk_map(gates: &[u8]) -> [u8; NUM_STATES] {
    let mut map = IDENTITY;
    for &gate in gates {
        let column = GATE_COLUMN[gate as usize] as usize;
        for state in map.iter_mut() {
            *state = TRANSITIONS[*state as usize][column];
        }
    }
    map
}

",
    );
    Ok(())
}

fn batch_table(out: &mut String, automaton: &Automaton, len: BatchLen) -> fmt::Result {
    let dispatch = BatchDispatch::build(automaton.transitions(), len);

    writeln!(out, "const BATCH_LEN: usize = {};", len)?;
    writeln!(out, "const NUM_TAGS: usize = {};", len.tag_count())?;
    writeln!(out)?;
    writeln!(out, "/// Final state per batch tag, indexed by initial state.")?;
    writeln!(out, "static BATCHES: [[u8; NUM_STATES]; NUM_TAGS] = [")?;
    // both iterate in tag order
    for ((tag, row), gates) in dispatch.rows().zip(sequences(len)) {
        writeln!(out, "    // {} {}", tag, format_gates(&gates))?;
        write!(out, "    [")?;
        for (i, state) in row.iter().enumerate() {
            if i > 0 {
                write!(out, ", ")?;
            }
            write!(out, "{}", state)?;
        }
        writeln!(out, "],")?;
    }
    writeln!(out, "];")?;
    writeln!(out)
}

fn batch_tag_fn(out: &mut String, len: BatchLen) -> fmt::Result {
    writeln!(out, "#[inline(always)]")?;
    writeln!(out, "fn batch_tag(chunk: &[u8]) -> usize {{")?;
    let digits = len.get();
    for i in 0..digits {
        let weight = (NUM_GATES as u64).pow((digits - 1 - i) as u32);
        let lead = if i == 0 { "    " } else { "        + " };
        write!(out, "{}GATE_COLUMN[chunk[{}] as usize] as usize", lead, i)?;
        if weight > 1 {
            write!(out, " * {}", weight)?;
        }
        writeln!(out)?;
    }
    writeln!(out, "}}")?;
    writeln!(out)
}

fn unrolled_run(out: &mut String) -> fmt::Result {
    out.push_str(
        "fn run_from(mut state: u8, gates: &[u8]) -> u8 {
    let mut chunks = gates.chunks_exact(BATCH_LEN);
    for chunk in &mut chunks {
        state = BATCHES[batch_tag(chunk)][state as usize];
    }
    for &gate in chunks.remainder() {
        state = step(state, gate);
    }
    state
}

",
    );
    Ok(())
}

fn unrolled_chunk_map(out: &mut String) -> fmt::Result {
    out.push_str(
        "/// Final state of `gates` from every initial state.
fn chunk_map(gates: &[u8]) -> [u8; NUM_STATES] {
    let mut map = IDENTITY;
    let mut chunks = gates.chunks_exact(BATCH_LEN);
    for chunk in &mut chunks {
        let row = &BATCHES[batch_tag(chunk)];
        for state in map.iter_mut() {
            *state = row[*state as usize];
        }
    }
    for &gate in chunks.remainder() {
        let column = GATE_COLUMN[gate as usize] as usize;
        for state in map.iter_mut() {
            *state = TRANSITIONS[*state as usize][column];
        }
    }
    map
}

",
    );
    Ok(())
}

fn sequential_simulate(out: &mut String) -> fmt::Result {
    out.push_str(
        "fn simulate(gates: &[u8]) -> u8 {
    run_from(INITIAL_STATE, gates)
}

",
    );
    Ok(())
}

fn parallel_simulate(out: &mut String, config: &SpecializerConfig) -> fmt::Result {
    let align = config.batch_len().map_or(1, BatchLen::get);
    writeln!(out, "const THREADS: usize = {};", config.threads)?;
    writeln!(
        out,
        "const PARALLEL_MIN_GATES: usize = {};",
        config.parallel_min_gates
    )?;
    writeln!(out, "const CHUNK_ALIGN: usize = {};", align)?;
    out.push_str(
        "
const IDENTITY: [u8; NUM_STATES] = {
    let mut map = [0u8; NUM_STATES];
    let mut i = 0;
    while i < NUM_STATES {
        map[i] = i as u8;
        i += 1;
    }
    map
};

/// The first chunk runs from the initial state on this thread; later chunks
/// compute their state maps on scoped threads and are applied in order.
fn simulate(gates: &[u8]) -> u8 {
    if gates.len() < PARALLEL_MIN_GATES {
        return run_from(INITIAL_STATE, gates);
    }
    let per_thread = (gates.len() + THREADS - 1) / THREADS;
    let chunk_len = (per_thread + CHUNK_ALIGN - 1) / CHUNK_ALIGN * CHUNK_ALIGN;
    let chunk_len = chunk_len.max(CHUNK_ALIGN);

    let mut chunks = gates.chunks(chunk_len);
    let head = chunks.next().unwrap_or(&[]);
    std::thread::scope(|scope| {
        let tails: Vec<_> = chunks
            .map(|chunk| scope.spawn(move || chunk_map(chunk)))
            .collect();
        let mut state = run_from(INITIAL_STATE, head);
        for tail in tails {
            match tail.join() {
                Ok(map) => state = map[state as usize],
                Err(_) => {
                    eprintln!(\"worker thread panicked\");
                    process::exit(1);
                }
            }
        }
        state
    })
}

",
    );
    Ok(())
}

fn loader_and_main(out: &mut String) -> fmt::Result {
    out.push_str(
        r#"fn load_gates(bytes: &[u8]) -> Result<&[u8], String> {
    if bytes.len() < HEADER_LEN {
        return Err(format!(
            "input is {} bytes, shorter than its {}-byte header",
            bytes.len(),
            HEADER_LEN
        ));
    }
    let mut header = [0u8; HEADER_LEN];
    header.copy_from_slice(&bytes[..HEADER_LEN]);
    let declared = u64::from_le_bytes(header);
    let body = &bytes[HEADER_LEN..];
    if declared > body.len() as u64 {
        return Err(format!(
            "input declares {} gates but holds {}",
            declared,
            body.len()
        ));
    }
    let gates = &body[..declared as usize];
    if let Some(offset) = gates
        .iter()
        .position(|&g| GATE_COLUMN[g as usize] == INVALID_GATE)
    {
        return Err(format!(
            "invalid gate byte 0x{:02x} at offset {}",
            gates[offset], offset
        ));
    }
    Ok(gates)
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        let name = args.first().map(String::as_str).unwrap_or("simulate");
        eprintln!("Usage: {} <input_file>", name);
        process::exit(1);
    }

    let bytes = match std::fs::read(&args[1]) {
        Ok(bytes) => bytes,
        Err(err) => {
            eprintln!("Failed to open file: {}", err);
            process::exit(1);
        }
    };
    let gates = match load_gates(&bytes) {
        Ok(gates) => gates,
        Err(message) => {
            eprintln!("{}", message);
            process::exit(1);
        }
    };

    let start = Instant::now();
    let state = simulate(gates);
    let elapsed = start.elapsed();

    let amplitudes = STATES[state as usize];
    println!(
        "Final state: alpha = {:.12} + {:.12}i, beta = {:.12} + {:.12}i",
        amplitudes[0], amplitudes[1], amplitudes[2], amplitudes[3]
    );
    println!("Time taken: {:.2} ms", elapsed.as_secs_f64() * 1000.0);
}
"#,
    );
    Ok(())
}
