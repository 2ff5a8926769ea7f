//! Random gate files with reference answers.

use anyhow::{bail, Context, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use qubitfsm::gate::{Gate, NUM_GATES};
use qubitfsm::harness::run_with_timeout;
use qubitfsm::input::encode_gates;
use qubitfsm::Automaton;

/// Case lengths are multiples of this many gates.
pub const LENGTH_QUANTUM: usize = 48 * 8;

/// Largest multiplier of [`LENGTH_QUANTUM`] drawn for a case.
pub const MAX_LENGTH_FACTOR: usize = 10_000;

/// Time allowed for an external reference run.
const REFERENCE_TIMEOUT: Duration = Duration::from_secs(120);

/// Where reference answers come from.
#[derive(Debug, Clone)]
pub enum Reference {
    /// The embedded automaton.
    InProcess,
    /// An external simulator whose full stdout becomes the `.out` file.
    Program(PathBuf),
}

#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub out_dir: PathBuf,
    pub cases: usize,
    /// Fixed gate count per case; random multiples of 384 when unset
    pub gates: Option<usize>,
    pub seed: u64,
    pub reference: Reference,
}

/// Uniformly random gates.
pub fn random_gates<R: Rng>(rng: &mut R, len: usize) -> Vec<Gate> {
    (0..len)
        .filter_map(|_| Gate::from_ordinal(rng.gen_range(0..NUM_GATES)))
        .collect()
}

/// A case length of `384 * k` gates, `k` uniform in `[1, 10000]`.
pub fn random_case_len<R: Rng>(rng: &mut R) -> usize {
    LENGTH_QUANTUM * rng.gen_range(1..=MAX_LENGTH_FACTOR)
}

/// Write `data_<i>.in` / `data_<i>.out` pairs and return the input paths.
pub fn generate_cases(config: &GenerateConfig) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("Failed to create {}", config.out_dir.display()))?;

    let automaton = Automaton::canonical().context("Embedded tables are invalid")?;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut written = Vec::with_capacity(config.cases);

    for idx in 0..config.cases {
        let len = config.gates.unwrap_or_else(|| random_case_len(&mut rng));
        let gates = random_gates(&mut rng, len);

        let input = config.out_dir.join(format!("data_{}.in", idx));
        std::fs::write(&input, encode_gates(&gates))
            .with_context(|| format!("Failed to write {}", input.display()))?;

        let answer = match &config.reference {
            Reference::InProcess => format!("{}\n", automaton.final_state(gates.iter().copied())),
            Reference::Program(program) => run_reference(program, &input)?,
        };
        let output = input.with_extension("out");
        std::fs::write(&output, answer)
            .with_context(|| format!("Failed to write {}", output.display()))?;

        eprintln!("  {} ({} gates)", input.display(), len);
        written.push(input);
    }

    Ok(written)
}

fn run_reference(program: &Path, input: &Path) -> Result<String> {
    let output = run_with_timeout(Command::new(program).arg(input), REFERENCE_TIMEOUT)
        .with_context(|| format!("Failed to run {}", program.display()))?;
    let Some(output) = output else {
        bail!("{} timed out on {}", program.display(), input.display());
    };
    if !output.status.success() {
        bail!(
            "{} failed on {}: {}",
            program.display(),
            input.display(),
            output.stderr.trim_end()
        );
    }
    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qubitfsm::input::decode_gates;

    #[test]
    fn test_random_gates_seeded() {
        let a = random_gates(&mut ChaCha8Rng::seed_from_u64(7), 1000);
        let b = random_gates(&mut ChaCha8Rng::seed_from_u64(7), 1000);
        assert_eq!(a.len(), 1000);
        assert_eq!(a, b);
        // every gate shows up in a sample this large
        for gate in Gate::ALL {
            assert!(a.contains(&gate), "{} never drawn", gate);
        }
    }

    #[test]
    fn test_random_case_len_quantized() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..100 {
            let len = random_case_len(&mut rng);
            assert_eq!(len % LENGTH_QUANTUM, 0);
            assert!(len >= LENGTH_QUANTUM && len <= LENGTH_QUANTUM * MAX_LENGTH_FACTOR);
        }
    }

    #[test]
    fn test_generate_in_process() {
        let dir = tempfile::tempdir().unwrap();
        let config = GenerateConfig {
            out_dir: dir.path().to_path_buf(),
            cases: 3,
            gates: Some(100),
            seed: 42,
            reference: Reference::InProcess,
        };
        let inputs = generate_cases(&config).unwrap();
        assert_eq!(inputs.len(), 3);

        let automaton = Automaton::canonical().unwrap();
        for input in inputs {
            let gates = decode_gates(&std::fs::read(&input).unwrap()).unwrap();
            assert_eq!(gates.len(), 100);
            let answer = std::fs::read_to_string(input.with_extension("out")).unwrap();
            assert_eq!(answer, format!("{}\n", automaton.final_state(gates)));
        }
    }
}
