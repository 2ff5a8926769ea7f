//! qubitfsm CLI: table tooling, code specialization and benchmarking.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use qubitfsm::harness::{BuildCommand, HarnessConfig};
use qubitfsm::input::decode_gates;
use qubitfsm::{specialize, SpecializerConfig, StateId};

mod bench;
mod generate;
mod tables;

#[derive(Debug, Parser)]
#[command(name = "qubitfsm")]
#[command(about = "Single-qubit simulation as a 48-state automaton", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// State and transition table tooling
    Tables(TablesCommand),
    /// Render a specialized simulator program
    Specialize(SpecializeArgs),
    /// Generate random gate files with reference answers
    Generate(GenerateArgs),
    /// Simulate a gate file in-process
    Simulate(SimulateArgs),
    /// Build, verify and score a simulator program
    Bench(BenchArgs),
}

#[derive(Debug, Parser)]
struct TablesCommand {
    #[command(subcommand)]
    command: TablesSubcommand,
}

#[derive(Debug, Subcommand)]
enum TablesSubcommand {
    /// Check that the tables are well formed and agree with each other
    Validate(TableFiles),
    /// Print the tables in their text form
    Dump(TableFiles),
    /// Re-derive the tables from |0⟩ and compare with the loaded ones
    Derive(TableFiles),
}

/// Table files; the embedded tables are used for any that are omitted
#[derive(Debug, Clone, Parser)]
struct TableFiles {
    /// State table text file
    #[arg(long)]
    states: Option<PathBuf>,

    /// Transition table text file
    #[arg(long)]
    transitions: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// One table lookup per gate
    Stepped,
    /// One lookup per batch of gates
    Unrolled,
}

/// Render a specialized simulator program
#[derive(Debug, Parser)]
struct SpecializeArgs {
    /// Dispatch strategy
    #[arg(short, long, default_value = "stepped")]
    strategy: StrategyArg,

    /// Gates per batch for the unrolled strategy (1-6)
    #[arg(short = 'l', long, default_value = "4")]
    batch_len: usize,

    /// Initial state id (default: |0⟩)
    #[arg(long)]
    initial_state: Option<u8>,

    /// Threads for chunked simulation of long inputs (1 = sequential)
    #[arg(short, long, default_value = "1")]
    threads: usize,

    /// Shortest input split across threads
    #[arg(long, default_value_t = qubitfsm::codegen::DEFAULT_PARALLEL_MIN_GATES)]
    parallel_min_gates: usize,

    /// Output file path (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    tables: TableFiles,
}

/// Generate random gate files with reference answers
#[derive(Debug, Parser)]
struct GenerateArgs {
    /// Output directory
    dir: PathBuf,

    /// Number of cases
    #[arg(short = 'n', long, default_value = "10")]
    cases: usize,

    /// Gates per case (supports k, m, g suffixes - case insensitive);
    /// random multiples of 384 when omitted
    #[arg(short, long, value_parser = parse_count)]
    gates: Option<usize>,

    /// Random seed for reproducible generation
    #[arg(short, long, default_value = "0")]
    seed: u64,

    /// External simulator whose output becomes the reference answer
    #[arg(long)]
    reference: Option<PathBuf>,
}

/// Simulate a gate file in-process
#[derive(Debug, Parser)]
struct SimulateArgs {
    /// Gate file
    input: PathBuf,

    #[command(flatten)]
    tables: TableFiles,
}

/// Build, verify and score a simulator program
#[derive(Debug, Parser)]
struct BenchArgs {
    /// Directory of `*.in` / `*.out` test pairs
    data_dir: PathBuf,

    /// Simulator source file
    program: PathBuf,

    /// Gate file used for timing
    #[arg(long)]
    perf_input: PathBuf,

    /// Expected answer line for the perf input (computed when omitted)
    #[arg(long)]
    perf_answer: Option<String>,

    /// Build command with {src} and {out} placeholders
    #[arg(long)]
    build_cmd: Option<String>,

    /// Path of the built binary
    #[arg(long)]
    binary: Option<PathBuf>,

    /// Number of timed runs
    #[arg(long, default_value = "10")]
    runs: usize,

    /// Write the score to this file
    #[arg(long)]
    score_file: Option<PathBuf>,

    /// Write a JSON report to this file
    #[arg(long)]
    json: Option<PathBuf>,

    /// Seconds allowed per correctness case
    #[arg(long, default_value = "120")]
    correctness_timeout: u64,

    /// Seconds allowed per timed run
    #[arg(long, default_value = "480")]
    perf_timeout: u64,
}

/// Parse count string like "1k", "512K", "2m", "1024" (case insensitive)
fn parse_count(s: &str) -> Result<usize, String> {
    let s = s.trim().to_lowercase();

    // Try parsing as plain number first
    if let Ok(n) = s.parse::<usize>() {
        return Ok(n);
    }

    // Parse with unit suffix
    let (num_str, unit) = if let Some(num) = s.strip_suffix('g') {
        (num, 1024 * 1024 * 1024)
    } else if let Some(num) = s.strip_suffix('m') {
        (num, 1024 * 1024)
    } else if let Some(num) = s.strip_suffix('k') {
        (num, 1024)
    } else {
        return Err(format!(
            "Invalid count format: '{}'. Use format like '1k', '512K', or '1024'",
            s
        ));
    };

    num_str
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_mul(unit))
        .ok_or_else(|| format!("Invalid number in count: '{}'", s))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Tables(tables_cmd) => match tables_cmd.command {
            TablesSubcommand::Validate(files) => {
                tables::load_automaton(files.states.as_deref(), files.transitions.as_deref())?;
                eprintln!("✓ Tables are valid and consistent");
                Ok(())
            }
            TablesSubcommand::Dump(files) => {
                let automaton =
                    tables::load_automaton(files.states.as_deref(), files.transitions.as_deref())?;
                print!("{}", tables::dump(&automaton));
                Ok(())
            }
            TablesSubcommand::Derive(files) => {
                let automaton =
                    tables::load_automaton(files.states.as_deref(), files.transitions.as_deref())?;
                tables::derive_and_compare(&automaton)?;
                eprintln!("✓ Derived tables match");
                Ok(())
            }
        },

        Command::Specialize(args) => {
            let automaton = tables::load_automaton(
                args.tables.states.as_deref(),
                args.tables.transitions.as_deref(),
            )?;
            let mut config = match args.strategy {
                StrategyArg::Stepped => SpecializerConfig::stepped(),
                StrategyArg::Unrolled => SpecializerConfig::unrolled(args.batch_len)?,
            }
            .with_threads(args.threads)
            .with_parallel_min_gates(args.parallel_min_gates);
            if let Some(id) = args.initial_state {
                let state = StateId::new(id)
                    .with_context(|| format!("Initial state {} is out of range", id))?;
                config = config.with_initial_state(state);
            }

            let source = specialize(&automaton, &config);
            match args.output {
                Some(path) => {
                    std::fs::write(&path, &source)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    eprintln!("✓ Wrote {} bytes to {}", source.len(), path.display());
                }
                None => print!("{}", source),
            }
            Ok(())
        }

        Command::Generate(args) => {
            let config = generate::GenerateConfig {
                out_dir: args.dir,
                cases: args.cases,
                gates: args.gates,
                seed: args.seed,
                reference: match args.reference {
                    Some(program) => generate::Reference::Program(program),
                    None => generate::Reference::InProcess,
                },
            };
            eprintln!("Generating {} cases in {}...", config.cases, config.out_dir.display());
            let written = generate::generate_cases(&config)?;
            eprintln!("✓ Wrote {} cases", written.len());
            Ok(())
        }

        Command::Simulate(args) => {
            let automaton = tables::load_automaton(
                args.tables.states.as_deref(),
                args.tables.transitions.as_deref(),
            )?;
            let bytes = std::fs::read(&args.input)
                .with_context(|| format!("Failed to open {}", args.input.display()))?;
            let gates = decode_gates(&bytes)
                .with_context(|| format!("Invalid gate file {}", args.input.display()))?;

            let start = Instant::now();
            let state = automaton.final_state(gates);
            let elapsed = start.elapsed();

            println!("{}", state);
            println!("Time taken: {:.2} ms", elapsed.as_secs_f64() * 1000.0);
            Ok(())
        }

        Command::Bench(args) => {
            let mut config = HarnessConfig::new(args.data_dir, args.program, args.perf_input)
                .with_perf_runs(args.runs)
                .with_correctness_timeout(Duration::from_secs(args.correctness_timeout))
                .with_perf_timeout(Duration::from_secs(args.perf_timeout));
            if let Some(cmd) = args.build_cmd.as_deref() {
                let build = BuildCommand::parse(cmd).context("Build command is empty")?;
                config = config.with_build(build);
            }
            if let Some(binary) = args.binary {
                config = config.with_binary(binary);
            }
            if let Some(answer) = args.perf_answer {
                config = config.with_perf_answer(answer);
            }
            if let Some(path) = args.score_file {
                config = config.with_score_file(path);
            }

            let evaluation = bench::run_bench(&config, args.json.as_deref())?;
            println!("{:.2}", evaluation.score);
            Ok(())
        }
    }
}
