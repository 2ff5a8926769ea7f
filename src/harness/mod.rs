//! Build, verify and time a simulator program.
//!
//! An evaluation runs in three phases and stops at the first failure:
//!
//! 1. **Build** the program with the configured [`BuildCommand`].
//! 2. **Correctness**: run the binary on every `*.in` file in the data
//!    directory, in name order, and compare its answer line against the first
//!    line of the sibling `.out` file.
//! 3. **Performance**: run the perf input [`HarnessConfig::perf_runs`] times,
//!    check every answer, and collect the reported timings.
//!
//! The timings are then reduced with [`score::evaluate`] and the score is
//! optionally written to a file. Progress is reported through a
//! [`HarnessEvent`] callback; nothing is printed.
//!
//! ```no_run
//! use qubitfsm::harness::{evaluate, HarnessConfig, HarnessEvent};
//!
//! let config = HarnessConfig::new("data", "simulate.rs", "data/perf.bin")
//!     .with_perf_runs(3)
//!     .with_score_file("score.txt");
//! let report = evaluate(&config, |event| {
//!     if let HarnessEvent::PerfRun { round, ms, .. } = event {
//!         eprintln!("round {}: {:.2} ms", round, ms);
//!     }
//! })?;
//! println!("score {:.2}", report.score);
//! # Ok::<(), qubitfsm::harness::HarnessError>(())
//! ```

mod process;

pub use process::{run_with_timeout, BuildCommand, RunOutput, OUT_PLACEHOLDER, SRC_PLACEHOLDER};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{Duration, Instant};

use crate::automaton::Automaton;
use crate::input::{decode_gates, InputError};
use crate::protocol::{
    answers_match, find_answer, find_timing, INVALID_OUTPUT, MISSING_TIMING_MS,
};
use crate::score::{self, DEFAULT_PERF_RUNS};
use crate::table::TableError;

/// Time limit for one correctness case.
pub const DEFAULT_CORRECTNESS_TIMEOUT: Duration = Duration::from_secs(120);

/// Time limit for one performance run.
pub const DEFAULT_PERF_TIMEOUT: Duration = Duration::from_secs(480);

/// Extension of case inputs.
pub const INPUT_EXTENSION: &str = "in";

/// Extension of case answers.
pub const ANSWER_EXTENSION: &str = "out";

/// Settings for one evaluation.
///
/// With the `serde` feature only `data_dir`, `program` and `perf_input` are
/// required when deserializing; every other field falls back to its default.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HarnessConfig {
    /// Directory holding `*.in` / `*.out` pairs
    pub data_dir: PathBuf,
    /// Source file handed to the build command as `{src}`
    pub program: PathBuf,
    /// Compiler invocation (default: optimized `rustc`)
    #[cfg_attr(feature = "serde", serde(default))]
    pub build: BuildCommand,
    /// Output binary, `{out}` (default: `program` without its extension)
    #[cfg_attr(feature = "serde", serde(default))]
    pub binary: Option<PathBuf>,
    /// Gate file used for timing
    pub perf_input: PathBuf,
    /// Expected answer for `perf_input` (default: computed in-process)
    #[cfg_attr(feature = "serde", serde(default))]
    pub perf_answer: Option<String>,
    /// Number of timed runs (default: 10)
    #[cfg_attr(feature = "serde", serde(default = "default_perf_runs"))]
    pub perf_runs: usize,
    /// Limit per correctness case (default: 120 s)
    #[cfg_attr(
        feature = "serde",
        serde(default = "default_correctness_timeout")
    )]
    pub correctness_timeout: Duration,
    /// Limit per timed run (default: 480 s)
    #[cfg_attr(feature = "serde", serde(default = "default_perf_timeout"))]
    pub perf_timeout: Duration,
    /// Where to write the score, if anywhere
    #[cfg_attr(feature = "serde", serde(default))]
    pub score_file: Option<PathBuf>,
}

#[cfg(feature = "serde")]
fn default_perf_runs() -> usize {
    DEFAULT_PERF_RUNS
}

#[cfg(feature = "serde")]
fn default_correctness_timeout() -> Duration {
    DEFAULT_CORRECTNESS_TIMEOUT
}

#[cfg(feature = "serde")]
fn default_perf_timeout() -> Duration {
    DEFAULT_PERF_TIMEOUT
}

impl HarnessConfig {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        program: impl Into<PathBuf>,
        perf_input: impl Into<PathBuf>,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            program: program.into(),
            build: BuildCommand::default(),
            binary: None,
            perf_input: perf_input.into(),
            perf_answer: None,
            perf_runs: DEFAULT_PERF_RUNS,
            correctness_timeout: DEFAULT_CORRECTNESS_TIMEOUT,
            perf_timeout: DEFAULT_PERF_TIMEOUT,
            score_file: None,
        }
    }

    pub fn with_build(mut self, build: BuildCommand) -> Self {
        self.build = build;
        self
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = Some(binary.into());
        self
    }

    pub fn with_perf_answer(mut self, answer: impl Into<String>) -> Self {
        self.perf_answer = Some(answer.into());
        self
    }

    pub fn with_perf_runs(mut self, runs: usize) -> Self {
        self.perf_runs = runs;
        self
    }

    pub fn with_correctness_timeout(mut self, timeout: Duration) -> Self {
        self.correctness_timeout = timeout;
        self
    }

    pub fn with_perf_timeout(mut self, timeout: Duration) -> Self {
        self.perf_timeout = timeout;
        self
    }

    pub fn with_score_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.score_file = Some(path.into());
        self
    }

    /// The binary path the build produces and the runs execute.
    pub fn binary_path(&self) -> PathBuf {
        if let Some(binary) = &self.binary {
            return binary.clone();
        }
        let stem = self.program.with_extension("");
        if stem == self.program {
            self.program.with_extension("bin")
        } else {
            stem
        }
    }
}

/// Progress notifications, in the order they occur.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HarnessEvent<'a> {
    /// The build command is about to run.
    Building { command: &'a BuildCommand },
    /// The build succeeded.
    Built { elapsed: Duration },
    /// A correctness case matched; `index` counts from 1.
    CasePassed {
        case: &'a str,
        index: usize,
        total: usize,
    },
    /// Every correctness case matched.
    AllCasesPassed { total: usize },
    /// A timed run finished; `round` counts from 1.
    PerfRun { round: usize, runs: usize, ms: f64 },
    /// Final aggregate.
    Scored { geomean_ms: f64, score: f64 },
}

/// Outcome of a successful evaluation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Evaluation {
    /// Correctness cases that passed, by file name
    pub cases: Vec<String>,
    /// Reported time of each perf run in milliseconds
    pub timings_ms: Vec<f64>,
    /// Geometric mean of `timings_ms`
    pub geomean_ms: f64,
    pub score: f64,
}

/// Reasons an evaluation stops.
#[derive(Debug)]
pub enum HarnessError {
    /// Filesystem access failed.
    Io { path: PathBuf, source: io::Error },
    /// A build command or simulator could not be started.
    Spawn { program: PathBuf, source: io::Error },
    /// The build command exited unsuccessfully.
    Build {
        status: Option<i32>,
        stderr: String,
    },
    /// A run exceeded its time limit and was killed.
    Timeout { input: PathBuf, limit: Duration },
    /// A run exited unsuccessfully.
    ProgramFailed {
        input: PathBuf,
        status: Option<i32>,
        stderr: String,
    },
    /// A correctness case has no `.out` file.
    MissingReference { case: String },
    /// A correctness answer differed from the reference.
    Mismatch {
        case: String,
        expected: String,
        actual: String,
    },
    /// A timed run printed the wrong answer; `round` counts from 1.
    PerfMismatch {
        round: usize,
        expected: String,
        actual: String,
    },
    /// The perf input could not be decoded to compute its answer.
    PerfInput { path: PathBuf, source: InputError },
    /// The embedded tables failed validation.
    Tables(TableError),
    /// No timed runs were configured.
    NoPerfRuns,
}

impl core::fmt::Display for HarnessError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            Self::Spawn { program, source } => {
                write!(f, "failed to start {}: {}", program.display(), source)
            }
            Self::Build { status, stderr } => {
                write!(f, "build failed ({})", fmt_status(*status))?;
                if !stderr.trim().is_empty() {
                    write!(f, ":\n{}", stderr.trim_end())?;
                }
                Ok(())
            }
            Self::Timeout { input, limit } => write!(
                f,
                "run on {} exceeded {:.0} s and was killed",
                input.display(),
                limit.as_secs_f64()
            ),
            Self::ProgramFailed {
                input,
                status,
                stderr,
            } => {
                write!(f, "run on {} failed ({})", input.display(), fmt_status(*status))?;
                if !stderr.trim().is_empty() {
                    write!(f, ": {}", stderr.trim_end())?;
                }
                Ok(())
            }
            Self::MissingReference { case } => write!(f, "test {} has no reference answer", case),
            Self::Mismatch {
                case,
                expected,
                actual,
            } => write!(
                f,
                "test {} failed: expected {}, got {}",
                case, expected, actual
            ),
            Self::PerfMismatch {
                round,
                expected,
                actual,
            } => write!(
                f,
                "performance round {} failed: expected {}, got {}",
                round, expected, actual
            ),
            Self::PerfInput { path, source } => {
                write!(f, "perf input {}: {}", path.display(), source)
            }
            Self::Tables(err) => write!(f, "embedded tables: {}", err),
            Self::NoPerfRuns => write!(f, "at least one performance run is required"),
        }
    }
}

impl std::error::Error for HarnessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } | Self::Spawn { source, .. } => Some(source),
            Self::PerfInput { source, .. } => Some(source),
            Self::Tables(source) => Some(source),
            _ => None,
        }
    }
}

fn fmt_status(status: Option<i32>) -> String {
    match status {
        Some(code) => format!("exit code {}", code),
        None => "killed by signal".into(),
    }
}

/// Run a full evaluation.
pub fn evaluate<F>(config: &HarnessConfig, mut on_event: F) -> Result<Evaluation, HarnessError>
where
    F: FnMut(HarnessEvent<'_>),
{
    if config.perf_runs == 0 {
        return Err(HarnessError::NoPerfRuns);
    }
    let perf_answer = match &config.perf_answer {
        Some(answer) => answer.clone(),
        None => reference_answer(&config.perf_input)?,
    };

    let binary = process::runnable(&config.binary_path());
    build(config, &binary, &mut on_event)?;

    let cases = check_cases(config, &binary, &mut on_event)?;

    let mut timings_ms = Vec::with_capacity(config.perf_runs);
    for round in 1..=config.perf_runs {
        let stdout = run_program(&binary, &config.perf_input, config.perf_timeout)?;
        let actual = find_answer(&stdout).unwrap_or(INVALID_OUTPUT);
        if !answers_match(&perf_answer, actual) {
            return Err(HarnessError::PerfMismatch {
                round,
                expected: perf_answer,
                actual: actual.into(),
            });
        }
        let ms = find_timing(&stdout).unwrap_or(MISSING_TIMING_MS);
        on_event(HarnessEvent::PerfRun {
            round,
            runs: config.perf_runs,
            ms,
        });
        timings_ms.push(ms);
    }

    // perf_runs > 0, so there is at least one sample
    let (geomean_ms, score) = score::evaluate(&timings_ms).unwrap_or((MISSING_TIMING_MS, 0.0));
    on_event(HarnessEvent::Scored { geomean_ms, score });

    if let Some(path) = &config.score_file {
        write_score(path, score)?;
    }

    Ok(Evaluation {
        cases,
        timings_ms,
        geomean_ms,
        score,
    })
}

/// Answer line for a gate file, computed with the embedded automaton.
pub fn reference_answer(input: &Path) -> Result<String, HarnessError> {
    let bytes = fs::read(input).map_err(|source| HarnessError::Io {
        path: input.to_path_buf(),
        source,
    })?;
    let gates = decode_gates(&bytes).map_err(|source| HarnessError::PerfInput {
        path: input.to_path_buf(),
        source,
    })?;
    let automaton = Automaton::canonical().map_err(HarnessError::Tables)?;
    Ok(automaton.final_state(gates).to_string())
}

/// Persist a score as `{:.2}` followed by a newline.
pub fn write_score(path: &Path, score: f64) -> Result<(), HarnessError> {
    fs::write(path, format!("{:.2}\n", score)).map_err(|source| HarnessError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// `*.in` files of a data directory, sorted by name.
pub fn list_cases(data_dir: &Path) -> Result<Vec<PathBuf>, HarnessError> {
    let io_err = |source| HarnessError::Io {
        path: data_dir.to_path_buf(),
        source,
    };
    let mut cases = Vec::new();
    for entry in fs::read_dir(data_dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && path.extension().map_or(false, |ext| ext == INPUT_EXTENSION) {
            cases.push(path);
        }
    }
    cases.sort();
    Ok(cases)
}

fn build<F>(config: &HarnessConfig, binary: &Path, on_event: &mut F) -> Result<(), HarnessError>
where
    F: FnMut(HarnessEvent<'_>),
{
    on_event(HarnessEvent::Building {
        command: &config.build,
    });
    let start = Instant::now();

    let args = config.build.render(&config.program, binary);
    let (program, rest) = match args.split_first() {
        Some(split) => split,
        None => {
            return Err(HarnessError::Build {
                status: None,
                stderr: "empty build command".into(),
            })
        }
    };
    let output = Command::new(program)
        .args(rest)
        .output()
        .map_err(|source| HarnessError::Spawn {
            program: program.into(),
            source,
        })?;
    if !output.status.success() {
        return Err(HarnessError::Build {
            status: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    on_event(HarnessEvent::Built {
        elapsed: start.elapsed(),
    });
    Ok(())
}

fn check_cases<F>(
    config: &HarnessConfig,
    binary: &Path,
    on_event: &mut F,
) -> Result<Vec<String>, HarnessError>
where
    F: FnMut(HarnessEvent<'_>),
{
    let inputs = list_cases(&config.data_dir)?;
    let total = inputs.len();
    let mut passed = Vec::with_capacity(total);

    for (i, input) in inputs.iter().enumerate() {
        let case = case_name(input);
        let expected = expected_answer(input, &case)?;
        let stdout = run_program(binary, input, config.correctness_timeout)?;
        let actual = find_answer(&stdout).unwrap_or(INVALID_OUTPUT);
        if !answers_match(&expected, actual) {
            return Err(HarnessError::Mismatch {
                case,
                expected,
                actual: actual.into(),
            });
        }
        on_event(HarnessEvent::CasePassed {
            case: &case,
            index: i + 1,
            total,
        });
        passed.push(case);
    }

    on_event(HarnessEvent::AllCasesPassed { total });
    Ok(passed)
}

fn case_name(input: &Path) -> String {
    input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// First line of the `.out` file next to `input`, trimmed.
fn expected_answer(input: &Path, case: &str) -> Result<String, HarnessError> {
    let path = input.with_extension(ANSWER_EXTENSION);
    match fs::read_to_string(&path) {
        Ok(text) => Ok(text.lines().next().unwrap_or("").trim().into()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Err(HarnessError::MissingReference {
            case: case.into(),
        }),
        Err(source) => Err(HarnessError::Io { path, source }),
    }
}

fn run_program(binary: &Path, input: &Path, timeout: Duration) -> Result<String, HarnessError> {
    let output = run_with_timeout(Command::new(binary).arg(input), timeout)
        .map_err(|source| HarnessError::Spawn {
            program: binary.to_path_buf(),
            source,
        })?
        .ok_or_else(|| HarnessError::Timeout {
            input: input.to_path_buf(),
            limit: timeout,
        })?;
    check_status(output.status, input, output.stderr)?;
    Ok(output.stdout)
}

fn check_status(status: ExitStatus, input: &Path, stderr: String) -> Result<(), HarnessError> {
    if status.success() {
        Ok(())
    } else {
        Err(HarnessError::ProgramFailed {
            input: input.to_path_buf(),
            status: status.code(),
            stderr,
        })
    }
}
