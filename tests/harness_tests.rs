//! End-to-end harness tests against scripted and generated simulators.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use qubitfsm::harness::{evaluate, BuildCommand, HarnessConfig, HarnessError, HarnessEvent};
use qubitfsm::input::encode_gates;
use qubitfsm::{specialize, Automaton, Gate, SpecializerConfig};

const ZERO_KET: &str = "Final state: alpha = 1.000000000000 + 0.000000000000i, \
                        beta = 0.000000000000 + 0.000000000000i";

/// A data directory plus a shell-script "program" that `cp` builds.
struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("data")).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn case(&self, name: &str, gates: &[Gate], answer: &str) {
        let data = self.path("data");
        fs::write(data.join(format!("{}.in", name)), encode_gates(gates)).unwrap();
        fs::write(data.join(format!("{}.out", name)), format!("{}\n", answer)).unwrap();
    }

    fn script(&self, body: &str) -> PathBuf {
        let path = self.path("sim.sh");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn perf_input(&self, gates: &[Gate]) -> PathBuf {
        let path = self.path("perf.bin");
        fs::write(&path, encode_gates(gates)).unwrap();
        path
    }

    fn config(&self, program: &Path, perf_input: &Path) -> HarnessConfig {
        HarnessConfig::new(self.path("data"), program, perf_input)
            .with_build(BuildCommand::new(["cp", "{src}", "{out}"]))
            .with_binary(self.path("sim"))
            .with_perf_runs(3)
            .with_correctness_timeout(Duration::from_secs(20))
            .with_perf_timeout(Duration::from_secs(20))
    }
}

fn echo_answer(answer: &str, timing: &str) -> String {
    format!("echo '{}'\necho 'Time taken: {}'", answer, timing)
}

// ============================================================================
// Passing runs
// ============================================================================

#[test]
fn test_passing_program_scores() {
    let fx = Fixture::new();
    fx.case("a", &[], ZERO_KET);
    fx.case("b", &[Gate::H, Gate::H], ZERO_KET);
    let program = fx.script(&echo_answer(ZERO_KET, "2.00 ms"));
    let perf = fx.perf_input(&[Gate::X, Gate::X]);
    let config = fx.config(&program, &perf).with_score_file(fx.path("score.txt"));

    let mut events = Vec::new();
    let report = evaluate(&config, |event| events.push(format!("{:?}", event))).unwrap();

    assert_eq!(report.cases, ["a.in", "b.in"]);
    assert_eq!(report.timings_ms, [2.0, 2.0, 2.0]);
    assert!((report.geomean_ms - 2.0).abs() < 1e-12);
    // between the 100 and 90 breakpoints
    assert!(report.score > 90.0 && report.score < 100.0);
    assert_eq!(
        fs::read_to_string(fx.path("score.txt")).unwrap(),
        format!("{:.2}\n", report.score)
    );

    assert!(events[0].starts_with("Building"));
    assert!(events[1].starts_with("Built"));
    assert_eq!(events.iter().filter(|e| e.starts_with("CasePassed")).count(), 2);
    assert_eq!(events.iter().filter(|e| e.starts_with("PerfRun")).count(), 3);
    assert!(events.last().unwrap().starts_with("Scored"));
}

#[test]
fn test_negative_zero_matches() {
    let fx = Fixture::new();
    fx.case("a", &[], ZERO_KET);
    let printed = "Final state: alpha = 1.000000000000 + -0.000000000000i, \
                   beta = -0.000000000000 + 0.000000000000i";
    let program = fx.script(&echo_answer(printed, "1.00 ms"));
    let perf = fx.perf_input(&[]);
    let report = evaluate(&fx.config(&program, &perf), |_| {}).unwrap();
    assert_eq!(report.score, 100.0);
}

#[test]
fn test_missing_timing_counts_as_slow() {
    let fx = Fixture::new();
    let program = fx.script(&format!("echo '{}'", ZERO_KET));
    let perf = fx.perf_input(&[]);
    let report = evaluate(&fx.config(&program, &perf), |_| {}).unwrap();
    assert!(report.cases.is_empty());
    assert_eq!(report.timings_ms, [1e9; 3]);
    assert_eq!(report.score, 0.0);
}

#[test]
fn test_explicit_perf_answer() {
    let fx = Fixture::new();
    let answer = "Final state: alpha = 0.000000000000 + -0.707106781187i, \
                  beta = 0.707106781187 + 0.000000000000i";
    let program = fx.script(&echo_answer(answer, "5.00 ms"));
    // the file content is irrelevant once the answer is given
    let perf = fx.path("missing.bin");
    let config = fx.config(&program, &perf).with_perf_answer(answer);
    let report = evaluate(&config, |_| {}).unwrap();
    assert_eq!(report.timings_ms.len(), 3);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_mismatch_aborts() {
    let fx = Fixture::new();
    fx.case("a", &[], ZERO_KET);
    fx.case("b", &[Gate::X], "Final state: something else");
    let program = fx.script(&echo_answer(ZERO_KET, "1.00 ms"));
    let perf = fx.perf_input(&[]);

    let mut passed = Vec::new();
    let err = evaluate(&fx.config(&program, &perf), |event| {
        if let HarnessEvent::CasePassed { case, .. } = event {
            passed.push(case.to_string());
        }
    })
    .unwrap_err();

    assert_eq!(passed, ["a.in"]);
    match err {
        HarnessError::Mismatch {
            case,
            expected,
            actual,
        } => {
            assert_eq!(case, "b.in");
            assert_eq!(expected, "Final state: something else");
            assert_eq!(actual, ZERO_KET);
        }
        other => panic!("unexpected {}", other),
    }
}

#[test]
fn test_invalid_output_reported() {
    let fx = Fixture::new();
    fx.case("a", &[], ZERO_KET);
    let program = fx.script("echo hello");
    let perf = fx.perf_input(&[]);
    match evaluate(&fx.config(&program, &perf), |_| {}) {
        Err(HarnessError::Mismatch { actual, .. }) => assert_eq!(actual, "<invalid output>"),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_perf_mismatch_aborts() {
    let fx = Fixture::new();
    let program = fx.script(&echo_answer(ZERO_KET, "1.00 ms"));
    // X|0> = |1>, which the script does not print
    let perf = fx.perf_input(&[Gate::X]);
    match evaluate(&fx.config(&program, &perf), |_| {}) {
        Err(HarnessError::PerfMismatch { round, actual, .. }) => {
            assert_eq!(round, 1);
            assert_eq!(actual, ZERO_KET);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_timeout_kills_program() {
    let fx = Fixture::new();
    fx.case("a", &[], ZERO_KET);
    let program = fx.script("exec sleep 30");
    let perf = fx.perf_input(&[]);
    let config = fx
        .config(&program, &perf)
        .with_correctness_timeout(Duration::from_millis(300));
    match evaluate(&config, |_| {}) {
        Err(HarnessError::Timeout { input, limit }) => {
            assert!(input.ends_with("a.in"));
            assert_eq!(limit, Duration::from_millis(300));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_background_process_holding_output_times_out() {
    let fx = Fixture::new();
    fx.case("a", &[], ZERO_KET);
    // the script exits at once, but `sleep` inherits its stdout
    let program = fx.script(&format!("sleep 5 &\n{}", echo_answer(ZERO_KET, "1.00 ms")));
    let perf = fx.perf_input(&[]);
    let config = fx
        .config(&program, &perf)
        .with_correctness_timeout(Duration::from_millis(300))
        .with_perf_timeout(Duration::from_millis(300));

    let start = Instant::now();
    match evaluate(&config, |_| {}) {
        Err(HarnessError::Timeout { input, limit }) => {
            assert!(input.ends_with("a.in"));
            assert_eq!(limit, Duration::from_millis(300));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(start.elapsed() < Duration::from_secs(4));
}

#[test]
fn test_failing_program_aborts() {
    let fx = Fixture::new();
    fx.case("a", &[], ZERO_KET);
    let program = fx.script("echo broken >&2\nexit 2");
    let perf = fx.perf_input(&[]);
    match evaluate(&fx.config(&program, &perf), |_| {}) {
        Err(HarnessError::ProgramFailed { status, stderr, .. }) => {
            assert_eq!(status, Some(2));
            assert_eq!(stderr.trim(), "broken");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_build_failure_is_fatal() {
    let fx = Fixture::new();
    let program = fx.script("true");
    let perf = fx.perf_input(&[]);
    let config = fx
        .config(&program, &perf)
        .with_build(BuildCommand::new(["sh", "-c", "echo 'no compiler' >&2; exit 1"]));
    match evaluate(&config, |_| {}) {
        Err(HarnessError::Build { status, stderr }) => {
            assert_eq!(status, Some(1));
            assert_eq!(stderr.trim(), "no compiler");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_missing_reference() {
    let fx = Fixture::new();
    fs::write(fx.path("data").join("lonely.in"), encode_gates(&[])).unwrap();
    let program = fx.script(&echo_answer(ZERO_KET, "1.00 ms"));
    let perf = fx.perf_input(&[]);
    assert!(matches!(
        evaluate(&fx.config(&program, &perf), |_| {}),
        Err(HarnessError::MissingReference { .. })
    ));
}

// ============================================================================
// Generated programs
// ============================================================================

fn rustc() -> String {
    std::env::var("RUSTC").unwrap_or_else(|_| "rustc".into())
}

fn rustc_build() -> BuildCommand {
    BuildCommand::new([
        rustc().as_str(),
        "--edition=2021",
        "-O",
        "{src}",
        "-o",
        "{out}",
    ])
}

/// Compile generated simulators with rustc and score them against in-process
/// answers.
#[test]
fn test_generated_programs_pass() {
    let automaton = Automaton::canonical().unwrap();
    let fx = Fixture::new();

    let mut cases: Vec<Vec<Gate>> = vec![
        vec![],
        vec![Gate::H],
        vec![Gate::H, Gate::S, Gate::Y, Gate::Z, Gate::X, Gate::H, Gate::S],
        vec![Gate::S; 11],
    ];
    // long enough to take the threaded path, and off every batch grid
    cases.push((0..1009).map(|i| Gate::ALL[(i * 3 + i / 11) % 5]).collect());
    for (i, gates) in cases.iter().enumerate() {
        let answer = automaton.final_state(gates.iter().copied()).to_string();
        fx.case(&format!("case{}", i), gates, &answer);
    }
    let perf_gates: Vec<Gate> = (0..100_000).map(|i| Gate::ALL[(i * 7 + i / 3) % 5]).collect();
    let perf = fx.perf_input(&perf_gates);

    for (name, config) in [
        ("stepped", SpecializerConfig::stepped()),
        ("unrolled3", SpecializerConfig::unrolled(3).unwrap()),
        (
            "stepped_threads",
            SpecializerConfig::stepped()
                .with_threads(3)
                .with_parallel_min_gates(100),
        ),
        (
            "unrolled4_threads",
            SpecializerConfig::unrolled(4)
                .unwrap()
                .with_threads(4)
                .with_parallel_min_gates(100),
        ),
    ] {
        let program = fx.path(&format!("{}.rs", name));
        fs::write(&program, specialize(&automaton, &config)).unwrap();
        let harness = HarnessConfig::new(fx.path("data"), &program, &perf)
            .with_build(rustc_build())
            .with_perf_runs(2);

        let report = evaluate(&harness, |_| {}).unwrap_or_else(|e| panic!("{}: {}", name, e));
        assert_eq!(report.cases.len(), cases.len(), "{}", name);
        assert_eq!(report.timings_ms.len(), 2);
        assert!(report.timings_ms.iter().all(|&t| t < 1e9), "{}", name);
    }
}

/// Largest batch length: 15,625 table rows still compile and answer correctly.
#[test]
fn test_generated_max_batch_program() {
    let automaton = Automaton::canonical().unwrap();
    let fx = Fixture::new();
    let gates: Vec<Gate> = (0..1000).map(|i| Gate::ALL[(i * 11 + i / 5) % 5]).collect();
    fx.case("long", &gates, &automaton.final_state(gates.iter().copied()).to_string());
    let perf = fx.perf_input(&gates[..997]);

    let program = fx.path("unrolled6.rs");
    let config = SpecializerConfig::unrolled(qubitfsm::sequence::MAX_BATCH_LEN).unwrap();
    fs::write(&program, specialize(&automaton, &config)).unwrap();
    let harness = HarnessConfig::new(fx.path("data"), &program, &perf)
        .with_build(rustc_build())
        .with_perf_runs(1);
    let report = evaluate(&harness, |_| {}).unwrap();
    assert_eq!(report.cases, ["long.in"]);
}

/// Generated programs reject malformed gate files on stderr with exit code 1.
#[test]
fn test_generated_program_rejects_malformed_input() {
    let automaton = Automaton::canonical().unwrap();
    let fx = Fixture::new();
    let src = fx.path("sim.rs");
    let bin = fx.path("sim");
    fs::write(&src, specialize(&automaton, &SpecializerConfig::stepped())).unwrap();
    let status = Command::new(rustc())
        .args(["--edition=2021", "-O"])
        .arg(&src)
        .arg("-o")
        .arg(&bin)
        .status()
        .unwrap();
    assert!(status.success());

    let mut bad_gate = encode_gates(&[Gate::H, Gate::X]);
    bad_gate[9] = b'Q';
    let mut truncated = encode_gates(&[Gate::H, Gate::X, Gate::Y]);
    truncated.pop();
    let inputs: [(&str, Vec<u8>); 4] = [
        ("bad_gate", bad_gate),
        ("truncated", truncated),
        ("short_header", vec![1, 0, 0]),
        ("empty", vec![]),
    ];
    for (name, bytes) in inputs {
        let path = fx.path(name);
        fs::write(&path, bytes).unwrap();
        let output = Command::new(&bin).arg(&path).output().unwrap();
        assert_eq!(output.status.code(), Some(1), "{}", name);
        assert!(output.stdout.is_empty(), "{}", name);
        assert!(!output.stderr.is_empty(), "{}", name);
    }

    // header only: zero gates is valid
    let path = fx.path("header_only");
    fs::write(&path, encode_gates(&[])).unwrap();
    let output = Command::new(&bin).arg(&path).output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with(ZERO_KET));

    // missing argument and missing file
    assert_eq!(Command::new(&bin).output().unwrap().status.code(), Some(1));
    let missing = Command::new(&bin).arg(fx.path("nope")).output().unwrap();
    assert_eq!(missing.status.code(), Some(1));
}
