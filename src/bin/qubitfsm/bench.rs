//! Evaluation runner: prints harness progress and writes reports.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use qubitfsm::harness::{evaluate, Evaluation, HarnessConfig, HarnessEvent};

/// Report written by `--json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchReport {
    pub program: String,
    pub build_command: String,
    pub perf_input: String,
    #[serde(flatten)]
    pub evaluation: Evaluation,
}

/// Run an evaluation, printing progress to stderr.
pub fn run_bench(config: &HarnessConfig, output_json: Option<&Path>) -> Result<Evaluation> {
    eprintln!("Evaluating {}...", config.program.display());
    eprintln!("  Data directory: {}", config.data_dir.display());
    eprintln!("  Perf input: {}", config.perf_input.display());
    eprintln!("  Perf runs: {}", config.perf_runs);
    eprintln!();

    let evaluation = evaluate(config, print_event)
        .with_context(|| format!("Evaluation of {} failed", config.program.display()))?;

    if let Some(path) = output_json {
        let report = BenchReport {
            program: config.program.display().to_string(),
            build_command: config.build.to_string(),
            perf_input: config.perf_input.display().to_string(),
            evaluation: evaluation.clone(),
        };
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json + "\n")
            .with_context(|| format!("Failed to write {}", path.display()))?;
        eprintln!("Wrote report to {}", path.display());
    }
    if let Some(path) = &config.score_file {
        eprintln!("Wrote score to {}", path.display());
    }

    Ok(evaluation)
}

fn print_event(event: HarnessEvent<'_>) {
    match event {
        HarnessEvent::Building { command } => eprintln!("Building: {}", command),
        HarnessEvent::Built { elapsed } => {
            eprintln!("  built in {:.2} s", elapsed.as_secs_f64())
        }
        HarnessEvent::CasePassed { case, index, total } => {
            eprintln!("  [{}/{}] {} ok", index, total, case)
        }
        HarnessEvent::AllCasesPassed { total } => {
            eprintln!("All {} tests passed.", total);
            eprintln!();
        }
        HarnessEvent::PerfRun { round, ms, .. } => {
            eprintln!("Round {}: time = {:.6} ms", round, ms)
        }
        HarnessEvent::Scored { geomean_ms, score } => {
            eprintln!();
            eprintln!("Geomean: {:.6} ms", geomean_ms);
            eprintln!("Score: {:.2}", score);
        }
    }
}
