// Copyright (c) 2026 Custody Contributors. MIT License.
// See LICENSE for details.

//! # Custody CLI
//!
//! Entry point for the `custody` binary. Parses CLI arguments, initializes
//! logging, and dispatches to one of three subcommands:
//!
//! - `run`     drive a JSON scenario through a fresh in-memory runtime
//! - `predict` compute a vault identity offline
//! - `version` print build version information
//!
//! Step reports, events and metrics go to stdout. Logs go to stderr.

mod cli;
mod logging;
mod metrics;
mod scenario;

use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;

use custody_protocol::config::{PROTOCOL_VERSION, STANDARD_VAULT_LOGIC_VERSION};

use cli::{Commands, CustodyCli};
use metrics::RunMetrics;
use scenario::ScenarioRunner;

fn main() -> Result<ExitCode> {
    let cli = CustodyCli::parse();
    logging::init_logging(&cli.logging.log_level, cli.logging.log_format);

    match cli.command {
        Commands::Run(args) => run_scenario(args),
        Commands::Predict(args) => {
            predict(args)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Version => {
            print_version();
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Runs every step of a scenario. Exits non-zero if any step contradicted
/// its expectation.
fn run_scenario(args: cli::RunArgs) -> Result<ExitCode> {
    let scenario = scenario::load(&args.scenario)?;
    let metrics = RunMetrics::new()?;
    let mut runner = ScenarioRunner::new();

    tracing::info!(
        scenario = scenario.name.as_deref().unwrap_or("unnamed"),
        path = %args.scenario.display(),
        steps = scenario.steps.len(),
        "running scenario"
    );

    let mut mismatches = 0usize;
    for (index, step) in scenario.steps.iter().enumerate() {
        let logs_before = runner.runtime().logs().len();
        let started = Instant::now();
        let report = runner.run_step(index, step)?;
        let elapsed = started.elapsed().as_secs_f64();

        let emitted = runner.runtime().logs().len().saturating_sub(logs_before);
        metrics.events_emitted_total.inc_by(emitted as u64);
        metrics.observe_step(report.op, report.ok, report.matched, elapsed);
        if !report.matched {
            mismatches += 1;
        }

        let line = serde_json::to_string(&report).context("failed to encode step report")?;
        println!("{line}");
    }

    if args.events {
        for entry in runner.runtime().logs() {
            let line = serde_json::to_string(entry).context("failed to encode log entry")?;
            println!("{line}");
        }
    }

    if args.metrics {
        print!("{}", metrics.encode()?);
    }

    tracing::info!(
        steps = scenario.steps.len(),
        mismatches,
        events = runner.runtime().logs().len(),
        "scenario finished"
    );

    if mismatches == 0 {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::error!(mismatches, "scenario expectations not met");
        Ok(ExitCode::FAILURE)
    }
}

/// Computes a vault identity without a runtime. The answer is the same
/// before and after allocation.
fn predict(args: cli::PredictArgs) -> Result<()> {
    let names = ScenarioRunner::new();
    let registry = names.resolve(&args.registry)?;
    let owner = names.resolve(&args.owner)?;

    let vault = custody_contracts::vault_identity(&registry, &owner)
        .context("cannot predict a vault identity for these inputs")?;

    tracing::debug!(%registry, %owner, %vault, "vault identity predicted");
    println!("{}", vault.to_hex());
    Ok(())
}

fn print_version() {
    println!("custody {}", env!("CARGO_PKG_VERSION"));
    println!("  protocol:      {PROTOCOL_VERSION}");
    println!("  vault logic:   v{STANDARD_VAULT_LOGIC_VERSION}");
}
