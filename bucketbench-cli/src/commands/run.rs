// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `bucketbench run` command - Execute the benchmarks of a definition.
//!
//! The optional Limit benchmark runs first against the first driver entry,
//! then one Custom benchmark per driver entry. Pairings run one after
//! another; a failed pairing is reported and the session moves on.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bucketbench_core::bench::{self, LIMIT_SEQUENCE};
use bucketbench_core::{
    BenchKind, BenchSetup, BenchmarkDefinition, ConfigLoader, ContainerTemplate, DriverConfig,
    DriverOptions, EngineType, Operation, RunStatistics,
};

use crate::report;
use crate::reporter::{JsonReport, JsonReporter};

/// Flags of the `run` subcommand besides the definition path.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub skip_limit: bool,
    pub trace: bool,
    pub limit_threads: Option<usize>,
    pub limit_iterations: Option<usize>,
    pub output: Option<PathBuf>,
}

/// One benchmark-driver pairing, ready to run.
#[derive(Debug, Clone)]
pub struct PlannedBench {
    pub kind: BenchKind,
    pub setup: BenchSetup,
    pub threads: usize,
    pub iterations: usize,
}

/// How far a pairing got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    Validate,
    Run,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Init => write!(f, "driver initialization"),
            Self::Validate => write!(f, "pre-flight validation"),
            Self::Run => write!(f, "sweep"),
        }
    }
}

/// Result of one pairing.
#[derive(Debug, Clone)]
pub struct BenchOutcome {
    pub name: String,
    pub kind: BenchKind,
    pub engine: EngineType,
    pub commands: Vec<Operation>,
    pub info: String,
    pub elapsed: Duration,
    pub results: Vec<RunStatistics>,
    pub failure: Option<(Stage, String)>,
}

pub async fn execute(file: &Path, options: RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(file = %file.display(), "Loading benchmark definition");

    let def = match ConfigLoader::load_file(file) {
        Ok(def) => def,
        Err(e) => {
            eprintln!("✗ Failed to load benchmark definition:");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    let planned = plan(&def, &options)?;
    let mut outcomes = Vec::with_capacity(planned.len());

    for entry in planned {
        let outcome = tokio::task::spawn_blocking(move || execute_bench(entry)).await?;
        println!("{}", report::render(&outcome));
        outcomes.push(outcome);
    }

    if let Some(path) = &options.output {
        let report = JsonReport::new(&def.name, &outcomes);
        JsonReporter::write(path, &report)?;
        println!("Report written to {}", path.display());
    }

    let failed: Vec<_> = outcomes.iter().filter(|o| o.failure.is_some()).collect();
    if !failed.is_empty() {
        for outcome in &failed {
            if let Some((stage, reason)) = &outcome.failure {
                eprintln!(
                    "✗ {} ({} on {}) failed during {}: {}",
                    outcome.name, outcome.kind, outcome.engine, stage, reason
                );
            }
        }
        std::process::exit(1);
    }

    Ok(())
}

/// Expand a definition into the ordered pairings of a session.
pub fn plan(
    def: &BenchmarkDefinition,
    options: &RunOptions,
) -> Result<Vec<PlannedBench>, bucketbench_core::ValidationError> {
    let mut planned = Vec::with_capacity(def.drivers.len() + 1);

    if !options.skip_limit {
        if let Some(first) = def.drivers.first() {
            let threads = options.limit_threads.unwrap_or(first.threads);
            let iterations = options.limit_iterations.unwrap_or(first.iterations);
            bench::executor::check_sweep_args(threads, iterations, LIMIT_SEQUENCE)?;
            planned.push(PlannedBench {
                kind: BenchKind::Limit,
                setup: setup_for(def, first, options.trace, &format!("{}-limit", def.name)),
                threads,
                iterations,
            });
        }
    }

    for driver in &def.drivers {
        planned.push(PlannedBench {
            kind: BenchKind::Custom,
            setup: setup_for(def, driver, options.trace, &def.name),
            threads: driver.threads,
            iterations: driver.iterations,
        });
    }

    Ok(planned)
}

fn setup_for(def: &BenchmarkDefinition, driver: &DriverConfig, trace: bool, name: &str) -> BenchSetup {
    BenchSetup {
        name: name.to_string(),
        engine: driver.engine,
        driver: DriverOptions {
            binary: driver.binary.clone(),
            timeout: def.timeout,
        },
        container: ContainerTemplate {
            image: def.image_for(driver.engine),
            command: def.command.clone(),
            detached: def.detached,
            trace,
        },
        commands: def.commands.clone(),
    }
}

/// Init, validate and sweep one pairing. Blocks for the whole sweep.
fn execute_bench(entry: PlannedBench) -> BenchOutcome {
    let PlannedBench {
        kind,
        setup,
        threads,
        iterations,
    } = entry;

    let commands = match kind {
        BenchKind::Limit => LIMIT_SEQUENCE.to_vec(),
        BenchKind::Custom => setup.commands.clone(),
    };
    let mut outcome = BenchOutcome {
        name: setup.name.clone(),
        kind,
        engine: setup.engine,
        commands,
        info: String::new(),
        elapsed: Duration::ZERO,
        results: Vec::new(),
        failure: None,
    };

    let mut bench = bench::new(kind);
    if let Err(e) = bench.init(setup) {
        outcome.failure = Some((Stage::Init, e.to_string()));
        return outcome;
    }
    outcome.info = bench.info();

    if let Err(e) = bench.validate() {
        tracing::error!(bench = %outcome.name, error = %e, "Pre-flight validation failed");
        outcome.failure = Some((Stage::Validate, e.to_string()));
        return outcome;
    }

    let result = bench.run(threads, iterations, &outcome.commands);
    outcome.elapsed = bench.elapsed();
    outcome.results = bench.stats().to_vec();
    if let Err(e) = result {
        tracing::error!(bench = %outcome.name, error = %e, "Benchmark run failed");
        outcome.failure = Some((Stage::Run, e.to_string()));
    }

    outcome
}
