// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Benchmark variants over the sweep [`Executor`].
//!
//! - **Limit**: fixed run → stop → remove cycle measuring the environment's
//!   ceiling, independent of any declared sequence.
//! - **Custom**: the operation sequence from the benchmark definition.

mod custom;
pub mod executor;
mod limit;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::driver::{self, Driver, DriverOptions};
use crate::error::{BenchError, BenchResult};
use crate::state::{BenchState, BenchStateMachine};
use crate::stats::RunStatistics;
use crate::types::{EngineType, Operation};

pub use custom::CustomBench;
pub use executor::{ContainerTemplate, Executor};
pub use limit::{LimitBench, LIMIT_SEQUENCE};

/// Which composition policy a benchmark uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BenchKind {
    Limit,
    Custom,
}

impl fmt::Display for BenchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limit => write!(f, "limit"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

/// Everything a benchmark needs to construct its driver and containers.
#[derive(Debug, Clone)]
pub struct BenchSetup {
    pub name: String,
    pub engine: EngineType,
    pub driver: DriverOptions,
    pub container: ContainerTemplate,
    /// Declared sequence; the Limit variant ignores it.
    pub commands: Vec<Operation>,
}

/// Lifecycle of one benchmark-driver pairing.
pub trait Bench: Send {
    /// Construct and check the driver, then prepare the variant.
    fn init(&mut self, setup: BenchSetup) -> BenchResult<()> {
        let driver = driver::connect(setup.engine, &setup.driver).map_err(|e| {
            tracing::error!(
                bench = %setup.name,
                engine = %setup.engine,
                error = %e,
                "Driver initialization failed"
            );
            e
        })?;
        self.init_with_driver(setup, driver)
    }

    /// Prepare the variant over an already constructed driver.
    fn init_with_driver(&mut self, setup: BenchSetup, driver: Arc<dyn Driver>) -> BenchResult<()>;

    /// One container through the sequence before committing to a sweep.
    fn validate(&mut self) -> BenchResult<()>;

    /// Sweep levels `1..=threads`, `iterations` per worker.
    fn run(&mut self, threads: usize, iterations: usize, commands: &[Operation]) -> BenchResult<()>;

    /// One snapshot per completed level.
    fn stats(&self) -> &[RunStatistics];

    fn elapsed(&self) -> Duration;

    fn state(&self) -> BenchState;

    fn kind(&self) -> BenchKind;

    /// Benchmark name, variant and engine.
    fn info(&self) -> String;
}

/// Create a benchmark of the given variant, in the Created state.
pub fn new(kind: BenchKind) -> Box<dyn Bench> {
    match kind {
        BenchKind::Limit => Box::new(LimitBench::new()),
        BenchKind::Custom => Box::new(CustomBench::new()),
    }
}

/// State and results shared by both variants.
#[derive(Debug)]
struct BenchCore {
    name: String,
    kind: BenchKind,
    state: BenchStateMachine,
    executor: Option<Executor>,
    results: Vec<RunStatistics>,
}

impl BenchCore {
    fn new(kind: BenchKind) -> Self {
        Self {
            name: String::new(),
            kind,
            state: BenchStateMachine::new(kind.to_string()),
            executor: None,
            results: Vec::new(),
        }
    }

    fn attach(
        &mut self,
        name: String,
        driver: Arc<dyn Driver>,
        template: ContainerTemplate,
    ) -> BenchResult<()> {
        self.state.transition_to(BenchState::Ready)?;
        self.name = name;
        self.executor = Some(Executor::new(driver, template));
        Ok(())
    }

    fn executor(&self) -> BenchResult<&Executor> {
        self.executor.as_ref().ok_or(BenchError::NotInitialized)
    }

    fn validate(&self, commands: &[Operation]) -> BenchResult<()> {
        let executor = self.executor()?;
        self.state.check_transition(BenchState::Running)?;
        tracing::info!(
            bench = %self.name,
            kind = %self.kind,
            engine = %executor.driver().engine(),
            "Pre-flight validation"
        );
        executor.preflight(commands)
    }

    fn run(&mut self, threads: usize, iterations: usize, commands: &[Operation]) -> BenchResult<()> {
        executor::check_sweep_args(threads, iterations, commands)?;
        let executor = self.executor.as_ref().ok_or(BenchError::NotInitialized)?;
        self.state.transition_to(BenchState::Running)?;

        tracing::info!(
            bench = %self.name,
            kind = %self.kind,
            engine = %executor.driver().engine(),
            threads,
            iterations,
            "Starting sweep"
        );

        let outcome = executor.sweep(threads, iterations, commands);
        executor.clean();
        if let Err(e) = executor.driver().close() {
            tracing::warn!(bench = %self.name, error = %e, "Driver close failed");
        }

        self.state.transition_to(BenchState::Completed)?;
        self.results = outcome?;
        Ok(())
    }

    /// Header line, then the driver's own identity report.
    fn info(&self) -> String {
        let Some(executor) = &self.executor else {
            return format!("{} benchmark (not initialized)", self.kind);
        };
        let driver = executor.driver();
        let detail = driver.info().unwrap_or_else(|e| format!("info unavailable: {}", e));
        format!(
            "{} ({} benchmark) on {}\n{}",
            self.name,
            self.kind,
            driver.engine(),
            detail
        )
    }
}
