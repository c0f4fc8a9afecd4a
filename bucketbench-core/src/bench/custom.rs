// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Custom benchmark: the operation sequence declared in the definition.

use std::sync::Arc;
use std::time::Duration;

use crate::bench::{Bench, BenchCore, BenchKind, BenchSetup};
use crate::driver::Driver;
use crate::error::BenchResult;
use crate::state::BenchState;
use crate::stats::RunStatistics;
use crate::types::Operation;

#[derive(Debug)]
pub struct CustomBench {
    core: BenchCore,
    commands: Vec<Operation>,
}

impl CustomBench {
    pub fn new() -> Self {
        Self {
            core: BenchCore::new(BenchKind::Custom),
            commands: Vec::new(),
        }
    }

    /// Sequence recorded at init.
    pub fn commands(&self) -> &[Operation] {
        &self.commands
    }
}

impl Default for CustomBench {
    fn default() -> Self {
        Self::new()
    }
}

impl Bench for CustomBench {
    fn init_with_driver(&mut self, setup: BenchSetup, driver: Arc<dyn Driver>) -> BenchResult<()> {
        self.core.attach(setup.name, driver, setup.container)?;
        self.commands = setup.commands;
        Ok(())
    }

    fn validate(&mut self) -> BenchResult<()> {
        self.core.validate(&self.commands)
    }

    /// An empty `commands` falls back to the sequence recorded at init.
    fn run(&mut self, threads: usize, iterations: usize, commands: &[Operation]) -> BenchResult<()> {
        let commands = if commands.is_empty() {
            self.commands.clone()
        } else {
            commands.to_vec()
        };
        self.core.run(threads, iterations, &commands)
    }

    fn stats(&self) -> &[RunStatistics] {
        &self.core.results
    }

    fn elapsed(&self) -> Duration {
        self.core.state.elapsed()
    }

    fn state(&self) -> BenchState {
        self.core.state.state()
    }

    fn kind(&self) -> BenchKind {
        BenchKind::Custom
    }

    fn info(&self) -> String {
        self.core.info()
    }
}
