// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Limit benchmark: the fixed run → stop → remove cycle.

use std::sync::Arc;
use std::time::Duration;

use crate::bench::{Bench, BenchCore, BenchKind, BenchSetup};
use crate::driver::Driver;
use crate::error::{BenchResult, ValidationError};
use crate::state::BenchState;
use crate::stats::RunStatistics;
use crate::types::Operation;

/// Sequence every Limit run uses, whatever the caller passes.
pub const LIMIT_SEQUENCE: &[Operation] = &[Operation::Run, Operation::Stop, Operation::Remove];

#[derive(Debug)]
pub struct LimitBench {
    core: BenchCore,
}

impl LimitBench {
    pub fn new() -> Self {
        Self {
            core: BenchCore::new(BenchKind::Limit),
        }
    }
}

impl Default for LimitBench {
    fn default() -> Self {
        Self::new()
    }
}

impl Bench for LimitBench {
    fn init_with_driver(&mut self, setup: BenchSetup, driver: Arc<dyn Driver>) -> BenchResult<()> {
        let needs_image = setup.engine.requires_image() || setup.engine.requires_rootfs();
        if needs_image && setup.container.image.is_empty() {
            return Err(ValidationError::MissingRequiredField {
                field: "image",
                context: format!("limit benchmark on {}", setup.engine),
            }
            .into());
        }
        let info = driver.info()?;
        tracing::debug!(bench = %setup.name, info = %info, "Limit driver info");
        self.core.attach(setup.name, driver, setup.container)
    }

    fn validate(&mut self) -> BenchResult<()> {
        self.core.validate(LIMIT_SEQUENCE)
    }

    fn run(&mut self, threads: usize, iterations: usize, _commands: &[Operation]) -> BenchResult<()> {
        self.core.run(threads, iterations, LIMIT_SEQUENCE)
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
        BenchKind::Limit
    }

    fn info(&self) -> String {
        self.core.info()
    }
}
