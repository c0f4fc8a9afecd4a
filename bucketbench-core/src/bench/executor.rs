// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Concurrency sweep scheduler.
//!
//! For each level `t` in `1..=threads`, `t` workers run in parallel, each
//! applying the operation sequence to `iterations` fresh containers. Levels
//! are strictly sequential: the next level starts only after every worker of
//! the previous one has joined and leftovers have been cleaned.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crate::driver::{Container, Driver};
use crate::error::{BenchError, BenchResult, ValidationError};
use crate::registry::ContainerRegistry;
use crate::stats::{RunStatistics, StatsCollector};
use crate::types::{BenchId, ContainerName, Operation};

/// Level number reserved for the pre-flight pass.
const PREFLIGHT_LEVEL: usize = 0;

/// Container parameters shared by every instance of a benchmark.
#[derive(Debug, Clone, Default)]
pub struct ContainerTemplate {
    pub image: String,
    pub command: Option<String>,
    pub detached: bool,
    pub trace: bool,
}

/// Drives one engine through concurrency sweeps.
#[derive(Debug)]
pub struct Executor {
    id: BenchId,
    driver: Arc<dyn Driver>,
    registry: Arc<ContainerRegistry>,
    template: ContainerTemplate,
}

impl Executor {
    pub fn new(driver: Arc<dyn Driver>, template: ContainerTemplate) -> Self {
        Self {
            id: BenchId::next(),
            driver,
            registry: ContainerRegistry::new_shared(),
            template,
        }
    }

    pub fn id(&self) -> &BenchId {
        &self.id
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    /// Containers created by this executor and not yet confirmed gone.
    pub fn registry(&self) -> &ContainerRegistry {
        &self.registry
    }

    /// Run levels `1..=threads`, one [`RunStatistics`] per level.
    pub fn sweep(
        &self,
        threads: usize,
        iterations: usize,
        commands: &[Operation],
    ) -> BenchResult<Vec<RunStatistics>> {
        check_sweep_args(threads, iterations, commands)?;

        let mut results = Vec::with_capacity(threads);
        for level in 1..=threads {
            let stats = self.run_level(level, iterations, commands)?;
            tracing::info!(
                bench = %self.id,
                engine = %self.driver.engine(),
                level = level,
                elapsed_ms = stats.elapsed().as_millis() as u64,
                errors = stats.total_errors(),
                "Level complete"
            );
            results.push(stats);
        }
        Ok(results)
    }

    /// Run one concurrency level and block until all its workers finish.
    pub fn run_level(
        &self,
        level: usize,
        iterations: usize,
        commands: &[Operation],
    ) -> BenchResult<RunStatistics> {
        let collector = StatsCollector::new();
        let start = Instant::now();

        let panicked = thread::scope(|scope| {
            let handles: Vec<_> = (0..level)
                .map(|worker| {
                    let collector = &collector;
                    scope.spawn(move || {
                        for iteration in 0..iterations {
                            self.run_iteration(level, worker, iteration, commands, collector);
                        }
                    })
                })
                .collect();

            handles
                .into_iter()
                .enumerate()
                .filter_map(|(worker, handle)| handle.join().err().map(|_| worker))
                .min()
        });
        let elapsed = start.elapsed();

        self.clean();

        if let Some(worker) = panicked {
            return Err(BenchError::WorkerPanicked { level, worker });
        }

        Ok(collector.seal(level, iterations, elapsed))
    }

    /// One container through the whole sequence. Per-operation failures are
    /// counted and the sequence carries on; the engine decides legality.
    fn run_iteration(
        &self,
        level: usize,
        worker: usize,
        iteration: usize,
        commands: &[Operation],
        collector: &StatsCollector,
    ) {
        let ctr = match self.create(level, worker, iteration) {
            Ok(ctr) => ctr,
            Err(e) => {
                tracing::warn!(level, worker, iteration, error = %e, "Container create failed");
                collector.record_create_error();
                return;
            }
        };

        let mut live = true;
        for &op in commands {
            match self.driver.apply(op, &ctr) {
                Ok(out) => {
                    tracing::debug!(
                        container = %ctr.name(),
                        operation = %op,
                        elapsed_ms = out.elapsed_ms(),
                        "Operation complete"
                    );
                    collector.record_success(op, out.elapsed);
                    match op {
                        Operation::Run => live = true,
                        Operation::Remove => live = false,
                        _ => {}
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        container = %ctr.name(),
                        operation = %op,
                        error = %e,
                        output = %e.output(),
                        "Operation failed"
                    );
                    collector.record_error(op);
                }
            }
        }

        self.settle(ctr.name(), live);
    }

    fn create(&self, level: usize, worker: usize, iteration: usize) -> BenchResult<Container> {
        let name = ContainerName::for_iteration(&self.id, level, worker, iteration)?;
        let t = &self.template;
        let ctr = self.driver.create(
            name.clone(),
            &t.image,
            t.command.as_deref(),
            t.detached,
            t.trace,
        )?;
        self.registry.track(name);
        Ok(ctr)
    }

    /// Forget a removed container, or reconcile one that may still exist.
    fn settle(&self, name: &ContainerName, live: bool) {
        if !live {
            self.registry.release(name);
            return;
        }
        match self.driver.clean(std::slice::from_ref(name)) {
            Ok(()) => {
                self.registry.release(name);
            }
            Err(e) => {
                tracing::warn!(container = %name, error = %e, "Iteration cleanup failed");
            }
        }
    }

    /// Best-effort removal of everything still in the registry.
    ///
    /// Failures are logged, never returned: a dirty engine does not stop the
    /// sweep from advancing.
    pub fn clean(&self) {
        let leftovers = self.registry.leftovers();
        match self.driver.clean(&leftovers) {
            Ok(()) => self.registry.release_all(&leftovers),
            Err(e) => tracing::warn!(
                bench = %self.id,
                engine = %self.driver.engine(),
                count = leftovers.len(),
                error = %e,
                "Cleanup failed"
            ),
        }
    }

    /// Single container through the full sequence, failing on the first error.
    pub fn preflight(&self, commands: &[Operation]) -> BenchResult<()> {
        let ctr = self.create(PREFLIGHT_LEVEL, 0, 0)?;

        let mut live = true;
        let mut failure = None;
        for &op in commands {
            match self.driver.apply(op, &ctr) {
                Ok(_) => match op {
                    Operation::Run => live = true,
                    Operation::Remove => live = false,
                    _ => {}
                },
                Err(e) => {
                    failure = Some(BenchError::ValidationRunFailed {
                        operation: op.to_string(),
                        reason: e.to_string(),
                    });
                    break;
                }
            }
        }

        self.settle(ctr.name(), live);
        failure.map_or(Ok(()), Err)
    }
}

/// Reject sweep parameters that could never touch a container.
pub fn check_sweep_args(
    threads: usize,
    iterations: usize,
    commands: &[Operation],
) -> Result<(), ValidationError> {
    if threads == 0 {
        return Err(ValidationError::InvalidFieldValue {
            field: "threads",
            value: "0".to_string(),
            reason: "At least one thread is required".to_string(),
        });
    }
    if iterations == 0 {
        return Err(ValidationError::InvalidFieldValue {
            field: "iterations",
            value: "0".to_string(),
            reason: "At least one iteration is required".to_string(),
        });
    }
    if commands.is_empty() {
        return Err(ValidationError::SchemaValidation {
            message: "Operation sequence is empty".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DriverError, DriverResult};
    use crate::exec::OpOutput;
    use crate::types::EngineType;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records every name it is asked to create and every clean call.
    #[derive(Debug, Default)]
    struct RecordingDriver {
        created: Mutex<Vec<ContainerName>>,
        cleaned: Mutex<Vec<Vec<ContainerName>>>,
        fail_remove: bool,
    }

    impl RecordingDriver {
        fn op(&self) -> DriverResult<OpOutput> {
            Ok(OpOutput {
                output: String::new(),
                elapsed: Duration::from_millis(1),
            })
        }
    }

    impl Driver for RecordingDriver {
        fn engine(&self) -> EngineType {
            EngineType::Docker
        }
        fn path(&self) -> &Path {
            Path::new("recording")
        }
        fn info(&self) -> DriverResult<String> {
            Ok("recording".to_string())
        }
        fn create(
            &self,
            name: ContainerName,
            image: &str,
            cmd_override: Option<&str>,
            detached: bool,
            trace: bool,
        ) -> DriverResult<Container> {
            self.created.lock().unwrap().push(name.clone());
            Ok(Container::new(name, image, cmd_override, detached, trace))
        }
        fn run(&self, _ctr: &Container) -> DriverResult<OpOutput> {
            self.op()
        }
        fn stop(&self, _ctr: &Container) -> DriverResult<OpOutput> {
            self.op()
        }
        fn pause(&self, _ctr: &Container) -> DriverResult<OpOutput> {
            self.op()
        }
        fn unpause(&self, _ctr: &Container) -> DriverResult<OpOutput> {
            self.op()
        }
        fn remove(&self, ctr: &Container) -> DriverResult<OpOutput> {
            if self.fail_remove {
                return Err(DriverError::CommandFailed {
                    command: format!("rm {}", ctr.name()),
                    status: "exit status: 1".to_string(),
                    output: "device busy".to_string(),
                });
            }
            self.op()
        }
        fn clean(&self, names: &[ContainerName]) -> DriverResult<()> {
            self.cleaned.lock().unwrap().push(names.to_vec());
            Ok(())
        }
    }

    const SEQUENCE: &[Operation] = &[Operation::Run, Operation::Stop, Operation::Remove];

    #[test]
    fn test_one_snapshot_per_level() {
        let driver = Arc::new(RecordingDriver::default());
        let executor = Executor::new(driver, ContainerTemplate::default());

        let results = executor.sweep(3, 2, SEQUENCE).unwrap();
        assert_eq!(results.len(), 3);
        for (i, stats) in results.iter().enumerate() {
            let level = i + 1;
            assert_eq!(stats.threads(), level);
            for &op in SEQUENCE {
                assert_eq!(stats.samples(op), (level * 2) as u64);
                assert_eq!(stats.errors(op), 0);
            }
        }
    }

    #[test]
    fn test_names_unique_across_sweep() {
        let driver = Arc::new(RecordingDriver::default());
        let executor = Executor::new(driver.clone(), ContainerTemplate::default());
        executor.sweep(4, 3, SEQUENCE).unwrap();

        let created = driver.created.lock().unwrap();
        // 1 + 2 + 3 + 4 workers, 3 iterations each
        assert_eq!(created.len(), 30);
        let unique: std::collections::HashSet<_> = created.iter().collect();
        assert_eq!(unique.len(), created.len());
    }

    #[test]
    fn test_removed_containers_released() {
        let driver = Arc::new(RecordingDriver::default());
        let executor = Executor::new(driver.clone(), ContainerTemplate::default());
        executor.sweep(2, 2, SEQUENCE).unwrap();

        assert!(executor.registry().is_empty());
        // Only the end-of-level sweeps ran, each with nothing left over.
        let cleaned = driver.cleaned.lock().unwrap();
        assert_eq!(cleaned.len(), 2);
        assert!(cleaned.iter().all(|names| names.is_empty()));
    }

    #[test]
    fn test_failed_remove_reconciled_per_iteration() {
        let driver = Arc::new(RecordingDriver {
            fail_remove: true,
            ..Default::default()
        });
        let executor = Executor::new(driver.clone(), ContainerTemplate::default());
        let results = executor.sweep(1, 2, SEQUENCE).unwrap();

        assert_eq!(results[0].errors(Operation::Remove), 2);
        assert_eq!(results[0].samples(Operation::Stop), 2);
        assert!(executor.registry().is_empty());

        let cleaned = driver.cleaned.lock().unwrap();
        let single: Vec<_> = cleaned.iter().filter(|n| n.len() == 1).collect();
        assert_eq!(single.len(), 2);
    }

    #[test]
    fn test_zero_threads_rejected() {
        let driver = Arc::new(RecordingDriver::default());
        let executor = Executor::new(driver.clone(), ContainerTemplate::default());

        assert!(executor.sweep(0, 1, SEQUENCE).is_err());
        assert!(executor.sweep(1, 0, SEQUENCE).is_err());
        assert!(executor.sweep(1, 1, &[]).is_err());
        assert!(driver.created.lock().unwrap().is_empty());
    }

    #[test]
    fn test_preflight_reports_failing_operation() {
        let driver = Arc::new(RecordingDriver {
            fail_remove: true,
            ..Default::default()
        });
        let executor = Executor::new(driver, ContainerTemplate::default());

        match executor.preflight(SEQUENCE) {
            Err(BenchError::ValidationRunFailed { operation, .. }) => assert_eq!(operation, "remove"),
            other => panic!("unexpected preflight result: {:?}", other),
        }
    }
}
