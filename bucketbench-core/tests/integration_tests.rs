// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! End-to-end tests for Bucketbench.
//!
//! These drive full benchmark lifecycles against in-process stub engines,
//! from definition loading through per-level statistics.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use bucketbench_core::bench::{self, LIMIT_SEQUENCE};
use bucketbench_core::{
    BenchError, BenchKind, BenchSetup, BenchState, ConfigLoader, Container, ContainerName,
    ContainerTemplate, Driver, DriverError, DriverOptions, DriverResult, EngineType, Executor,
    Operation,
};
use bucketbench_core::exec::OpOutput;
use tempfile::TempDir;

/// Configurable stand-in for a container engine.
#[derive(Debug, Default)]
struct StubDriver {
    /// Reported elapsed time per operation; also slept for when set.
    latency: Duration,
    /// Run fails for any container whose name contains this.
    fail_run_matching: Option<&'static str>,
    fail_create: bool,
    created: Mutex<Vec<ContainerName>>,
    live: Mutex<HashSet<ContainerName>>,
    clean_calls: AtomicUsize,
}

impl StubDriver {
    fn with_latency(ms: u64) -> Self {
        Self {
            latency: Duration::from_millis(ms),
            ..Default::default()
        }
    }

    fn op(&self) -> DriverResult<OpOutput> {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        Ok(OpOutput {
            output: String::new(),
            elapsed: self.latency,
        })
    }
}

impl Driver for StubDriver {
    fn engine(&self) -> EngineType {
        EngineType::Docker
    }

    fn path(&self) -> &Path {
        Path::new("/usr/bin/stub")
    }

    fn info(&self) -> DriverResult<String> {
        Ok("stub engine".to_string())
    }

    fn create(
        &self,
        name: ContainerName,
        image: &str,
        cmd_override: Option<&str>,
        detached: bool,
        trace: bool,
    ) -> DriverResult<Container> {
        if self.fail_create {
            return Err(DriverError::CommandFailed {
                command: format!("create {}", name),
                status: "exit status: 125".to_string(),
                output: "no such image".to_string(),
            });
        }
        self.created.lock().unwrap().push(name.clone());
        Ok(Container::new(name, image, cmd_override, detached, trace))
    }

    fn run(&self, ctr: &Container) -> DriverResult<OpOutput> {
        if let Some(marker) = self.fail_run_matching {
            if ctr.name().as_str().contains(marker) {
                return Err(DriverError::CommandFailed {
                    command: format!("run {}", ctr.name()),
                    status: "exit status: 1".to_string(),
                    output: "injected failure".to_string(),
                });
            }
        }
        self.live.lock().unwrap().insert(ctr.name().clone());
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
        self.live.lock().unwrap().remove(ctr.name());
        self.op()
    }

    fn clean(&self, names: &[ContainerName]) -> DriverResult<()> {
        self.clean_calls.fetch_add(1, Ordering::SeqCst);
        let mut live = self.live.lock().unwrap();
        for name in names {
            live.remove(name);
        }
        Ok(())
    }
}

fn template() -> ContainerTemplate {
    ContainerTemplate {
        image: "alpine:latest".to_string(),
        command: None,
        detached: true,
        trace: false,
    }
}

fn setup(commands: Vec<Operation>) -> BenchSetup {
    BenchSetup {
        name: "stub".to_string(),
        engine: EngineType::Docker,
        driver: DriverOptions::default(),
        container: template(),
        commands,
    }
}

const RUN_STOP_REMOVE: &[Operation] = &[Operation::Run, Operation::Stop, Operation::Remove];

/// Full Custom lifecycle with 10ms operations: per-op totals scale with the
/// number of workers at each level.
#[test]
fn test_custom_sweep_durations_scale_with_level() {
    let driver = Arc::new(StubDriver::with_latency(10));
    let mut bench = bench::new(BenchKind::Custom);
    bench
        .init_with_driver(setup(RUN_STOP_REMOVE.to_vec()), driver.clone())
        .unwrap();
    bench.validate().unwrap();
    bench.run(2, 3, &[]).unwrap();

    assert_eq!(bench.state(), BenchState::Completed);
    let stats = bench.stats();
    assert_eq!(stats.len(), 2);

    for &op in RUN_STOP_REMOVE {
        assert_eq!(stats[0].duration_ms(op), 30);
        assert_eq!(stats[1].duration_ms(op), 60);
        assert_eq!(stats[0].errors(op), 0);
        assert_eq!(stats[1].errors(op), 0);
    }
    assert!(stats[0].elapsed() >= Duration::from_millis(90));
    assert!(bench.elapsed() >= stats[0].elapsed() + stats[1].elapsed());
    assert!(stats.iter().all(|s| s.rate() > 0.0));
}

#[test]
fn test_container_count_matches_sweep() {
    let driver = Arc::new(StubDriver::default());
    let executor = Executor::new(driver.clone(), template());

    let threads = 5;
    let iterations = 4;
    let results = executor.sweep(threads, iterations, RUN_STOP_REMOVE).unwrap();
    assert_eq!(results.len(), threads);

    // iterations * threads * (threads + 1) / 2
    let created = driver.created.lock().unwrap();
    assert_eq!(created.len(), iterations * threads * (threads + 1) / 2);

    let unique: HashSet<_> = created.iter().collect();
    assert_eq!(unique.len(), created.len());
    assert!(created
        .iter()
        .all(|n| n.as_str().starts_with(&format!("bb-ctr-{}-", executor.id()))));
}

#[test]
fn test_injected_run_failure_counted_once_per_worker() {
    let driver = Arc::new(StubDriver {
        fail_run_matching: Some("iter-2"),
        ..Default::default()
    });
    let mut bench = bench::new(BenchKind::Custom);
    bench
        .init_with_driver(setup(RUN_STOP_REMOVE.to_vec()), driver.clone())
        .unwrap();
    bench.run(2, 3, &[]).unwrap();

    for (i, level) in bench.stats().iter().enumerate() {
        let workers = (i + 1) as u64;
        assert_eq!(level.errors(Operation::Run), workers);
        assert_eq!(level.samples(Operation::Run), workers * 2);
        // The sequence carried on past the failed run.
        assert_eq!(level.samples(Operation::Stop), workers * 3);
        assert_eq!(level.samples(Operation::Remove), workers * 3);
    }
    assert!(driver.live.lock().unwrap().is_empty());
}

#[test]
fn test_failing_create_blocks_sweep() {
    let driver = Arc::new(StubDriver {
        fail_create: true,
        ..Default::default()
    });
    let mut bench = bench::new(BenchKind::Custom);
    bench
        .init_with_driver(setup(RUN_STOP_REMOVE.to_vec()), driver.clone())
        .unwrap();

    let err = bench.validate().unwrap_err();
    assert!(matches!(err, BenchError::Driver(DriverError::CommandFailed { .. })));
    assert_eq!(bench.state(), BenchState::Ready);
    assert!(bench.stats().is_empty());
}

#[test]
fn test_create_errors_counted_during_sweep() {
    let driver = Arc::new(StubDriver {
        fail_create: true,
        ..Default::default()
    });
    let executor = Executor::new(driver, template());
    let results = executor.sweep(2, 2, RUN_STOP_REMOVE).unwrap();

    assert_eq!(results[0].create_errors(), 2);
    assert_eq!(results[1].create_errors(), 4);
    assert_eq!(results[1].samples(Operation::Run), 0);
}

#[test]
fn test_leftovers_cleaned_between_levels() {
    // No remove in the sequence: every container outlives its iteration.
    let driver = Arc::new(StubDriver::default());
    let executor = Executor::new(driver.clone(), template());
    executor
        .sweep(3, 2, &[Operation::Run, Operation::Stop])
        .unwrap();

    assert!(executor.registry().is_empty());
    assert!(driver.live.lock().unwrap().is_empty());

    // Clean is idempotent once nothing is left.
    let before = driver.clean_calls.load(Ordering::SeqCst);
    executor.clean();
    executor.clean();
    assert_eq!(driver.clean_calls.load(Ordering::SeqCst), before + 2);
    assert!(executor.registry().is_empty());
}

#[test]
fn test_limit_then_custom_share_nothing() {
    let driver = Arc::new(StubDriver::default());

    let mut limit = bench::new(BenchKind::Limit);
    limit
        .init_with_driver(setup(vec![Operation::Pause]), driver.clone())
        .unwrap();
    limit.validate().unwrap();
    limit.run(1, 2, &[]).unwrap();

    let mut custom = bench::new(BenchKind::Custom);
    custom
        .init_with_driver(setup(vec![Operation::Run, Operation::Remove]), driver.clone())
        .unwrap();
    custom.run(1, 2, &[]).unwrap();

    let limit_ops: Vec<_> = limit.stats()[0].operations().map(|(op, _)| op).collect();
    assert_eq!(limit_ops, LIMIT_SEQUENCE.to_vec());
    assert_eq!(custom.stats()[0].samples(Operation::Stop), 0);

    let created = driver.created.lock().unwrap();
    let unique: HashSet<_> = created.iter().collect();
    assert_eq!(unique.len(), created.len());
}

#[test]
fn test_definition_file_round_trip_to_setup() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("bench.yaml");
    std::fs::write(
        &path,
        r#"
name: FileBench
image: busybox:latest
detached: true
timeout_ms: 5000
drivers:
  - type: docker
    threads: 2
    iterations: 3
commands: [run, stop, remove]
"#,
    )
    .expect("Failed to write definition");

    let def = ConfigLoader::load_file(&path).unwrap();
    assert_eq!(def.name, "FileBench");
    assert_eq!(def.timeout, Some(Duration::from_millis(5000)));
    assert_eq!(def.commands, RUN_STOP_REMOVE.to_vec());

    let entry = &def.drivers[0];
    let driver = Arc::new(StubDriver::default());
    let mut bench = bench::new(BenchKind::Custom);
    bench
        .init_with_driver(
            BenchSetup {
                name: def.name.clone(),
                engine: entry.engine,
                driver: DriverOptions {
                    binary: entry.binary.clone(),
                    timeout: def.timeout,
                },
                container: ContainerTemplate {
                    image: def.image_for(entry.engine),
                    command: def.command.clone(),
                    detached: def.detached,
                    trace: false,
                },
                commands: def.commands.clone(),
            },
            driver,
        )
        .unwrap();
    bench.run(entry.threads, entry.iterations, &[]).unwrap();
    assert_eq!(bench.stats().len(), 2);
    assert_eq!(bench.stats()[1].samples(Operation::Remove), 6);
}

#[test]
fn test_missing_definition_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let err = ConfigLoader::load_file(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, BenchError::ConfigNotFound { .. }));
}
