// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Bucketbench Core Library
//!
//! Container lifecycle benchmarking across engines. Provides the driver
//! contract and engine drivers, benchmark definitions, the concurrency
//! sweep executor and per-level statistics.

pub mod bench;
pub mod config;
pub mod driver;
pub mod error;
pub mod exec;
pub mod registry;
pub mod state;
pub mod stats;
pub mod types;

// Re-export commonly used types
pub use bench::{Bench, BenchKind, BenchSetup, ContainerTemplate, CustomBench, Executor, LimitBench};
pub use config::{BenchmarkDefinition, ConfigLoader, DriverConfig};
pub use driver::{Container, Driver, DriverOptions};
pub use error::{BenchError, BenchResult, DriverError, DriverResult, ValidationError};
pub use registry::ContainerRegistry;
pub use state::{BenchState, BenchStateMachine};
pub use stats::{OpStats, RunStatistics, StatsCollector};
pub use types::{BenchId, ContainerName, EngineType, Operation};
