// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! JSON report generation for benchmark results.
//!
//! Serializes every level of every pairing so runs can be compared later.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use bucketbench_core::{BenchKind, EngineType, Operation, RunStatistics};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::commands::run::BenchOutcome;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Per-operation figures of one level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationReport {
    pub operation: Operation,
    pub samples: u64,
    pub errors: u64,
    pub total_ms: u64,
    pub average_ms: Option<f64>,
}

/// One concurrency level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelReport {
    pub threads: usize,
    pub iterations: usize,
    pub elapsed_ms: u64,
    /// Operation sequences per second.
    pub rate: f64,
    pub create_errors: u64,
    pub operations: Vec<OperationReport>,
}

impl From<&RunStatistics> for LevelReport {
    fn from(stats: &RunStatistics) -> Self {
        Self {
            threads: stats.threads(),
            iterations: stats.iterations(),
            elapsed_ms: stats.elapsed().as_millis() as u64,
            rate: stats.rate(),
            create_errors: stats.create_errors(),
            operations: stats
                .operations()
                .map(|(op, s)| OperationReport {
                    operation: op,
                    samples: s.samples,
                    errors: s.errors,
                    total_ms: s.total.as_millis() as u64,
                    average_ms: stats.average_ms(op),
                })
                .collect(),
        }
    }
}

/// One benchmark-driver pairing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairingReport {
    pub name: String,
    pub kind: BenchKind,
    pub engine: EngineType,
    pub commands: Vec<Operation>,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub failure: Option<String>,
    pub levels: Vec<LevelReport>,
}

/// Complete session report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonReport {
    pub timestamp: DateTime<Utc>,
    pub benchmark: String,
    pub pairings: Vec<PairingReport>,
}

impl JsonReport {
    pub fn new(benchmark: &str, outcomes: &[BenchOutcome]) -> Self {
        Self {
            timestamp: Utc::now(),
            benchmark: benchmark.to_string(),
            pairings: outcomes
                .iter()
                .map(|o| PairingReport {
                    name: o.name.clone(),
                    kind: o.kind,
                    engine: o.engine,
                    commands: o.commands.clone(),
                    elapsed_ms: o.elapsed.as_millis() as u64,
                    failure: o
                        .failure
                        .as_ref()
                        .map(|(stage, reason)| format!("{}: {}", stage, reason)),
                    levels: o.results.iter().map(LevelReport::from).collect(),
                })
                .collect(),
        }
    }
}

/// JSON writer for session reports.
pub struct JsonReporter;

impl JsonReporter {
    /// Write a report, creating parent directories as needed.
    pub fn write(path: &Path, report: &JsonReport) -> Result<(), ReporterError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, report)?;
        tracing::debug!(path = %path.display(), "Report written");
        Ok(())
    }

    /// Load a previously written report.
    pub fn load(path: &Path) -> Result<JsonReport, ReporterError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::run::Stage;
    use bucketbench_core::StatsCollector;
    use std::time::Duration;
    use tempfile::TempDir;

    fn outcomes() -> Vec<BenchOutcome> {
        let collector = StatsCollector::new();
        collector.record_success(Operation::Run, Duration::from_millis(30));
        collector.record_success(Operation::Stop, Duration::from_millis(10));
        collector.record_error(Operation::Stop);

        vec![
            BenchOutcome {
                name: "Basic-limit".to_string(),
                kind: BenchKind::Limit,
                engine: EngineType::Docker,
                commands: vec![Operation::Run, Operation::Stop, Operation::Remove],
                info: String::new(),
                elapsed: Duration::from_millis(250),
                results: vec![collector.seal(1, 1, Duration::from_millis(50))],
                failure: None,
            },
            BenchOutcome {
                name: "Basic".to_string(),
                kind: BenchKind::Custom,
                engine: EngineType::Runc,
                commands: vec![Operation::Run],
                info: String::new(),
                elapsed: Duration::ZERO,
                results: Vec::new(),
                failure: Some((Stage::Init, "Binary not found: runc".to_string())),
            },
        ]
    }

    #[test]
    fn test_write_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out").join("report.json");

        let report = JsonReport::new("Basic", &outcomes());
        JsonReporter::write(&path, &report).unwrap();
        assert!(path.exists());

        let loaded = JsonReporter::load(&path).unwrap();
        assert_eq!(loaded.benchmark, "Basic");
        assert_eq!(loaded.pairings.len(), 2);

        let level = &loaded.pairings[0].levels[0];
        assert_eq!(level.elapsed_ms, 50);
        assert_eq!(level.operations.len(), 2);
        assert_eq!(level.operations[1].operation, Operation::Stop);
        assert_eq!(level.operations[1].errors, 1);
        assert_eq!(level.operations[0].average_ms, Some(30.0));

        assert_eq!(
            loaded.pairings[1].failure.as_deref(),
            Some("driver initialization: Binary not found: runc")
        );
    }

    #[test]
    fn test_operation_names_lowercase() {
        let report = JsonReport::new("Basic", &outcomes());
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains(r#""operation":"run""#));
        assert!(json.contains(r#""kind":"limit""#));
    }
}
