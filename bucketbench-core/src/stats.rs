// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Per-level statistics accumulation.
//!
//! Workers merge into a shared [`StatsCollector`]; once a level's barrier is
//! reached the collector is sealed into an immutable [`RunStatistics`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;

use crate::types::Operation;

/// Accumulated figures for one operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpStats {
    /// Sum of elapsed time over successful calls.
    pub total: Duration,
    /// Number of successful calls.
    pub samples: u64,
    /// Number of failed calls.
    pub errors: u64,
}

/// Thread-safe accumulator shared by the workers of one level.
#[derive(Debug, Default)]
pub struct StatsCollector {
    ops: DashMap<Operation, OpStats>,
    create_errors: AtomicU64,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, op: Operation, elapsed: Duration) {
        let mut entry = self.ops.entry(op).or_default();
        entry.total += elapsed;
        entry.samples += 1;
    }

    pub fn record_error(&self, op: Operation) {
        self.ops.entry(op).or_default().errors += 1;
    }

    /// A container handle could not be built; the iteration was skipped.
    pub fn record_create_error(&self) {
        self.create_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Freeze the accumulated values for a finished level.
    pub fn seal(self, threads: usize, iterations: usize, elapsed: Duration) -> RunStatistics {
        RunStatistics {
            threads,
            iterations,
            elapsed,
            create_errors: self.create_errors.into_inner(),
            ops: self.ops.into_iter().collect(),
        }
    }
}

/// Immutable statistics for one concurrency level.
///
/// Durations are sums, not samples; divide by the sample count (or use
/// [`RunStatistics::average_ms`]) for a per-call figure.
#[derive(Debug, Clone, PartialEq)]
pub struct RunStatistics {
    threads: usize,
    iterations: usize,
    elapsed: Duration,
    create_errors: u64,
    ops: BTreeMap<Operation, OpStats>,
}

impl RunStatistics {
    /// Concurrency level these figures belong to.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Iterations per worker.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Wall time of the level, barrier included.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn op(&self, op: Operation) -> OpStats {
        self.ops.get(&op).copied().unwrap_or_default()
    }

    /// Operations that saw at least one call, in declaration order.
    pub fn operations(&self) -> impl Iterator<Item = (Operation, &OpStats)> {
        self.ops.iter().map(|(op, stats)| (*op, stats))
    }

    pub fn duration_ms(&self, op: Operation) -> u64 {
        self.op(op).total.as_millis() as u64
    }

    pub fn samples(&self, op: Operation) -> u64 {
        self.op(op).samples
    }

    pub fn errors(&self, op: Operation) -> u64 {
        self.op(op).errors
    }

    pub fn create_errors(&self) -> u64 {
        self.create_errors
    }

    /// Mean elapsed milliseconds per successful call.
    pub fn average_ms(&self, op: Operation) -> Option<f64> {
        let stats = self.op(op);
        if stats.samples == 0 {
            return None;
        }
        Some(stats.total.as_secs_f64() * 1000.0 / stats.samples as f64)
    }

    pub fn total_errors(&self) -> u64 {
        self.create_errors + self.ops.values().map(|s| s.errors).sum::<u64>()
    }

    /// Operation sequences completed per second across all workers.
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        (self.threads * self.iterations) as f64 / secs
    }
}
