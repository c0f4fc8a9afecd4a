// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Benchmark state machine with typed state transitions.
//!
//! Implements the benchmark lifecycle: Created → Ready → Running → Completed.
//! There is no way back; re-running needs a new benchmark instance.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::StateTransitionError;

/// Benchmark lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BenchState {
    /// Constructed, no driver yet.
    Created,

    /// Driver constructed and reachable.
    Ready,

    /// Sweep in progress.
    Running,

    /// Sweep finished or failed irrecoverably.
    Completed,
}

impl BenchState {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Ready => "Ready",
            Self::Running => "Running",
            Self::Completed => "Completed",
        }
    }

    /// Check if transition to the target state is valid.
    pub fn can_transition_to(&self, target: BenchState) -> bool {
        matches!(
            (self, target),
            (Self::Created, Self::Ready) | (Self::Ready, Self::Running) | (Self::Running, Self::Completed)
        )
    }
}

impl std::fmt::Display for BenchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// State machine for one benchmark instance.
/// Tracks the wall time between entering Running and Completed.
#[derive(Debug)]
pub struct BenchStateMachine {
    bench: String,
    current_state: BenchState,
    started: Option<Instant>,
    elapsed: Duration,
}

impl BenchStateMachine {
    pub fn new(bench: impl Into<String>) -> Self {
        Self {
            bench: bench.into(),
            current_state: BenchState::Created,
            started: None,
            elapsed: Duration::ZERO,
        }
    }

    pub fn state(&self) -> BenchState {
        self.current_state
    }

    /// Wall time of the sweep; live while Running.
    pub fn elapsed(&self) -> Duration {
        match (self.current_state, self.started) {
            (BenchState::Running, Some(started)) => started.elapsed(),
            _ => self.elapsed,
        }
    }

    /// Fail unless the target state is reachable from the current one.
    pub fn check_transition(&self, target: BenchState) -> Result<(), StateTransitionError> {
        if !self.current_state.can_transition_to(target) {
            return Err(StateTransitionError::InvalidTransition {
                bench: self.bench.clone(),
                from: self.current_state.name(),
                to: target.name(),
            });
        }
        Ok(())
    }

    /// Attempt to transition to a new state.
    pub fn transition_to(&mut self, target: BenchState) -> Result<(), StateTransitionError> {
        self.check_transition(target)?;

        tracing::debug!(
            bench = %self.bench,
            from = self.current_state.name(),
            to = target.name(),
            "State transition"
        );

        match target {
            BenchState::Running => self.started = Some(Instant::now()),
            BenchState::Completed => {
                self.elapsed = self.started.map(|s| s.elapsed()).unwrap_or_default();
            }
            _ => {}
        }
        self.current_state = target;

        Ok(())
    }
}
