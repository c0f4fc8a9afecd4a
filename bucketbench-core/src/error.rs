// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Custom error types for bucketbench.
//!
//! Every failure class is an explicit enum variant. Configuration errors fail
//! before any engine is touched, driver errors are reported per call.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::EngineType;

/// Top-level error type for benchmark execution.
#[derive(Debug, Error)]
pub enum BenchError {
    // =========================================================================
    // Configuration Errors - Fail-Fast Before Any Container Is Started
    // =========================================================================
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Benchmark definition not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Benchmark definition parse error: {message}")]
    ConfigParse { message: String },

    // =========================================================================
    // Benchmark State Errors
    // =========================================================================
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(#[from] StateTransitionError),

    #[error("Benchmark has no driver; call init first")]
    NotInitialized,

    // =========================================================================
    // Engine Errors
    // =========================================================================
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Pre-flight run failed during '{operation}': {reason}")]
    ValidationRunFailed { operation: String, reason: String },

    #[error("Worker {worker} panicked at concurrency level {level}")]
    WorkerPanicked { level: usize, worker: usize },

    // =========================================================================
    // System Errors
    // =========================================================================
    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration errors. Any of these stops the run before a container exists.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {field} in {context}")]
    MissingRequiredField {
        field: &'static str,
        context: String,
    },

    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Unknown engine type: {value}")]
    UnknownEngine { value: String },

    #[error("Unknown lifecycle command: {token}")]
    UnknownCommand { token: String },

    #[error("Schema validation failed: {message}")]
    SchemaValidation { message: String },
}

/// State transition errors for the benchmark state machine.
#[derive(Debug, Error)]
pub enum StateTransitionError {
    #[error("Cannot transition benchmark {bench} from {from} to {to}")]
    InvalidTransition {
        bench: String,
        from: &'static str,
        to: &'static str,
    },
}

/// Errors raised by engine drivers and the process execution utility.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Binary not found: {name}")]
    BinaryNotFound { name: String },

    #[error("{engine} engine unreachable: {reason}")]
    Unreachable { engine: EngineType, reason: String },

    #[error("Failed to spawn '{command}': {reason}")]
    Spawn { command: String, reason: String },

    #[error("Command '{command}' failed ({status}): {output}")]
    CommandFailed {
        command: String,
        status: String,
        output: String,
    },

    #[error("Command '{command}' exceeded {timeout_ms}ms")]
    Timeout { command: String, timeout_ms: u64 },

    #[error("Bundle preparation failed for {name}: {reason}")]
    Bundle { name: String, reason: String },
}

impl DriverError {
    /// Captured engine output, if the failure carried any.
    pub fn output(&self) -> &str {
        match self {
            Self::CommandFailed { output, .. } => output,
            _ => "",
        }
    }
}

/// Result type alias using BenchError.
pub type BenchResult<T> = Result<T, BenchError>;

/// Result type alias for driver calls.
pub type DriverResult<T> = Result<T, DriverError>;
