// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers and enums for validated inputs.
//!
//! All types validate their invariants at creation time.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Prefix shared by every container this tool creates.
pub const CONTAINER_PREFIX: &str = "bb-ctr";

/// Maximum container name length accepted by the engines under test.
const MAX_NAME_LEN: usize = 128;

static NEXT_BENCH_SEQ: AtomicU32 = AtomicU32::new(0);

/// Container engine under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineType {
    Docker,
    Runc,
    Containerd,
    Ctr,
    Garden,
}

impl EngineType {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Docker => "Docker",
            Self::Runc => "Runc",
            Self::Containerd => "Containerd",
            Self::Ctr => "Ctr",
            Self::Garden => "Garden",
        }
    }

    /// Engines without image support need a rootfs on disk.
    pub const fn requires_rootfs(&self) -> bool {
        matches!(self, Self::Runc | Self::Ctr)
    }

    /// Engines that pull and run OCI images by reference.
    pub const fn requires_image(&self) -> bool {
        matches!(self, Self::Docker | Self::Containerd)
    }
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for EngineType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docker" => Ok(Self::Docker),
            "runc" => Ok(Self::Runc),
            "containerd" => Ok(Self::Containerd),
            "ctr" => Ok(Self::Ctr),
            "garden" | "gaol" => Ok(Self::Garden),
            _ => Err(ValidationError::UnknownEngine {
                value: s.to_string(),
            }),
        }
    }
}

/// Lifecycle operation applied to a container instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Run,
    Pause,
    Unpause,
    Stop,
    Remove,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Self::Run,
        Self::Pause,
        Self::Unpause,
        Self::Stop,
        Self::Remove,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Pause => "pause",
            Self::Unpause => "unpause",
            Self::Stop => "stop",
            Self::Remove => "remove",
        }
    }

    /// Resolve a command token, accepting the documented aliases.
    pub fn parse_token(token: &str) -> Result<Self, ValidationError> {
        match token.trim().to_ascii_lowercase().as_str() {
            "run" | "start" => Ok(Self::Run),
            "pause" => Ok(Self::Pause),
            "unpause" | "resume" => Ok(Self::Unpause),
            "stop" | "kill" => Ok(Self::Stop),
            "remove" | "rm" | "erase" | "delete" => Ok(Self::Remove),
            _ => Err(ValidationError::UnknownCommand {
                token: token.to_string(),
            }),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Operation {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_token(s)
    }
}

/// Process-unique identifier of one benchmark instance.
///
/// Combines the process id with a per-process sequence so that repeated runs
/// of the same benchmark, in this process or a concurrent one, never share
/// container names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BenchId(String);

impl BenchId {
    pub fn next() -> Self {
        let seq = NEXT_BENCH_SEQ.fetch_add(1, Ordering::Relaxed);
        Self(format!("{}s{}", std::process::id(), seq))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BenchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated container name.
/// Must start with an alphanumeric, then alphanumerics, `-`, `_` or `.`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContainerName(String);

impl ContainerName {
    /// Create a new ContainerName with validation.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();

        let starts_ok = name
            .chars()
            .next()
            .map(|c| c.is_ascii_alphanumeric())
            .unwrap_or(false);
        if !starts_ok {
            return Err(ValidationError::InvalidFieldValue {
                field: "container_name",
                value: name,
                reason: "Container name must start with an alphanumeric character".to_string(),
            });
        }

        if name.len() > MAX_NAME_LEN {
            return Err(ValidationError::InvalidFieldValue {
                field: "container_name",
                value: name.clone(),
                reason: format!(
                    "Container name too long: {} chars (max {})",
                    name.len(),
                    MAX_NAME_LEN
                ),
            });
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(ValidationError::InvalidFieldValue {
                field: "container_name",
                value: name,
                reason: "Container name must contain only alphanumerics, '-', '_' and '.'"
                    .to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Name for one (level, worker, iteration) slot of a benchmark sweep.
    pub fn for_iteration(
        bench: &BenchId,
        level: usize,
        worker: usize,
        iteration: usize,
    ) -> Result<Self, ValidationError> {
        Self::new(format!(
            "{}-{}-t{}-w{}-iter-{}",
            CONTAINER_PREFIX, bench, level, worker, iteration
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ContainerName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ContainerName> for String {
    fn from(name: ContainerName) -> Self {
        name.0
    }
}
