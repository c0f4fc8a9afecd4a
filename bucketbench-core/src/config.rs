// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML benchmark definition parser with strict schema validation.
//!
//! Every field is validated before any engine is contacted.
//! Any invalid field results in a ValidationError that prevents the run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{BenchError, BenchResult, ValidationError};
use crate::types::{EngineType, Operation};

/// Raw driver entry as parsed from YAML (before validation).
#[derive(Debug, Deserialize)]
struct RawDriverConfig {
    #[serde(rename = "type")]
    engine: String,
    #[serde(default)]
    binary: Option<String>,
    threads: usize,
    iterations: usize,
}

/// Raw benchmark definition.
#[derive(Debug, Deserialize)]
struct RawBenchmark {
    name: String,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    rootfs: Option<String>,
    #[serde(default)]
    detached: bool,
    #[serde(default)]
    timeout_ms: Option<u64>,
    drivers: Vec<RawDriverConfig>,
    commands: Vec<String>,
}

/// Validated per-engine sweep parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    pub engine: EngineType,
    /// Optional client binary or daemon socket path.
    pub binary: Option<String>,
    pub threads: usize,
    pub iterations: usize,
}

/// Validated benchmark definition.
#[derive(Debug, Clone)]
pub struct BenchmarkDefinition {
    pub name: String,
    pub image: Option<String>,
    pub command: Option<String>,
    pub rootfs: Option<PathBuf>,
    pub detached: bool,
    /// Per-operation timeout; `None` leaves engines to time out on their own.
    pub timeout: Option<Duration>,
    pub drivers: Vec<DriverConfig>,
    pub commands: Vec<Operation>,
}

impl BenchmarkDefinition {
    /// Image reference for an engine: the rootfs for binary-only engines.
    pub fn image_for(&self, engine: EngineType) -> String {
        if engine.requires_rootfs() {
            self.rootfs
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        } else {
            self.image.clone().unwrap_or_default()
        }
    }
}

/// Benchmark definition loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate a benchmark definition from a YAML file.
    pub fn load_file(path: impl AsRef<Path>) -> BenchResult<BenchmarkDefinition> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(BenchError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| BenchError::Io {
            context: "reading benchmark definition",
            source: e,
        })?;

        Self::load_string(&content)
    }

    /// Load and validate a benchmark definition from a YAML string.
    pub fn load_string(content: &str) -> BenchResult<BenchmarkDefinition> {
        let raw: RawBenchmark =
            serde_yaml::from_str(content).map_err(|e| BenchError::ConfigParse {
                message: format!("YAML parse error: {}", e),
            })?;

        Ok(Self::validate(raw)?)
    }

    fn validate(raw: RawBenchmark) -> Result<BenchmarkDefinition, ValidationError> {
        if raw.name.trim().is_empty() {
            return Err(ValidationError::MissingRequiredField {
                field: "name",
                context: "benchmark definition".to_string(),
            });
        }

        if raw.commands.is_empty() {
            return Err(ValidationError::SchemaValidation {
                message: "At least one command must be defined".to_string(),
            });
        }
        let commands = raw
            .commands
            .iter()
            .map(|token| Operation::parse_token(token))
            .collect::<Result<Vec<_>, _>>()?;

        if raw.drivers.is_empty() {
            return Err(ValidationError::SchemaValidation {
                message: "At least one driver must be defined".to_string(),
            });
        }

        let image = raw.image.filter(|s| !s.trim().is_empty());
        let rootfs = raw.rootfs.filter(|s| !s.trim().is_empty()).map(PathBuf::from);

        let mut drivers = Vec::with_capacity(raw.drivers.len());
        for (index, raw_driver) in raw.drivers.into_iter().enumerate() {
            let driver = Self::validate_driver(raw_driver, index)?;

            if driver.engine.requires_rootfs() && rootfs.is_none() {
                return Err(ValidationError::MissingRequiredField {
                    field: "rootfs",
                    context: format!("driver {} at index {}", driver.engine, index),
                });
            }
            if driver.engine.requires_image() && image.is_none() {
                return Err(ValidationError::MissingRequiredField {
                    field: "image",
                    context: format!("driver {} at index {}", driver.engine, index),
                });
            }

            drivers.push(driver);
        }

        let timeout = match raw.timeout_ms {
            Some(0) => {
                return Err(ValidationError::InvalidFieldValue {
                    field: "timeout_ms",
                    value: "0".to_string(),
                    reason: "Timeout must be greater than 0".to_string(),
                })
            }
            Some(ms) => Some(Duration::from_millis(ms)),
            None => None,
        };

        Ok(BenchmarkDefinition {
            name: raw.name,
            image,
            command: raw.command.filter(|s| !s.trim().is_empty()),
            rootfs,
            detached: raw.detached,
            timeout,
            drivers,
            commands,
        })
    }

    fn validate_driver(raw: RawDriverConfig, index: usize) -> Result<DriverConfig, ValidationError> {
        let engine: EngineType = raw.engine.parse()?;

        if raw.threads == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "threads",
                value: "0".to_string(),
                reason: format!("Driver at index {} must run at least one thread", index),
            });
        }

        if raw.iterations == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "iterations",
                value: "0".to_string(),
                reason: format!("Driver at index {} must run at least one iteration", index),
            });
        }

        Ok(DriverConfig {
            engine,
            binary: raw.binary.filter(|s| !s.trim().is_empty()),
            threads: raw.threads,
            iterations: raw.iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_BENCH: &str = r#"
name: BasicBench
image: alpine:latest
rootfs: /var/lib/bucketbench/alpine
detached: true
drivers:
  - type: Docker
    threads: 5
    iterations: 15
  - type: runc
    binary: /usr/local/bin/runc
    threads: 2
    iterations: 50
commands:
  - run
  - pause
  - resume
  - kill
  - erase
"#;

    #[test]
    fn test_valid_definition() {
        let def = ConfigLoader::load_string(VALID_BENCH).unwrap();
        assert_eq!(def.name, "BasicBench");
        assert!(def.detached);
        assert_eq!(def.drivers.len(), 2);
        assert_eq!(def.drivers[1].engine, EngineType::Runc);
        assert_eq!(def.drivers[1].binary.as_deref(), Some("/usr/local/bin/runc"));
        assert_eq!(
            def.commands,
            vec![
                Operation::Run,
                Operation::Pause,
                Operation::Unpause,
                Operation::Stop,
                Operation::Remove
            ]
        );
        assert!(def.timeout.is_none());
    }

    #[test]
    fn test_image_for_engine() {
        let def = ConfigLoader::load_string(VALID_BENCH).unwrap();
        assert_eq!(def.image_for(EngineType::Docker), "alpine:latest");
        assert_eq!(def.image_for(EngineType::Runc), "/var/lib/bucketbench/alpine");
    }

    #[test]
    fn test_unknown_command_rejected() {
        let yaml = r#"
name: bad
image: alpine
drivers:
  - type: docker
    threads: 1
    iterations: 1
commands: [run, checkpoint]
"#;
        let err = ConfigLoader::load_string(yaml).unwrap_err();
        assert!(matches!(
            err,
            BenchError::Validation(ValidationError::UnknownCommand { .. })
        ));
    }

    #[test]
    fn test_zero_threads_rejected() {
        let yaml = r#"
name: bad
image: alpine
drivers:
  - type: docker
    threads: 0
    iterations: 1
commands: [run]
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let yaml = r#"
name: bad
image: alpine
drivers:
  - type: docker
    threads: 1
    iterations: 0
commands: [run]
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_unknown_engine_rejected() {
        let yaml = r#"
name: bad
image: alpine
drivers:
  - type: podman
    threads: 1
    iterations: 1
commands: [run]
"#;
        let err = ConfigLoader::load_string(yaml).unwrap_err();
        assert!(matches!(
            err,
            BenchError::Validation(ValidationError::UnknownEngine { .. })
        ));
    }

    #[test]
    fn test_runc_requires_rootfs() {
        let yaml = r#"
name: bad
image: alpine
drivers:
  - type: runc
    threads: 1
    iterations: 1
commands: [run]
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_docker_requires_image() {
        let yaml = r#"
name: bad
rootfs: /tmp/rootfs
drivers:
  - type: docker
    threads: 1
    iterations: 1
commands: [run]
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_empty_commands_rejected() {
        let yaml = r#"
name: bad
image: alpine
drivers:
  - type: docker
    threads: 1
    iterations: 1
commands: []
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_timeout_parsed() {
        let yaml = r#"
name: timed
image: alpine
timeout_ms: 2500
drivers:
  - type: garden
    threads: 1
    iterations: 1
commands: [run, remove]
"#;
        let def = ConfigLoader::load_string(yaml).unwrap();
        assert_eq!(def.timeout, Some(Duration::from_millis(2500)));
        assert!(!def.detached);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let yaml = r#"
name: timed
image: alpine
timeout_ms: 0
drivers:
  - type: docker
    threads: 1
    iterations: 1
commands: [run]
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }
}
