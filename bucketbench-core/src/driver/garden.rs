// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Garden driver via the `gaol` client.
//!
//! Garden has no stop/pause/unpause equivalent through gaol; those calls
//! are zero-elapsed no-ops.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::driver::{tolerate_missing, Container, Driver, InfoCache};
use crate::error::DriverResult;
use crate::exec::{exec_cmd, exec_timed_cmd, resolve_binary, OpOutput};
use crate::types::{ContainerName, EngineType};

const DEFAULT_BINARY: &str = "gaol";

/// Command run inside the container when no override is given.
const DEFAULT_COMMAND: &str = "whoami";

const MISSING: &[&str] = &["unknown handle", "not found"];

#[derive(Debug)]
pub struct GardenDriver {
    binary: PathBuf,
    timeout: Option<Duration>,
    info: InfoCache,
}

impl GardenDriver {
    pub fn new(binary: Option<&str>, timeout: Option<Duration>) -> DriverResult<Self> {
        let binary = resolve_binary(binary.unwrap_or(DEFAULT_BINARY))?;
        Ok(Self {
            binary,
            timeout,
            info: InfoCache::new(),
        })
    }
}

impl Driver for GardenDriver {
    fn engine(&self) -> EngineType {
        EngineType::Garden
    }

    fn path(&self) -> &Path {
        &self.binary
    }

    fn info(&self) -> DriverResult<String> {
        self.info.get_or_try_init(|| {
            // gaol has no version query; listing proves the server answers.
            exec_cmd(&self.binary, &["list"])?;
            Ok(format!("garden driver (binary: {})", self.binary.display()))
        })
    }

    /// Garden allocates the container at create time.
    fn create(
        &self,
        name: ContainerName,
        image: &str,
        cmd_override: Option<&str>,
        detached: bool,
        trace: bool,
    ) -> DriverResult<Container> {
        exec_timed_cmd(&self.binary, &["create", "-n", name.as_str()], self.timeout)?;
        Ok(Container::new(name, image, cmd_override, detached, trace))
    }

    fn run(&self, ctr: &Container) -> DriverResult<OpOutput> {
        let mut args = vec!["run", ctr.name().as_str()];
        if !ctr.detached() {
            args.push("-a");
        }
        args.extend(["-c", ctr.command().unwrap_or(DEFAULT_COMMAND)]);
        let out = exec_timed_cmd(&self.binary, &args, self.timeout)?;
        if ctr.trace() {
            tracing::debug!(container = %ctr.name(), output = %out.output, "gaol trace");
        }
        Ok(out)
    }

    fn stop(&self, _ctr: &Container) -> DriverResult<OpOutput> {
        Ok(OpOutput::noop())
    }

    fn pause(&self, _ctr: &Container) -> DriverResult<OpOutput> {
        Ok(OpOutput::noop())
    }

    fn unpause(&self, _ctr: &Container) -> DriverResult<OpOutput> {
        Ok(OpOutput::noop())
    }

    fn remove(&self, ctr: &Container) -> DriverResult<OpOutput> {
        exec_timed_cmd(&self.binary, &["destroy", ctr.name().as_str()], self.timeout)
    }

    fn clean(&self, names: &[ContainerName]) -> DriverResult<()> {
        if names.is_empty() {
            return Ok(());
        }

        tracing::info!(count = names.len(), "Garden: destroying leftover containers");

        for name in names {
            tolerate_missing(
                exec_timed_cmd(&self.binary, &["destroy", name.as_str()], self.timeout),
                MISSING,
            )?;
        }
        Ok(())
    }
}
