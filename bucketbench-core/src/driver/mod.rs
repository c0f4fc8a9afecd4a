// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Engine driver contract.
//!
//! Every engine implements the full [`Driver`] operation set. An engine
//! without an equivalent for some operation returns a zero-elapsed
//! [`OpOutput::noop`] instead of failing, so the executor never needs to
//! know which engine it is driving.

mod bundle;
pub mod containerd;
pub mod ctr;
pub mod docker;
pub mod garden;
pub mod runc;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::error::{DriverError, DriverResult};
use crate::exec::OpOutput;
use crate::types::{ContainerName, EngineType, Operation};

pub use containerd::ContainerdDriver;
pub use ctr::CtrDriver;
pub use docker::DockerDriver;
pub use garden::GardenDriver;
pub use runc::RuncDriver;

/// Per-instance container metadata returned by [`Driver::create`].
///
/// Owned by the worker that created it until removal; the name is the only
/// key used to address the engine-side object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    name: ContainerName,
    image: String,
    command: Option<String>,
    detached: bool,
    trace: bool,
    bundle: Option<PathBuf>,
}

impl Container {
    pub fn new(
        name: ContainerName,
        image: impl Into<String>,
        command: Option<&str>,
        detached: bool,
        trace: bool,
    ) -> Self {
        Self {
            name,
            image: image.into(),
            command: command.map(str::to_string),
            detached,
            trace,
            bundle: None,
        }
    }

    /// Attach the OCI bundle directory for engines that run from disk.
    pub fn with_bundle(mut self, bundle: PathBuf) -> Self {
        self.bundle = Some(bundle);
        self
    }

    pub fn name(&self) -> &ContainerName {
        &self.name
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    /// Command override split into arguments.
    pub fn command_args(&self) -> Vec<&str> {
        self.command
            .as_deref()
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn detached(&self) -> bool {
        self.detached
    }

    pub fn trace(&self) -> bool {
        self.trace
    }

    pub fn bundle(&self) -> Option<&Path> {
        self.bundle.as_deref()
    }
}

/// Uniform lifecycle contract over a container engine.
///
/// Implementations are shared read-mostly across all workers of a sweep.
/// Failures are returned per call; nothing here may panic on engine errors.
pub trait Driver: Send + Sync + fmt::Debug {
    fn engine(&self) -> EngineType;

    /// Client binary (or daemon socket) in use.
    fn path(&self) -> &Path;

    /// Memoized identity string: versions, kernel, storage backend.
    fn info(&self) -> DriverResult<String>;

    /// Build the metadata for one container. Does not start anything.
    fn create(
        &self,
        name: ContainerName,
        image: &str,
        cmd_override: Option<&str>,
        detached: bool,
        trace: bool,
    ) -> DriverResult<Container>;

    /// Create and start the container in the engine.
    fn run(&self, ctr: &Container) -> DriverResult<OpOutput>;

    fn stop(&self, ctr: &Container) -> DriverResult<OpOutput>;

    fn pause(&self, ctr: &Container) -> DriverResult<OpOutput>;

    fn unpause(&self, ctr: &Container) -> DriverResult<OpOutput>;

    fn remove(&self, ctr: &Container) -> DriverResult<OpOutput>;

    /// Best-effort force stop and removal of the named leftovers.
    ///
    /// An empty list, or names the engine no longer knows, is success.
    fn clean(&self, names: &[ContainerName]) -> DriverResult<()>;

    /// Release connections or temp state held by the driver.
    fn close(&self) -> DriverResult<()> {
        Ok(())
    }

    /// Dispatch a lifecycle operation to the matching call.
    fn apply(&self, op: Operation, ctr: &Container) -> DriverResult<OpOutput> {
        match op {
            Operation::Run => self.run(ctr),
            Operation::Pause => self.pause(ctr),
            Operation::Unpause => self.unpause(ctr),
            Operation::Stop => self.stop(ctr),
            Operation::Remove => self.remove(ctr),
        }
    }
}

/// Parameters for constructing a driver.
#[derive(Debug, Clone, Default)]
pub struct DriverOptions {
    /// Custom client binary, or the daemon socket for Containerd.
    pub binary: Option<String>,
    /// Deadline applied to each lifecycle call.
    pub timeout: Option<Duration>,
}

/// Construct the driver for an engine and check it answers.
///
/// Fails if the client binary cannot be resolved or the engine does not
/// answer its identity query.
pub fn connect(engine: EngineType, options: &DriverOptions) -> DriverResult<Arc<dyn Driver>> {
    let binary = options.binary.as_deref();
    let driver: Arc<dyn Driver> = match engine {
        EngineType::Docker => Arc::new(DockerDriver::new(binary, options.timeout)?),
        EngineType::Runc => Arc::new(RuncDriver::new(binary, options.timeout)?),
        EngineType::Containerd => Arc::new(ContainerdDriver::new(binary, options.timeout)?),
        EngineType::Ctr => Arc::new(CtrDriver::new(binary, options.timeout)?),
        EngineType::Garden => Arc::new(GardenDriver::new(binary, options.timeout)?),
    };

    let info = driver.info().map_err(|e| DriverError::Unreachable {
        engine,
        reason: e.to_string(),
    })?;
    tracing::info!(engine = %engine, path = %driver.path().display(), info = %info, "Driver ready");

    Ok(driver)
}

/// Single-assignment cache for [`Driver::info`].
///
/// Concurrent first readers may each compute the value; the first stored
/// result wins and every caller sees it.
#[derive(Debug, Default)]
pub struct InfoCache(OnceLock<String>);

impl InfoCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_try_init<F>(&self, compute: F) -> DriverResult<String>
    where
        F: FnOnce() -> DriverResult<String>,
    {
        if let Some(info) = self.0.get() {
            return Ok(info.clone());
        }
        let info = compute()?;
        Ok(self.0.get_or_init(|| info).clone())
    }
}

/// True when a failed call only reports that the object is already gone.
pub(crate) fn is_missing(err: &DriverError, markers: &[&str]) -> bool {
    match err {
        DriverError::CommandFailed { output, .. } => {
            let output = output.to_ascii_lowercase();
            markers.iter().any(|m| output.contains(m))
        }
        _ => false,
    }
}

/// Run a cleanup step, tolerating "already gone" responses.
pub(crate) fn tolerate_missing(
    result: DriverResult<OpOutput>,
    markers: &[&str],
) -> DriverResult<()> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if is_missing(&e, markers) => Ok(()),
        Err(e) => Err(e),
    }
}
