// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! containerd 1.x driver, talking to a running daemon over its socket
//! through the `ctr` client.
//!
//! The configured "binary" for this engine is the daemon socket address.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::driver::{is_missing, tolerate_missing, Container, Driver, InfoCache};
use crate::error::{DriverError, DriverResult};
use crate::exec::{exec_cmd, exec_timed_cmd, resolve_binary, OpOutput};
use crate::types::{ContainerName, EngineType};

const CLIENT_BINARY: &str = "ctr";
const DEFAULT_ADDRESS: &str = "/run/containerd/containerd.sock";

const MISSING: &[&str] = &["not found", "no such"];

#[derive(Debug)]
pub struct ContainerdDriver {
    client: PathBuf,
    address: PathBuf,
    timeout: Option<Duration>,
    info: InfoCache,
}

impl ContainerdDriver {
    pub fn new(address: Option<&str>, timeout: Option<Duration>) -> DriverResult<Self> {
        Self::with_client(CLIENT_BINARY, address, timeout)
    }

    /// Use a specific `ctr` client instead of the one on PATH.
    pub fn with_client(
        client: &str,
        address: Option<&str>,
        timeout: Option<Duration>,
    ) -> DriverResult<Self> {
        let client = resolve_binary(client)?;
        let address = PathBuf::from(address.unwrap_or(DEFAULT_ADDRESS));
        if !address.exists() {
            return Err(DriverError::Unreachable {
                engine: EngineType::Containerd,
                reason: format!("socket {} does not exist", address.display()),
            });
        }
        Ok(Self {
            client,
            address,
            timeout,
            info: InfoCache::new(),
        })
    }

    fn ctr(&self, trace: bool, args: &[&str]) -> DriverResult<OpOutput> {
        let address = self.address.to_string_lossy();
        let mut full = Vec::with_capacity(args.len() + 3);
        full.extend(["--address", address.as_ref()]);
        if trace {
            full.push("--debug");
        }
        full.extend_from_slice(args);
        exec_timed_cmd(&self.client, &full, self.timeout)
    }

    fn exec(&self, ctr: &Container, args: &[&str]) -> DriverResult<OpOutput> {
        let out = self.ctr(ctr.trace(), args)?;
        if ctr.trace() {
            tracing::debug!(container = %ctr.name(), output = %out.output, "containerd trace");
        }
        Ok(out)
    }
}

impl Driver for ContainerdDriver {
    fn engine(&self) -> EngineType {
        EngineType::Containerd
    }

    fn path(&self) -> &Path {
        &self.address
    }

    fn info(&self) -> DriverResult<String> {
        self.info.get_or_try_init(|| {
            let address = self.address.to_string_lossy();
            let version = exec_cmd(&self.client, &["--address", address.as_ref(), "version"])?;
            let condensed: Vec<_> = version
                .lines()
                .filter_map(|l| l.split_once(':'))
                .filter(|(k, _)| k.trim() == "Version")
                .map(|(_, v)| v.trim())
                .collect();
            Ok(format!(
                "containerd driver (socket: {})\n[CLIENT:{}][SERVER:{}]",
                self.address.display(),
                condensed.first().copied().unwrap_or_default(),
                condensed.get(1).copied().unwrap_or_default()
            ))
        })
    }

    fn create(
        &self,
        name: ContainerName,
        image: &str,
        cmd_override: Option<&str>,
        detached: bool,
        trace: bool,
    ) -> DriverResult<Container> {
        Ok(Container::new(name, image, cmd_override, detached, trace))
    }

    fn run(&self, ctr: &Container) -> DriverResult<OpOutput> {
        let mut args = vec!["run"];
        if ctr.detached() {
            args.push("-d");
        }
        args.extend([ctr.image(), ctr.name().as_str()]);
        args.extend(ctr.command_args());
        self.exec(ctr, &args)
    }

    fn stop(&self, ctr: &Container) -> DriverResult<OpOutput> {
        self.exec(ctr, &["tasks", "kill", "-s", "SIGKILL", ctr.name().as_str()])
    }

    fn pause(&self, ctr: &Container) -> DriverResult<OpOutput> {
        self.exec(ctr, &["tasks", "pause", ctr.name().as_str()])
    }

    fn unpause(&self, ctr: &Container) -> DriverResult<OpOutput> {
        self.exec(ctr, &["tasks", "resume", ctr.name().as_str()])
    }

    /// Deletes the task (if any) and then the container; both are timed.
    fn remove(&self, ctr: &Container) -> DriverResult<OpOutput> {
        let task = match self.exec(ctr, &["tasks", "delete", ctr.name().as_str()]) {
            Ok(out) => out,
            Err(e) if is_missing(&e, MISSING) => OpOutput::noop(),
            Err(e) => return Err(e),
        };
        let container = self.exec(ctr, &["containers", "delete", ctr.name().as_str()])?;
        Ok(OpOutput {
            output: format!("{}{}", task.output, container.output),
            elapsed: task.elapsed + container.elapsed,
        })
    }

    fn clean(&self, names: &[ContainerName]) -> DriverResult<()> {
        if names.is_empty() {
            return Ok(());
        }

        tracing::info!(count = names.len(), "Containerd: removing leftover containers");

        for name in names {
            let _ = self.ctr(false, &["tasks", "kill", "-s", "SIGKILL", name.as_str()]);
            tolerate_missing(
                self.ctr(false, &["tasks", "delete", "--force", name.as_str()]),
                MISSING,
            )?;
            tolerate_missing(
                self.ctr(false, &["containers", "delete", name.as_str()]),
                MISSING,
            )?;
        }
        Ok(())
    }
}
