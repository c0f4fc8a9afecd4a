// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Docker engine driver, driven through the `docker` client binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::driver::{tolerate_missing, Container, Driver, InfoCache};
use crate::error::{DriverError, DriverResult};
use crate::exec::{exec_cmd, exec_timed_cmd, resolve_binary, OpOutput};
use crate::types::{ContainerName, EngineType};

const DEFAULT_BINARY: &str = "docker";

/// Responses that mean the container is already gone.
const MISSING: &[&str] = &["no such container", "is not running"];

#[derive(Debug)]
pub struct DockerDriver {
    binary: PathBuf,
    timeout: Option<Duration>,
    info: InfoCache,
}

impl DockerDriver {
    pub fn new(binary: Option<&str>, timeout: Option<Duration>) -> DriverResult<Self> {
        let binary = resolve_binary(binary.unwrap_or(DEFAULT_BINARY))?;
        Ok(Self {
            binary,
            timeout,
            info: InfoCache::new(),
        })
    }

    fn exec(&self, ctr: &Container, args: &[&str]) -> DriverResult<OpOutput> {
        let out = if ctr.trace() {
            let mut traced = Vec::with_capacity(args.len() + 1);
            traced.push("-D");
            traced.extend_from_slice(args);
            exec_timed_cmd(&self.binary, &traced, self.timeout)?
        } else {
            exec_timed_cmd(&self.binary, args, self.timeout)?
        };
        if ctr.trace() {
            tracing::debug!(container = %ctr.name(), output = %out.output, "docker trace");
        }
        Ok(out)
    }
}

impl Driver for DockerDriver {
    fn engine(&self) -> EngineType {
        EngineType::Docker
    }

    fn path(&self) -> &Path {
        &self.binary
    }

    fn info(&self) -> DriverResult<String> {
        self.info.get_or_try_init(|| {
            let version = exec_cmd(&self.binary, &["version"])?;
            let info = exec_cmd(&self.binary, &["info"])?;
            Ok(format!(
                "docker driver (binary: {})\n{}",
                self.binary.display(),
                parse_daemon_info(&version, &info)
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
        args.extend(["--name", ctr.name().as_str(), ctr.image()]);
        args.extend(ctr.command_args());
        self.exec(ctr, &args)
    }

    fn stop(&self, ctr: &Container) -> DriverResult<OpOutput> {
        self.exec(ctr, &["kill", ctr.name().as_str()])
    }

    fn pause(&self, ctr: &Container) -> DriverResult<OpOutput> {
        self.exec(ctr, &["pause", ctr.name().as_str()])
    }

    fn unpause(&self, ctr: &Container) -> DriverResult<OpOutput> {
        self.exec(ctr, &["unpause", ctr.name().as_str()])
    }

    fn remove(&self, ctr: &Container) -> DriverResult<OpOutput> {
        self.exec(ctr, &["rm", ctr.name().as_str()])
    }

    fn clean(&self, names: &[ContainerName]) -> DriverResult<()> {
        if names.is_empty() {
            return Ok(());
        }

        tracing::info!(count = names.len(), "Docker: removing leftover containers");

        let mut args = vec!["rm", "-f"];
        args.extend(names.iter().map(|n| n.as_str()));
        let result = exec_timed_cmd(&self.binary, &args, self.timeout);

        // `rm -f` over a mixed list fails if any name is unknown; retry one by
        // one so the known ones still go.
        match tolerate_missing(result, MISSING) {
            Ok(()) => Ok(()),
            Err(DriverError::CommandFailed { .. }) if names.len() > 1 => {
                for name in names {
                    tolerate_missing(
                        exec_timed_cmd(&self.binary, &["rm", "-f", name.as_str()], self.timeout),
                        MISSING,
                    )?;
                }
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Condense `docker version` and `docker info` into one line.
fn parse_daemon_info(version: &str, info: &str) -> String {
    let mut client_ver = String::new();
    let mut client_api = false;
    let mut server_ver = String::new();

    for line in version.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "Version" => {
                if client_ver.is_empty() {
                    client_ver = value.to_string();
                } else {
                    server_ver = value.to_string();
                }
            }
            "API version" => {
                if !client_api {
                    client_api = true;
                    client_ver.push_str(&format!("|API:{}", value));
                } else {
                    server_ver.push_str(&format!("|API:{}", value));
                }
            }
            _ => {}
        }
    }

    for line in info.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        let tag = match key.trim() {
            "Kernel Version" => "Kernel",
            "Storage Driver" => "Storage",
            "Backing Filesystem" => "BackingFS",
            _ => continue,
        };
        server_ver.push_str(&format!("|{}:{}", tag, value));
    }

    format!("[CLIENT:{}][SERVER:{}]", client_ver, server_ver)
}
