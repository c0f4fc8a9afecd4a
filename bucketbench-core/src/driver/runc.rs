// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! runc driver. Containers run from per-name OCI bundles built over the
//! benchmark's rootfs; the "image" handed to [`Driver::create`] is that
//! rootfs path.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::driver::{bundle, tolerate_missing, Container, Driver, InfoCache};
use crate::error::DriverResult;
use crate::exec::{exec_cmd, exec_timed_cmd, resolve_binary, OpOutput};
use crate::types::{ContainerName, EngineType};

const DEFAULT_BINARY: &str = "runc";

const MISSING: &[&str] = &["does not exist", "not found", "container not running"];

#[derive(Debug)]
pub struct RuncDriver {
    binary: PathBuf,
    bundle_root: PathBuf,
    timeout: Option<Duration>,
    info: InfoCache,
}

impl RuncDriver {
    pub fn new(binary: Option<&str>, timeout: Option<Duration>) -> DriverResult<Self> {
        Self::with_bundle_root(binary, timeout, bundle::default_root())
    }

    pub fn with_bundle_root(
        binary: Option<&str>,
        timeout: Option<Duration>,
        bundle_root: PathBuf,
    ) -> DriverResult<Self> {
        let binary = resolve_binary(binary.unwrap_or(DEFAULT_BINARY))?;
        Ok(Self {
            binary,
            bundle_root,
            timeout,
            info: InfoCache::new(),
        })
    }

    fn exec(&self, ctr: &Container, args: &[&str]) -> DriverResult<OpOutput> {
        if !ctr.trace() {
            return exec_timed_cmd(&self.binary, args, self.timeout);
        }
        let mut traced = vec!["--debug"];
        traced.extend_from_slice(args);
        let out = exec_timed_cmd(&self.binary, &traced, self.timeout)?;
        tracing::debug!(container = %ctr.name(), output = %out.output, "runc trace");
        Ok(out)
    }

    fn bundle_path(&self, ctr: &Container) -> PathBuf {
        ctr.bundle()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.bundle_root.join(ctr.name().as_str()))
    }
}

impl Driver for RuncDriver {
    fn engine(&self) -> EngineType {
        EngineType::Runc
    }

    fn path(&self) -> &Path {
        &self.binary
    }

    fn info(&self) -> DriverResult<String> {
        self.info.get_or_try_init(|| {
            let version = exec_cmd(&self.binary, &["--version"])?;
            let condensed: Vec<_> = version.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
            Ok(format!(
                "runc driver (binary: {})\n[{}]",
                self.binary.display(),
                condensed.join("|")
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
        let args: Vec<&str> = cmd_override
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default();
        let bundle = bundle::prepare(&self.bundle_root, &name, Path::new(image), &args)?;
        Ok(Container::new(name, image, cmd_override, detached, trace).with_bundle(bundle))
    }

    fn run(&self, ctr: &Container) -> DriverResult<OpOutput> {
        let bundle_dir = self.bundle_path(ctr);
        let bundle_dir = bundle_dir.to_string_lossy();
        let mut args = vec!["run"];
        if ctr.detached() {
            args.push("--detach");
        }
        args.extend(["--bundle", bundle_dir.as_ref(), ctr.name().as_str()]);
        self.exec(ctr, &args)
    }

    fn stop(&self, ctr: &Container) -> DriverResult<OpOutput> {
        self.exec(ctr, &["kill", ctr.name().as_str(), "KILL"])
    }

    fn pause(&self, ctr: &Container) -> DriverResult<OpOutput> {
        self.exec(ctr, &["pause", ctr.name().as_str()])
    }

    fn unpause(&self, ctr: &Container) -> DriverResult<OpOutput> {
        self.exec(ctr, &["resume", ctr.name().as_str()])
    }

    fn remove(&self, ctr: &Container) -> DriverResult<OpOutput> {
        let out = self.exec(ctr, &["delete", ctr.name().as_str()]);
        if out.is_ok() {
            bundle::discard(&self.bundle_path(ctr));
        }
        out
    }

    fn clean(&self, names: &[ContainerName]) -> DriverResult<()> {
        if names.is_empty() {
            return Ok(());
        }

        tracing::info!(count = names.len(), "Runc: removing leftover containers");

        for name in names {
            let _ = exec_timed_cmd(&self.binary, &["kill", name.as_str(), "KILL"], self.timeout);
            tolerate_missing(
                exec_timed_cmd(&self.binary, &["delete", "--force", name.as_str()], self.timeout),
                MISSING,
            )?;
            bundle::discard(&self.bundle_root.join(name.as_str()));
        }
        Ok(())
    }
}
