// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Legacy containerd (0.2.x) driver via its `ctr containers` client.
//!
//! Containers start from OCI bundles like runc. containerd reaps exited
//! containers itself, so remove only discards the bundle.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::driver::{bundle, tolerate_missing, Container, Driver, InfoCache};
use crate::error::DriverResult;
use crate::exec::{exec_cmd, exec_timed_cmd, resolve_binary, OpOutput};
use crate::types::{ContainerName, EngineType};

const DEFAULT_BINARY: &str = "ctr";

const MISSING: &[&str] = &["not found", "does not exist"];

#[derive(Debug)]
pub struct CtrDriver {
    binary: PathBuf,
    bundle_root: PathBuf,
    timeout: Option<Duration>,
    info: InfoCache,
}

impl CtrDriver {
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
        let mut full = Vec::with_capacity(args.len() + 2);
        if ctr.trace() {
            full.push("--debug");
        }
        full.push("containers");
        full.extend_from_slice(args);
        let out = exec_timed_cmd(&self.binary, &full, self.timeout)?;
        if ctr.trace() {
            tracing::debug!(container = %ctr.name(), output = %out.output, "ctr trace");
        }
        Ok(out)
    }
}

impl Driver for CtrDriver {
    fn engine(&self) -> EngineType {
        EngineType::Ctr
    }

    fn path(&self) -> &Path {
        &self.binary
    }

    fn info(&self) -> DriverResult<String> {
        self.info.get_or_try_init(|| {
            let version = exec_cmd(&self.binary, &["version"])?;
            let condensed: Vec<_> = version
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect();
            Ok(format!(
                "ctr driver (binary: {})\n[{}]",
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
        let bundle_dir = ctr
            .bundle()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.bundle_root.join(ctr.name().as_str()));
        let bundle_dir = bundle_dir.to_string_lossy();
        let mut args = vec!["start"];
        if !ctr.detached() {
            args.push("--attach");
        }
        args.extend([ctr.name().as_str(), bundle_dir.as_ref()]);
        self.exec(ctr, &args)
    }

    fn stop(&self, ctr: &Container) -> DriverResult<OpOutput> {
        self.exec(ctr, &["kill", "-s", "9", ctr.name().as_str()])
    }

    fn pause(&self, ctr: &Container) -> DriverResult<OpOutput> {
        self.exec(ctr, &["pause", ctr.name().as_str()])
    }

    fn unpause(&self, ctr: &Container) -> DriverResult<OpOutput> {
        self.exec(ctr, &["resume", ctr.name().as_str()])
    }

    fn remove(&self, ctr: &Container) -> DriverResult<OpOutput> {
        if let Some(bundle_dir) = ctr.bundle() {
            bundle::discard(bundle_dir);
        }
        Ok(OpOutput::noop())
    }

    fn clean(&self, names: &[ContainerName]) -> DriverResult<()> {
        if names.is_empty() {
            return Ok(());
        }

        tracing::info!(count = names.len(), "Ctr: killing leftover containers");

        for name in names {
            tolerate_missing(
                exec_timed_cmd(
                    &self.binary,
                    &["containers", "kill", "-s", "9", name.as_str()],
                    self.timeout,
                ),
                MISSING,
            )?;
            bundle::discard(&self.bundle_root.join(name.as_str()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::fake::FakeEngine;

    fn driver(engine: &FakeEngine) -> CtrDriver {
        CtrDriver::with_bundle_root(Some(engine.binary()), None, engine.dir().join("bundles"))
            .unwrap()
    }

    #[test]
    fn test_lifecycle_command_lines() {
        let engine = FakeEngine::new();
        let driver = driver(&engine);
        let rootfs = tempfile::TempDir::new().unwrap();
        let image = rootfs.path().to_string_lossy().to_string();

        let ctr = driver
            .create(ContainerName::new("bb-ctr-c").unwrap(), &image, None, false, false)
            .unwrap();
        let bundle = ctr.bundle().unwrap().to_path_buf();

        driver.run(&ctr).unwrap();
        driver.pause(&ctr).unwrap();
        driver.unpause(&ctr).unwrap();
        driver.stop(&ctr).unwrap();
        let removed = driver.remove(&ctr).unwrap();

        assert_eq!(
            engine.calls(),
            vec![
                format!("containers start --attach bb-ctr-c {}", bundle.display()),
                "containers pause bb-ctr-c".to_string(),
                "containers resume bb-ctr-c".to_string(),
                "containers kill -s 9 bb-ctr-c".to_string(),
            ]
        );
        // containerd reaps the container; remove only drops the bundle.
        assert_eq!(removed.elapsed_ms(), 0);
        assert!(!bundle.exists());
    }

    #[test]
    fn test_trace_precedes_subcommand() {
        let engine = FakeEngine::new();
        let driver = driver(&engine);
        let ctr = Container::new(ContainerName::new("bb-ctr-d").unwrap(), "", None, true, true);
        driver.stop(&ctr).unwrap();
        assert_eq!(engine.calls(), vec!["--debug containers kill -s 9 bb-ctr-d"]);
    }

    #[test]
    fn test_clean_tolerates_vanished_container() {
        let engine = FakeEngine::failing_on("kill", "container not found");
        let driver = driver(&engine);
        let gone = ContainerName::new("bb-ctr-gone").unwrap();

        assert!(driver.clean(std::slice::from_ref(&gone)).is_ok());
        assert!(driver.clean(std::slice::from_ref(&gone)).is_ok());
        assert_eq!(engine.calls().len(), 2);
    }
}
