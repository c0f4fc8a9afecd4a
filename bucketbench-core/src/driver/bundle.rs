// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! OCI bundle preparation for engines that run from a rootfs on disk.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use crate::error::{DriverError, DriverResult};
use crate::types::ContainerName;

/// Process args used when no command override is given.
const DEFAULT_ARGS: &[&str] = &["sh"];

/// Directory under the system temp dir holding one bundle per container.
pub(crate) fn default_root() -> PathBuf {
    std::env::temp_dir().join("bucketbench")
}

/// Create `<root>/<name>` with a `rootfs` symlink and a `config.json`.
pub(crate) fn prepare(
    root: &Path,
    name: &ContainerName,
    rootfs: &Path,
    args: &[&str],
) -> DriverResult<PathBuf> {
    let bundle = root.join(name.as_str());
    let fail = |reason: String| DriverError::Bundle {
        name: name.to_string(),
        reason,
    };

    if !rootfs.is_dir() {
        return Err(fail(format!("rootfs {} is not a directory", rootfs.display())));
    }

    std::fs::create_dir_all(&bundle)
        .map_err(|e| fail(format!("creating {}: {}", bundle.display(), e)))?;

    let link = bundle.join("rootfs");
    if link.symlink_metadata().is_err() {
        symlink(rootfs, &link).map_err(|e| fail(format!("linking rootfs: {}", e)))?;
    }

    let args = if args.is_empty() { DEFAULT_ARGS } else { args };
    let config = serde_json::to_vec_pretty(&spec(name, args))
        .map_err(|e| fail(format!("encoding config.json: {}", e)))?;
    std::fs::write(bundle.join("config.json"), config)
        .map_err(|e| fail(format!("writing config.json: {}", e)))?;

    Ok(bundle)
}

/// Delete a bundle directory; a missing directory is not an error.
pub(crate) fn discard(bundle: &Path) {
    match std::fs::remove_dir_all(bundle) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(bundle = %bundle.display(), error = %e, "Failed to remove bundle"),
    }
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn symlink(_target: &Path, _link: &Path) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "rootfs bundles require a unix host",
    ))
}

/// Minimal OCI runtime spec: non-terminal process, read-only rootfs.
fn spec(name: &ContainerName, args: &[&str]) -> Value {
    json!({
        "ociVersion": "1.0.2",
        "process": {
            "terminal": false,
            "user": { "uid": 0, "gid": 0 },
            "args": args,
            "env": [
                "PATH=/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin",
                "TERM=xterm"
            ],
            "cwd": "/",
            "noNewPrivileges": true
        },
        "root": { "path": "rootfs", "readonly": true },
        "hostname": name.as_str(),
        "mounts": [
            { "destination": "/proc", "type": "proc", "source": "proc" },
            {
                "destination": "/dev",
                "type": "tmpfs",
                "source": "tmpfs",
                "options": ["nosuid", "strictatime", "mode=755", "size=65536k"]
            },
            {
                "destination": "/dev/pts",
                "type": "devpts",
                "source": "devpts",
                "options": ["nosuid", "noexec", "newinstance", "ptmxmode=0666", "mode=0620"]
            },
            {
                "destination": "/sys",
                "type": "sysfs",
                "source": "sysfs",
                "options": ["nosuid", "noexec", "nodev", "ro"]
            }
        ],
        "linux": {
            "namespaces": [
                { "type": "pid" },
                { "type": "network" },
                { "type": "ipc" },
                { "type": "uts" },
                { "type": "mount" }
            ],
            "maskedPaths": ["/proc/kcore", "/proc/keys", "/proc/timer_list"],
            "readonlyPaths": ["/proc/sys", "/proc/sysrq-trigger"]
        }
    })
}
