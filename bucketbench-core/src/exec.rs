// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Engine binary resolution and timed command execution.
//!
//! Every driver call that reaches an engine through its CLI goes through
//! [`exec_timed_cmd`], which captures combined output and wall time.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use crate::error::{DriverError, DriverResult};

/// Poll interval while waiting on a child with a deadline.
const WAIT_POLL: Duration = Duration::from_millis(5);

/// How long output is still gathered once the child has exited.
///
/// Descendants that inherit the pipes (a detached container's init, for
/// one) can hold them open long after the engine client returns.
const OUTPUT_GRACE: Duration = Duration::from_millis(100);

/// Output and wall time of one engine call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpOutput {
    pub output: String,
    pub elapsed: Duration,
}

impl OpOutput {
    /// Result of an operation the engine has no equivalent for.
    pub fn noop() -> Self {
        Self::default()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }
}

/// Resolve a binary name through PATH, or check an explicit path.
pub fn resolve_binary(name: &str) -> DriverResult<PathBuf> {
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return if is_executable(candidate) {
            Ok(candidate.to_path_buf())
        } else {
            Err(DriverError::BinaryNotFound {
                name: name.to_string(),
            })
        };
    }

    std::env::var_os("PATH")
        .and_then(|paths| {
            std::env::split_paths(&paths)
                .map(|dir| dir.join(name))
                .find(|path| is_executable(path))
        })
        .ok_or_else(|| DriverError::BinaryNotFound {
            name: name.to_string(),
        })
}

fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = path.metadata() else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

fn render(binary: &Path, args: &[&str]) -> String {
    let mut command = binary.display().to_string();
    for arg in args {
        command.push(' ');
        command.push_str(arg);
    }
    command
}

/// Run a command to completion and return its combined output.
pub fn exec_cmd(binary: &Path, args: &[&str]) -> DriverResult<String> {
    exec_timed_cmd(binary, args, None).map(|out| out.output)
}

/// Run a command, timing it from spawn to exit.
///
/// A non-zero exit becomes [`DriverError::CommandFailed`] carrying the output.
/// With a timeout, the child is killed once the deadline passes.
pub fn exec_timed_cmd(
    binary: &Path,
    args: &[&str],
    timeout: Option<Duration>,
) -> DriverResult<OpOutput> {
    let command = render(binary, args);

    tracing::trace!(command = %command, "Executing engine command");

    let start = Instant::now();
    let mut child = Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| DriverError::Spawn {
            command: command.clone(),
            reason: e.to_string(),
        })?;
    let readers = OutputReaders::attach(&mut child);

    let status = match timeout {
        None => child.wait(),
        Some(limit) => match wait_with_deadline(&mut child, start + limit) {
            Ok(Some(status)) => Ok(status),
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(DriverError::Timeout {
                    command,
                    timeout_ms: limit.as_millis() as u64,
                });
            }
            Err(e) => Err(e),
        },
    }
    .map_err(|e| DriverError::Spawn {
        command: command.clone(),
        reason: format!("wait failed: {}", e),
    })?;
    let elapsed = start.elapsed();

    let output = readers.collect(Instant::now() + OUTPUT_GRACE);

    if !status.success() {
        return Err(DriverError::CommandFailed {
            command,
            status: status.to_string(),
            output,
        });
    }

    Ok(OpOutput { output, elapsed })
}

fn wait_with_deadline(
    child: &mut Child,
    deadline: Instant,
) -> std::io::Result<Option<std::process::ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        std::thread::sleep(WAIT_POLL);
    }
}

/// Stdout and stderr are drained on their own threads; a full pipe would
/// otherwise block the child before it exits. Chunks arrive on one channel
/// in the order they were read.
struct OutputReaders {
    chunks: Receiver<Vec<u8>>,
}

impl OutputReaders {
    fn attach(child: &mut Child) -> Self {
        let (tx, chunks) = mpsc::channel();
        if let Some(stdout) = child.stdout.take() {
            drain(stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            drain(stderr, tx);
        }
        Self { chunks }
    }

    /// Gather output until both pipes close or `deadline` passes.
    ///
    /// Readers still blocked at the deadline are left to finish on their
    /// own; whatever arrived so far is returned.
    fn collect(self, deadline: Instant) -> String {
        let mut bytes = Vec::new();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.chunks.recv_timeout(remaining) {
                Ok(chunk) => bytes.extend_from_slice(&chunk),
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    tracing::trace!("Output pipes held open past exit; returning partial output");
                    break;
                }
            }
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R, tx: Sender<Vec<u8>>) {
    std::thread::spawn(move || {
        let mut buf = [0u8; 4096];
        loop {
            match pipe.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
            }
        }
    });
}
