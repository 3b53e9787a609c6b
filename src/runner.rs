//! Packer process execution
//!
//! Every backend executable goes through [`run_packer`] so that:
//!
//! - the child runs in its own process group with a parent-death signal
//! - its PID is tracked in [`ChildRegistry`] while running, so a signal can
//!   terminate it
//! - stdout/stderr are captured rather than interleaved across workers

use crate::error::JobError;
use crate::process_guard::{ChildRegistry, CommandProcessGroup};
use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::path::Path;
use std::process::{Command, Stdio};

/// Run `program` with `args` and wait for it to finish.
///
/// Returns `Err` only when the process could not be spawned or waited on.
/// A non-zero exit is reported through [`PackerOutput::success`].
pub fn run_packer<I, S>(program: &Path, args: I) -> Result<PackerOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .in_new_process_group();

    tracing::debug!("run_packer: {:?}", cmd);

    let child = cmd
        .spawn()
        .with_context(|| format!("Failed to spawn packer: {}", program.display()))?;
    let pid = child.id();

    if let Ok(mut registry) = ChildRegistry::global().lock() {
        registry.register(pid);
    }

    let output = child.wait_with_output();

    if let Ok(mut registry) = ChildRegistry::global().lock() {
        registry.unregister(pid);
    }

    let output =
        output.with_context(|| format!("Failed waiting for packer: {}", program.display()))?;

    Ok(PackerOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code(),
        success: output.status.success(),
    })
}

/// Captured result of one packer invocation
#[derive(Debug, Clone)]
pub struct PackerOutput {
    pub stdout: String,
    pub stderr: String,
    /// None if terminated by signal
    pub exit_code: Option<i32>,
    pub success: bool,
}

impl PackerOutput {
    /// Turn a failed exit into a [`JobError`]
    pub fn ensure_success(&self) -> std::result::Result<(), JobError> {
        if self.success {
            return Ok(());
        }
        let stderr = self.stderr.trim();
        Err(JobError::Exit {
            code: self.exit_code.unwrap_or(-1),
            stderr: if stderr.is_empty() {
                self.stdout.trim().to_string()
            } else {
                stderr.to_string()
            },
        })
    }
}
