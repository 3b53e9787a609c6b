//! Error handling module for e12pack
//!
//! Two layers of errors exist:
//! - [`PackError`] aborts a whole packing run and ends up as a non-zero exit.
//! - [`JobError`] describes a single failed pack job. Workers log and record
//!   these in the run report; they never abort the run on their own.

use std::path::PathBuf;
use thiserror::Error;

/// Run-level error returned by the dispatcher
#[derive(Error, Debug)]
pub enum PackError {
    /// A required path does not exist (pack root, output directory)
    #[error("{what} not found: {}", .path.display())]
    NotFound { what: &'static str, path: PathBuf },

    /// A required path exists but is not a directory
    #[error("{what} is not a directory: {}", .path.display())]
    NotADirectory { what: &'static str, path: PathBuf },

    /// Manifest file missing or unreadable
    #[error("Error while reading manifest {}: {reason}", .path.display())]
    Manifest { path: PathBuf, reason: String },

    /// Manifest exists but lists nothing to pack
    #[error("Manifest {} is empty", .path.display())]
    EmptyManifest { path: PathBuf },

    /// Settings file missing, unparseable or incomplete
    #[error("Error while reading settings {}: {reason}", .path.display())]
    Settings { path: PathBuf, reason: String },

    /// No strategy registered under the configured backend name
    #[error("No packer strategy for packer: {name} (available: {available})")]
    UnknownBackend { name: String, available: String },

    /// Backend factory could not validate its external resource
    #[error("Could not find packer executable: {}, error: {reason}", .path.display())]
    BackendUnavailable { path: PathBuf, reason: String },

    /// A manifest entry does not resolve to a directory under the pack root
    #[error("Directory from manifest entry '{entry}' is invalid: {} ({reason})", .path.display())]
    InvalidEntry {
        entry: String,
        path: PathBuf,
        reason: String,
    },

    /// The run was cancelled before every job was handed out
    #[error("Packing cancelled ({abandoned} job(s) abandoned)")]
    Cancelled { abandoned: usize },

    /// Strict mode: at least one job failed
    #[error("{failed} of {total} pack job(s) failed")]
    JobsFailed { failed: usize, total: usize },

    /// IO errors not covered above
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for run-level operations
pub type Result<T> = std::result::Result<T, PackError>;

impl PackError {
    pub fn manifest(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Manifest {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn settings(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Settings {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error came from a signal or an explicit cancel
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Failure of a single pack job
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// Packer process could not be started
    #[error("failed to start packer: {0}")]
    Spawn(String),

    /// Packer ran but reported failure
    #[error("packer exited with code {code}: {stderr}")]
    Exit { code: i32, stderr: String },

    /// Anything else a strategy wants to report
    #[error("{0}")]
    Other(String),
}

impl JobError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
