//! Packing run orchestration.
//!
//! [`Dispatcher::pack`] validates the pack root, manifest, settings, output
//! directory and backend before any work starts. It then streams one job per
//! manifest entry into a [`WorkerPool`] in manifest order.
//!
//! # Failure Modes
//!
//! - Anything wrong before the pool starts: error, zero jobs run.
//! - Entry N is not a directory: entries after N are never submitted, jobs
//!   already handed out for entries before N still run to completion, then
//!   the error is returned.
//! - Job failures: recorded in the report; an error only in strict mode.

use std::fs;
use std::io;
use std::path::Path;

use crate::cancel::CancelToken;
use crate::error::{PackError, Result};
use crate::job::{PackJob, PackReport};
use crate::manifest::{MANIFEST_FILE, read_manifest};
use crate::pool::{DEFAULT_WORKERS, WorkerPool};
use crate::settings::{PackerConfig, SETTINGS_FILE};
use crate::strategy::StrategyRegistry;

#[derive(Debug)]
pub struct Dispatcher {
    registry: StrategyRegistry,
    workers: usize,
    strict: bool,
    cancel: CancelToken,
}

impl Dispatcher {
    pub fn new(registry: StrategyRegistry) -> Self {
        Self {
            registry,
            workers: DEFAULT_WORKERS,
            strict: false,
            cancel: CancelToken::new(),
        }
    }

    /// Worker pool size, at least one
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Treat any failed job as a failed run
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Share an externally owned cancellation token (e.g. the signal handler's)
    pub fn cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Pack every directory listed in `pack_root`'s manifest
    pub fn pack(&self, pack_root: impl AsRef<Path>) -> Result<PackReport> {
        let pack_root = pack_root.as_ref();
        require_dir("pack root", pack_root)?;

        let entries = read_manifest(pack_root.join(MANIFEST_FILE))?;
        tracing::debug!("Manifest lists {} entries", entries.len());

        let settings = PackerConfig::load_from_file(pack_root.join(SETTINGS_FILE))?;

        require_dir("output directory", &settings.output)?;

        let strategy = self
            .registry
            .resolve(&settings.packer.name, &settings.packer)?;
        if let Some(rapify) = settings.rapify {
            tracing::debug!("rapify = {} is set but not applied by this packer", rapify);
        }

        let mut pool = WorkerPool::start(self.workers, strategy, self.cancel.clone())?;
        tracing::info!(
            "Packing {} director(ies) from {} into {} with {} worker(s)",
            entries.len(),
            pack_root.display(),
            settings.output.display(),
            pool.workers()
        );

        let dispatched = self.dispatch(&mut pool, pack_root, &settings.output, &entries);
        let report = pool.finish();

        if let Err(e) = dispatched {
            if !e.is_cancelled() {
                return Err(e);
            }
        }

        if self.cancel.is_cancelled() {
            return Err(PackError::Cancelled {
                abandoned: report.abandoned,
            });
        }

        tracing::info!(
            "Packed {} of {} director(ies), {} failed",
            report.succeeded,
            report.submitted,
            report.failed
        );

        if self.strict && report.has_failures() {
            return Err(PackError::JobsFailed {
                failed: report.failed,
                total: report.submitted,
            });
        }

        Ok(report)
    }

    /// Validate and submit entries in order, stopping at the first bad one
    fn dispatch(
        &self,
        pool: &mut WorkerPool,
        pack_root: &Path,
        output_dir: &Path,
        entries: &[String],
    ) -> Result<()> {
        for entry in entries {
            let job = PackJob::for_entry(pack_root, output_dir, entry);
            if let Err(reason) = check_dir(&job.source_dir) {
                tracing::error!("Manifest entry '{}' is invalid: {}", entry, reason);
                return Err(PackError::InvalidEntry {
                    entry: entry.clone(),
                    path: job.source_dir,
                    reason,
                });
            }
            pool.submit(job)?;
        }
        Ok(())
    }
}

fn require_dir(what: &'static str, path: &Path) -> Result<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(PackError::NotADirectory {
            what,
            path: path.to_path_buf(),
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(PackError::NotFound {
            what,
            path: path.to_path_buf(),
        }),
        Err(e) => Err(PackError::Io(e)),
    }
}

fn check_dir(path: &Path) -> std::result::Result<(), String> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err("not a directory".to_string()),
        Err(e) => Err(e.to_string()),
    }
}
