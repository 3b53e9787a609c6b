//! Bounded worker pool that runs pack jobs against a strategy.
//!
//! Workers are plain OS threads sharing one rendezvous channel
//! (`bounded(0)`), so [`WorkerPool::submit`] blocks until a worker is free
//! and at most `workers` jobs are ever in flight. Every worker also watches
//! the run's [`CancelToken`]:
//!
//! - queue closed and empty: the worker exits
//! - token raised: the worker stops taking jobs; a job received after the
//!   token was raised is abandoned, never run
//!
//! A failing job is logged and recorded in the [`PackReport`]. It never
//! stops the other workers.

use crossbeam_channel::{Receiver, Sender, select};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::cancel::CancelToken;
use crate::error::{PackError, Result};
use crate::job::{JobOutcome, PackJob, PackReport};
use crate::strategy::PackStrategy;

/// Worker count used when none is configured
pub const DEFAULT_WORKERS: usize = 10;

enum WorkerEvent {
    Finished(JobOutcome),
    Abandoned(PackJob),
}

pub struct WorkerPool {
    jobs: Option<Sender<PackJob>>,
    events: Receiver<WorkerEvent>,
    handles: Vec<JoinHandle<()>>,
    cancel: CancelToken,
    submitted: usize,
}

impl WorkerPool {
    /// Spawn `workers` threads (at least one) bound to `strategy`
    pub fn start(
        workers: usize,
        strategy: Arc<dyn PackStrategy>,
        cancel: CancelToken,
    ) -> Result<Self> {
        let workers = workers.max(1);
        let (job_tx, job_rx) = crossbeam_channel::bounded::<PackJob>(0);
        let (event_tx, event_rx) = crossbeam_channel::unbounded();

        let handles = (0..workers)
            .map(|id| {
                let jobs = job_rx.clone();
                let events = event_tx.clone();
                let strategy = Arc::clone(&strategy);
                let cancel = cancel.clone();
                thread::Builder::new()
                    .name(format!("pack-worker-{}", id))
                    .spawn(move || worker_loop(id, jobs, events, strategy, cancel))
            })
            .collect::<io::Result<Vec<_>>>()?;

        tracing::debug!("Started {} pack worker(s)", workers);

        Ok(Self {
            jobs: Some(job_tx),
            events: event_rx,
            handles,
            cancel,
            submitted: 0,
        })
    }

    /// Number of worker threads
    pub fn workers(&self) -> usize {
        self.handles.len()
    }

    /// Hand `job` to the next free worker, blocking until one accepts it.
    ///
    /// Fails with [`PackError::Cancelled`] once the token is raised.
    pub fn submit(&mut self, job: PackJob) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(PackError::Cancelled { abandoned: 0 });
        }
        let Some(jobs) = self.jobs.clone() else {
            return Err(PackError::Cancelled { abandoned: 0 });
        };
        let cancelled = self.cancel.receiver().clone();

        let accepted = select! {
            send(jobs, job) -> res => res.is_ok(),
            recv(cancelled) -> _ => false,
        };

        if accepted {
            self.submitted += 1;
            Ok(())
        } else {
            Err(PackError::Cancelled { abandoned: 0 })
        }
    }

    /// Close the queue, wait for every worker to exit, collect the outcomes
    pub fn finish(mut self) -> PackReport {
        self.shutdown();

        let mut report = PackReport {
            submitted: self.submitted,
            ..PackReport::default()
        };
        for event in self.events.try_iter() {
            match event {
                WorkerEvent::Finished(outcome) => report.record(outcome),
                WorkerEvent::Abandoned(_) => report.abandoned += 1,
            }
        }
        report
    }

    fn shutdown(&mut self) {
        drop(self.jobs.take());
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                tracing::error!("Pack worker panicked");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            tracing::debug!("WorkerPool dropped without finish, cancelling workers");
            self.cancel.cancel();
            self.shutdown();
        }
    }
}

fn worker_loop(
    worker: usize,
    jobs: Receiver<PackJob>,
    events: Sender<WorkerEvent>,
    strategy: Arc<dyn PackStrategy>,
    cancel: CancelToken,
) {
    tracing::debug!(worker, "Worker started");

    loop {
        let job = select! {
            recv(jobs) -> msg => match msg {
                Ok(job) => job,
                Err(_) => break,
            },
            recv(cancel.receiver()) -> _ => break,
        };

        if cancel.is_cancelled() {
            tracing::warn!(worker, "Run cancelled, abandoning {}", job.source_dir.display());
            let _ = events.send(WorkerEvent::Abandoned(job));
            break;
        }

        let outcome = run_job(worker, &job, strategy.as_ref());
        let _ = events.send(WorkerEvent::Finished(outcome));
    }

    tracing::debug!(worker, "Worker stopped");
}

/// Execute one job: clear the stale artifact, then invoke the strategy
fn run_job(worker: usize, job: &PackJob, strategy: &dyn PackStrategy) -> JobOutcome {
    tracing::info!(
        worker,
        "Packing {} to {}",
        job.source_dir.display(),
        job.output_artifact.display()
    );

    remove_stale_artifact(worker, &job.output_artifact);

    match strategy.pack(job) {
        Ok(()) => {
            tracing::debug!(worker, "Packed {}", job.output_artifact.display());
            JobOutcome::succeeded(job.clone())
        }
        Err(e) => {
            tracing::error!(worker, "Error while working on {}: {}", job.source_dir.display(), e);
            JobOutcome::failed(job.clone(), e)
        }
    }
}

/// Delete an existing artifact so the packer writes to a clean path.
/// Failure is logged and otherwise ignored.
fn remove_stale_artifact(worker: usize, path: &Path) {
    match fs::symlink_metadata(path) {
        Ok(_) => {
            tracing::info!(worker, "Remove {} before creating new archive", path.display());
            if let Err(e) = fs::remove_file(path) {
                tracing::warn!(worker, "Could not remove {}: {}", path.display(), e);
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(worker, "Could not inspect {}: {}", path.display(), e);
        }
    }
}
