//! Pack jobs and their outcomes.

use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use strum::Display;

/// Extension of the produced archives
pub const ARCHIVE_EXTENSION: &str = "pbo";

/// One source directory to archive into one output file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackJob {
    /// Directory handed to the packer
    pub source_dir: PathBuf,
    /// Archive the packer writes
    pub output_artifact: PathBuf,
}

impl PackJob {
    pub fn new(source_dir: impl Into<PathBuf>, output_artifact: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            output_artifact: output_artifact.into(),
        }
    }

    /// Build the job for a manifest entry.
    ///
    /// The archive name is the lowercased entry plus [`ARCHIVE_EXTENSION`].
    /// A rooted entry is joined as if relative, so both paths stay under
    /// `pack_root` and `output_dir`.
    pub fn for_entry(pack_root: &Path, output_dir: &Path, entry: &str) -> Self {
        Self {
            source_dir: pack_root.join(unrooted(entry)),
            output_artifact: output_dir.join(unrooted(&artifact_file_name(entry))),
        }
    }
}

/// `/a/b` -> `a/b`
fn unrooted(path: &str) -> PathBuf {
    Path::new(path)
        .components()
        .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
        .collect()
}

/// `Alpha` -> `alpha.pbo`
pub fn artifact_file_name(entry: &str) -> String {
    format!("{}.{}", entry.to_lowercase(), ARCHIVE_EXTENSION)
}

/// Final state of a job that a worker ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobStatus {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobOutcome {
    pub job: PackJob,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobOutcome {
    pub fn succeeded(job: PackJob) -> Self {
        Self {
            job,
            status: JobStatus::Succeeded,
            error: None,
        }
    }

    pub fn failed(job: PackJob, error: impl ToString) -> Self {
        Self {
            job,
            status: JobStatus::Failed,
            error: Some(error.to_string()),
        }
    }
}

/// Aggregated result of one packing run.
///
/// Outcomes are in completion order, not manifest order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackReport {
    /// Jobs accepted by a worker
    pub submitted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Jobs taken off the queue after cancellation and never run
    pub abandoned: usize,
    pub outcomes: Vec<JobOutcome>,
}

impl PackReport {
    pub(crate) fn record(&mut self, outcome: JobOutcome) {
        match outcome.status {
            JobStatus::Succeeded => self.succeeded += 1,
            JobStatus::Failed => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &JobOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == JobStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_entry_lowercases_artifact_only() {
        let job = PackJob::for_entry(Path::new("/root"), Path::new("/out"), "CUP_Terrains");
        assert_eq!(job.source_dir, PathBuf::from("/root/CUP_Terrains"));
        assert_eq!(job.output_artifact, PathBuf::from("/out/cup_terrains.pbo"));
    }

    #[test]
    fn test_rooted_entry_stays_under_base_dirs() {
        let job = PackJob::for_entry(Path::new("/root"), Path::new("/out"), "/tmp/x/Victim");
        assert_eq!(job.source_dir, PathBuf::from("/root/tmp/x/Victim"));
        assert_eq!(job.output_artifact, PathBuf::from("/out/tmp/x/victim.pbo"));

        let job = PackJob::for_entry(Path::new("/root"), Path::new("/out"), "//addon");
        assert_eq!(job.source_dir, PathBuf::from("/root/addon"));
        assert_eq!(job.output_artifact, PathBuf::from("/out/addon.pbo"));
    }

    #[test]
    fn test_report_counts() {
        let mut report = PackReport::default();
        report.record(JobOutcome::succeeded(PackJob::new("/a", "/o/a.pbo")));
        report.record(JobOutcome::failed(PackJob::new("/b", "/o/b.pbo"), "boom"));
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert!(report.has_failures());
        let failed: Vec<_> = report.failures().collect();
        assert_eq!(failed[0].error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(JobStatus::Succeeded.to_string(), "succeeded");
        assert_eq!(JobStatus::Failed.to_string(), "failed");
    }
}
