use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

pub type JobId = u64;

/// A file attached to a solved job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Artifact {
    Axy,
    Image,
}

impl Artifact {
    /// The axy file is smaller, so it is fetched first and gates the image.
    pub const DOWNLOAD_ORDER: [Artifact; 2] = [Artifact::Axy, Artifact::Image];

    fn route(self) -> &'static str {
        match self {
            Artifact::Axy => "axy_file",
            Artifact::Image => "new_fits_file",
        }
    }

    pub fn file_name(self, job_id: JobId) -> String {
        format!("{}-{}.fits", job_id, self)
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::Axy => f.write_str("axy"),
            Artifact::Image => f.write_str("image"),
        }
    }
}

/// URLs of the remote service, derived from its base URL.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: String,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Self {
        Self {
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn status_url(&self, job_id: JobId) -> String {
        format!("{}/api/jobs/{}", self.base, job_id)
    }

    pub fn artifact_url(&self, artifact: Artifact, job_id: JobId) -> String {
        format!("{}/{}/{}", self.base, artifact.route(), job_id)
    }
}

pub fn job_dir(dataset_root: &Path, job_id: JobId) -> PathBuf {
    dataset_root.join(job_id.to_string())
}

pub fn artifact_path(dataset_root: &Path, job_id: JobId, artifact: Artifact) -> PathBuf {
    job_dir(dataset_root, job_id).join(artifact.file_name(job_id))
}

/// Terminal state of one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    /// Both artifacts are on disk.
    Downloaded { bytes: u64 },
    /// The service did not report the job as solved; nothing was created.
    NotSuccessful,
    /// The status request itself failed.
    CheckFailed { reason: String },
    /// An artifact failed and the job directory was removed.
    ArtifactFailed { artifact: Artifact, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: JobId,
    #[serde(flatten)]
    pub outcome: JobOutcome,
}

impl JobRecord {
    pub fn new(job_id: JobId, outcome: JobOutcome) -> Self {
        Self { job_id, outcome }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub downloaded: usize,
    pub not_successful: usize,
    pub check_failed: usize,
    pub failed: usize,
    pub bytes: u64,
}

impl BatchSummary {
    pub fn from_records(records: &[JobRecord]) -> Self {
        let mut summary = Self::default();
        for record in records {
            match &record.outcome {
                JobOutcome::Downloaded { bytes } => {
                    summary.downloaded += 1;
                    summary.bytes += bytes;
                }
                JobOutcome::NotSuccessful => summary.not_successful += 1,
                JobOutcome::CheckFailed { .. } => summary.check_failed += 1,
                JobOutcome::ArtifactFailed { .. } => summary.failed += 1,
            }
        }
        summary
    }
}
