use crate::config::Config;
use crate::downloader::Downloader;
use crate::models::{self, Artifact, Endpoints, JobId, JobOutcome, JobRecord};
use crate::status;
use anyhow::{Context, Result};
use futures::future;
use futures::stream::{self, StreamExt};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

/// Walks the configured job range and keeps or removes each job directory.
pub struct JobRunner {
    config: Config,
    endpoints: Endpoints,
    downloader: Downloader,
}

impl JobRunner {
    pub fn new(config: Config) -> Result<Self> {
        let endpoints = Endpoints::new(&config.base_url);
        let downloader = Downloader::new(&config)?;
        Ok(Self {
            config,
            endpoints,
            downloader,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process every job in the range. Records come back in job order.
    ///
    /// Per-job failures are recorded and the batch continues; only setup and
    /// disk errors end the run early. After such an error no new job starts,
    /// but jobs already in flight finish their own keep-or-remove step before
    /// the error is returned.
    pub async fn run(&self) -> Result<Vec<JobRecord>> {
        fs::create_dir_all(&self.config.dataset_root).with_context(|| {
            format!(
                "Failed to create dataset directory {}",
                self.config.dataset_root.display()
            )
        })?;

        let stopped = AtomicBool::new(false);
        let stopped = &stopped;

        let results: Vec<Result<JobRecord>> = stream::iter(self.config.job_ids())
            .take_while(|_| future::ready(!stopped.load(Ordering::SeqCst)))
            .map(|job_id| async move {
                let result = self.process_job(job_id).await;
                if result.is_err() {
                    stopped.store(true, Ordering::SeqCst);
                }
                result
            })
            .buffered(self.config.concurrency)
            .collect()
            .await;

        results.into_iter().collect()
    }

    pub async fn process_job(&self, job_id: JobId) -> Result<JobRecord> {
        info!("Processing job {}...", job_id);

        let body = match self
            .downloader
            .fetch_status(&self.endpoints.status_url(job_id))
            .await
        {
            Ok(body) => body,
            Err(err) => {
                warn!("Failed to check status for job {}: {}", job_id, err);
                return Ok(JobRecord::new(
                    job_id,
                    JobOutcome::CheckFailed {
                        reason: err.to_string(),
                    },
                ));
            }
        };

        if !status::is_successful(&body, self.config.status_check) {
            warn!("Job {} was not successful", job_id);
            return Ok(JobRecord::new(job_id, JobOutcome::NotSuccessful));
        }

        let dir = models::job_dir(&self.config.dataset_root, job_id);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create job directory {}", dir.display()))?;

        let mut total = 0u64;
        for artifact in Artifact::DOWNLOAD_ORDER {
            let url = self.endpoints.artifact_url(artifact, job_id);
            let path = models::artifact_path(&self.config.dataset_root, job_id, artifact);

            match self.downloader.download(&url, &path).await {
                Ok(bytes) => total += bytes,
                Err(err) => {
                    error!(
                        "Failed to fully download job {} ({} file: {})",
                        job_id, artifact, err
                    );
                    remove_job_dir(&dir);
                    if err.is_fatal() {
                        return Err(anyhow::Error::new(err)
                            .context(format!("Failed to write {}", path.display())));
                    }
                    return Ok(JobRecord::new(
                        job_id,
                        JobOutcome::ArtifactFailed {
                            artifact,
                            reason: err.to_string(),
                        },
                    ));
                }
            }
        }

        info!("Successfully downloaded job {} ({} bytes)", job_id, total);
        Ok(JobRecord::new(job_id, JobOutcome::Downloaded { bytes: total }))
    }
}

/// Best-effort recursive removal; a failure here must not stop the batch.
fn remove_job_dir(dir: &Path) {
    if !dir.exists() {
        return;
    }
    match fs::remove_dir_all(dir) {
        Ok(()) => debug!("removed job directory {}", dir.display()),
        Err(e) => debug!("ignoring failure to remove {}: {}", dir.display(), e),
    }
}
