use anyhow::{Result, bail};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://nova.astrometry.net";
pub const DEFAULT_DATASET_ROOT: &str = "./dataset";
pub const DEFAULT_JOB_START: u64 = 1_544_128;
pub const DEFAULT_JOB_COUNT: u64 = 50;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MIN_SPEED_BPS: u64 = 5000;
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// How the job status body is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StatusCheck {
    /// Whole body must equal `{"status": "success"}`.
    #[default]
    Exact,
    /// Body is parsed as JSON and its `status` field must be `"success"`.
    Parsed,
}

/// Settings shared by the job runner and the downloader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub base_url: String,
    pub dataset_root: PathBuf,
    pub job_start: u64,
    pub job_count: u64,
    /// Bound on connecting, waiting for headers, and each body read.
    pub timeout_secs: u64,
    /// Average throughput below which a transfer is abandoned.
    pub min_speed_bps: u64,
    pub chunk_size: usize,
    /// Jobs in flight at once; 1 keeps the batch strictly sequential.
    pub concurrency: usize,
    pub status_check: StatusCheck,
    pub show_progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            dataset_root: PathBuf::from(DEFAULT_DATASET_ROOT),
            job_start: DEFAULT_JOB_START,
            job_count: DEFAULT_JOB_COUNT,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            min_speed_bps: DEFAULT_MIN_SPEED_BPS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            concurrency: 1,
            status_check: StatusCheck::Exact,
            show_progress: true,
        }
    }
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn job_ids(&self) -> Range<u64> {
        self.job_start..self.job_start.saturating_add(self.job_count)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            bail!("base URL must start with http:// or https://: {}", self.base_url);
        }
        if self.timeout_secs == 0 {
            bail!("timeout must be at least one second");
        }
        if self.chunk_size == 0 {
            bail!("chunk size must be greater than zero");
        }
        if self.concurrency == 0 {
            bail!("concurrency must be greater than zero");
        }
        Ok(())
    }
}
