use crate::config::{self, Config, StatusCheck};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "nova-fits-dl")]
#[command(author, version, about = "Download solved astrometry job FITS files", long_about = None)]
pub struct Args {
    /// Base URL of the astrometry service
    #[arg(short, long, default_value = config::DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Dataset directory (one sub-directory per job)
    #[arg(short, long, default_value = config::DEFAULT_DATASET_ROOT)]
    pub output: PathBuf,

    /// First job ID to process
    #[arg(short, long, default_value_t = config::DEFAULT_JOB_START)]
    pub start: u64,

    /// Number of consecutive job IDs to process
    #[arg(short, long, default_value_t = config::DEFAULT_JOB_COUNT)]
    pub count: u64,

    /// Request timeout in seconds (connect, headers, and each read)
    #[arg(short, long, default_value_t = config::DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Minimum average download speed in bytes per second
    #[arg(long, default_value_t = config::DEFAULT_MIN_SPEED_BPS)]
    pub min_speed: u64,

    /// Write size per chunk in bytes
    #[arg(long, default_value_t = config::DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Number of jobs processed in parallel
    #[arg(short, long, default_value = "1")]
    pub jobs: usize,

    /// How the job status response is checked
    #[arg(long, value_enum, default_value = "exact")]
    pub status_check: StatusCheck,

    /// Hide per-file progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Write a JSON report of every job to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn to_config(&self) -> Config {
        Config {
            base_url: self.base_url.clone(),
            dataset_root: self.output.clone(),
            job_start: self.start,
            job_count: self.count,
            timeout_secs: self.timeout,
            min_speed_bps: self.min_speed,
            chunk_size: self.chunk_size,
            concurrency: self.jobs,
            status_check: self.status_check,
            show_progress: !self.no_progress,
        }
    }
}
