use crate::config::Config;
use crate::models::{BatchSummary, JobRecord};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Everything a batch run did, as written by `--report`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub config: Config,
    pub summary: BatchSummary,
    pub jobs: Vec<JobRecord>,
}

impl BatchReport {
    pub fn new(config: Config, jobs: Vec<JobRecord>) -> Self {
        let summary = BatchSummary::from_records(&jobs);
        Self {
            config,
            summary,
            jobs,
        }
    }
}

pub struct ReportWriter {
    report_file: PathBuf,
}

impl ReportWriter {
    pub fn new(report_file: &Path) -> Self {
        Self {
            report_file: report_file.to_path_buf(),
        }
    }

    pub fn save(&self, report: &BatchReport) -> Result<()> {
        let content =
            serde_json::to_string_pretty(report).context("Failed to serialize report")?;

        fs::write(&self.report_file, content)
            .with_context(|| format!("Failed to write report {}", self.report_file.display()))?;

        Ok(())
    }
}
