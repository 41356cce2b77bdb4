use crate::config::Config;
use anyhow::{Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, StatusCode};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// The only content type accepted for artifact downloads.
pub const FITS_CONTENT_TYPE: &str = "application/fits";

/// Why a single download attempt failed.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {0}")]
    HttpStatus(StatusCode),
    #[error("invalid file type ({0:?})")]
    ContentType(String),
    #[error("download too slow ({rate:.2} Bps after {bytes} bytes)")]
    TooSlow { rate: f64, bytes: u64 },
    #[error("storage: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    /// Local disk failures stop the whole batch; everything else only fails the artifact.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DownloadError::Io(_))
    }
}

/// Running average throughput check, re-evaluated after every chunk.
#[derive(Debug)]
pub struct SpeedGuard {
    min_bps: u64,
    bytes: u64,
}

impl SpeedGuard {
    pub fn new(min_bps: u64) -> Self {
        Self { min_bps, bytes: 0 }
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Average bytes per second so far, `None` while no time has elapsed.
    pub fn rate(&self, elapsed: Duration) -> Option<f64> {
        if elapsed.is_zero() {
            return None;
        }
        Some(self.bytes as f64 / elapsed.as_secs_f64())
    }

    pub fn record(&mut self, len: usize, elapsed: Duration) -> Result<(), DownloadError> {
        self.bytes += len as u64;
        match self.rate(elapsed) {
            Some(rate) if rate < self.min_bps as f64 => Err(DownloadError::TooSlow {
                rate,
                bytes: self.bytes,
            }),
            _ => Ok(()),
        }
    }
}

#[derive(Clone)]
pub struct Downloader {
    client: Client,
    timeout: Duration,
    min_speed_bps: u64,
    chunk_size: usize,
    progress: MultiProgress,
}

impl Downloader {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.timeout())
            .build()
            .context("Failed to build HTTP client")?;

        let progress = if config.show_progress {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        Ok(Self {
            client,
            timeout: config.timeout(),
            min_speed_bps: config.min_speed_bps,
            chunk_size: config.chunk_size,
            progress,
        })
    }

    /// GET a small text body, bounded by the request timeout as a whole.
    pub async fn fetch_status(&self, url: &str) -> Result<String, DownloadError> {
        let request = async {
            let response = self.client.get(url).send().await?;
            Ok::<_, reqwest::Error>(response.text().await?)
        };
        let body = timeout(self.timeout, request)
            .await
            .map_err(|_| DownloadError::Timeout(self.timeout))??;
        Ok(body)
    }

    /// Stream `url` into `dest`, returning the number of bytes written.
    ///
    /// On any error the destination file does not exist afterwards.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<u64, DownloadError> {
        let result = self.fetch_to_file(url, dest).await;

        match &result {
            Ok(bytes) => info!("Downloaded {} ({} bytes)", dest.display(), bytes),
            Err(DownloadError::TooSlow { rate, .. }) => {
                warn!("Download too slow ({:.2} Bps), aborting {}", rate, dest.display())
            }
            Err(DownloadError::HttpStatus(code)) => {
                warn!("Failed to download {}: HTTP {}", url, code.as_u16())
            }
            Err(DownloadError::ContentType(ct)) => {
                warn!("Invalid file type ({}) for {}", ct, url)
            }
            Err(DownloadError::Timeout(_)) => warn!("Timeout while downloading {}", url),
            Err(err) => warn!("Error downloading {}: {}", url, err),
        }

        if result.is_err() && dest.exists() {
            match fs::remove_file(dest) {
                Ok(()) => debug!("removed partial file {}", dest.display()),
                Err(e) => warn!("could not remove partial file {}: {}", dest.display(), e),
            }
        }

        result
    }

    async fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<u64, DownloadError> {
        let mut response = timeout(self.timeout, self.client.get(url).send())
            .await
            .map_err(|_| DownloadError::Timeout(self.timeout))??;

        if response.status() != StatusCode::OK {
            return Err(DownloadError::HttpStatus(response.status()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if content_type != FITS_CONTENT_TYPE {
            return Err(DownloadError::ContentType(content_type.to_string()));
        }

        let pb = self.progress_bar(response.content_length(), dest);
        let mut file = File::create(dest)?;
        let result = self.stream_body(&mut response, &mut file, &pb).await;
        pb.finish_and_clear();
        result
    }

    async fn stream_body(
        &self,
        response: &mut Response,
        file: &mut File,
        pb: &ProgressBar,
    ) -> Result<u64, DownloadError> {
        let mut guard = SpeedGuard::new(self.min_speed_bps);
        let start = Instant::now();

        loop {
            let chunk = timeout(self.timeout, response.chunk())
                .await
                .map_err(|_| DownloadError::Timeout(self.timeout))??;
            let Some(chunk) = chunk else {
                break;
            };
            if chunk.is_empty() {
                break;
            }

            for piece in chunk.chunks(self.chunk_size) {
                file.write_all(piece)?;
                pb.inc(piece.len() as u64);

                let elapsed = start.elapsed();
                guard.record(piece.len(), elapsed)?;
                if let Some(rate) = guard.rate(elapsed) {
                    pb.set_message(format!("{:.2} KB/s", rate / 1024.0));
                }
            }
        }

        file.flush()?;
        Ok(guard.bytes())
    }

    fn progress_bar(&self, total: Option<u64>, dest: &Path) -> ProgressBar {
        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let pb = match total {
            Some(total) => {
                let pb = self.progress.add(ProgressBar::new(total));
                pb.set_style(
                    ProgressStyle::with_template(
                        "{prefix:30} {bar:40} {bytes}/{total_bytes} ({msg})",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=>-"),
                );
                pb
            }
            None => {
                let pb = self.progress.add(ProgressBar::new_spinner());
                pb.set_style(
                    ProgressStyle::with_template("{prefix:30} {spinner} {bytes} ({msg})")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                pb
            }
        };
        pb.set_prefix(format!("Downloading {}", name));
        pb
    }
}
