//! Batch downloader for solved astrometry jobs.
//!
//! For each job ID in a range the status endpoint is polled; solved jobs get
//! their axy and image FITS files streamed into `{dataset}/{job_id}/`. A job
//! directory is kept only when both files arrived intact.

pub mod cli;
pub mod config;
pub mod downloader;
pub mod jobs;
pub mod logging;
pub mod models;
pub mod report;
pub mod status;
