use anyhow::Result;
use clap::Parser;
use nova_fits_dl::cli::Args;
use nova_fits_dl::jobs::JobRunner;
use nova_fits_dl::logging;
use nova_fits_dl::report::{BatchReport, ReportWriter};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_logging(args.verbose);

    let config = args.to_config();
    config.validate()?;

    println!(
        "Processing {} jobs starting at {} from {}",
        config.job_count, config.job_start, config.base_url
    );

    let runner = JobRunner::new(config)?;
    let records = runner.run().await?;
    let report = BatchReport::new(runner.config().clone(), records);

    if let Some(path) = &args.report {
        ReportWriter::new(path).save(&report)?;
    }

    let summary = &report.summary;
    println!(
        "\nDone: {} downloaded, {} not successful, {} status check failed, {} failed ({} bytes)",
        summary.downloaded, summary.not_successful, summary.check_failed, summary.failed, summary.bytes
    );
    tracing::info!("Download process completed");

    Ok(())
}
