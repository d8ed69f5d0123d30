// src/bin/reconcile_departments.rs
//! Assigns canonical department ids consistent with each agent's business function.

use anyhow::Result;
use clap::Parser;
use log::info;
use taxonomy_lib::models::stats_models::JobKind;
use taxonomy_lib::utils::bootstrap::{init_logging, pg_job_context, JobArgs};
use taxonomy_lib::utils::progress_bars::progress_config::ProgressConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let args = JobArgs::parse();
    init_logging();

    let ctx = pg_job_context(&args).await?;
    let multi_progress = ProgressConfig::from_env().create_multi_progress();

    let report = ctx.run_job(JobKind::Department, multi_progress.as_ref()).await?;
    info!(
        "{} finished: {} of {} agents {}",
        report.job,
        report.summary.success_count,
        report.summary.total_processed,
        if args.dry_run { "would change" } else { "updated" }
    );
    Ok(())
}
