// src/bin/find_duplicates.rs
//! Reports agents sharing a name or display name, exactly or after normalization.
//! Read-only. Exits with status 2 when exact-name duplicates exist.

use anyhow::Result;
use clap::Parser;
use log::{error, info};
use taxonomy_lib::utils::bootstrap::{init_logging, pg_job_context, JobArgs};

const HARD_DUPLICATES_EXIT_CODE: i32 = 2;

#[tokio::main]
async fn main() -> Result<()> {
    let args = JobArgs::parse();
    init_logging();

    let ctx = pg_job_context(&args).await?;
    if ctx.run_duplicates().await? {
        error!("Exact-name duplicates exist; exiting with status {}", HARD_DUPLICATES_EXIT_CODE);
        std::process::exit(HARD_DUPLICATES_EXIT_CODE);
    }
    info!("No exact-name duplicates found");
    Ok(())
}
