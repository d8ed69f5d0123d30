// src/utils/bootstrap.rs - Startup shared by every binary
use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use crate::classification::TaxonomyConfig;
use crate::reconcile::JobContext;
use crate::store::{PgEntityStore, TableConfig};
use crate::utils::db_connect::{connect, get_pool_status, StoreConfig};
use crate::utils::env::{env_flag, load_env};

pub const RECORD_RUNS_ENV: &str = "TAXONOMY_RECORD_RUNS";

#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct JobArgs {
    /// Dry run mode (compute and report changes, don't update the store)
    #[arg(long)]
    pub dry_run: bool,
}

pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Loads `.env`, validates configuration, and connects. Any configuration problem
/// fails here, before a single entity is read.
pub async fn pg_job_context(args: &JobArgs) -> Result<JobContext<PgEntityStore>> {
    load_env();
    let store_config = StoreConfig::from_env().context("Invalid store configuration")?;
    let taxonomy_config = TaxonomyConfig::from_env().context("Invalid taxonomy configuration")?;
    let tables = TableConfig::from_env();
    info!(
        "Tables: agents={}, business_functions={}, departments={}, runs={}",
        tables.agents, tables.business_functions, tables.departments, tables.runs
    );

    let pool = connect(&store_config)
        .await
        .context("Failed to connect to database")?;
    let (connections, idle) = get_pool_status(&pool);
    info!("Connection pool ready: {} connections ({} idle)", connections, idle);

    let record_runs = env_flag(RECORD_RUNS_ENV, true);
    Ok(JobContext::new(PgEntityStore::new(pool), tables, taxonomy_config, args.dry_run)
        .with_record_runs(record_runs))
}
