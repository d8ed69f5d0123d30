use anyhow::{Context, Result};
use clap::Parser;
use indicatif::ProgressBar;
use log::{error, info};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use taxonomy_lib::models::stats_models::JobKind;
use taxonomy_lib::reconcile::{apply_report, PIPELINE_JOBS};
use taxonomy_lib::utils::bootstrap::{init_logging, pg_job_context, JobArgs};
use taxonomy_lib::utils::db_connect::get_pool_status;
use taxonomy_lib::utils::get_memory_usage;
use taxonomy_lib::utils::progress_bars::logging::{log_pipeline_completion, log_pipeline_start};
use taxonomy_lib::utils::progress_bars::progress_config::{pipeline_progress_bar, ProgressConfig};
use uuid::Uuid;

/// Exit status when exact-name duplicates remain after the pipeline.
const HARD_DUPLICATES_EXIT_CODE: i32 = 2;

#[tokio::main]
async fn main() -> Result<()> {
    let args = JobArgs::parse();
    init_logging();
    info!("Starting agent taxonomy pipeline");

    let ctx = pg_job_context(&args).await?;

    let progress_config = Arc::new(ProgressConfig::from_env());
    info!(
        "Progress tracking: enabled={}, detailed={}",
        progress_config.enabled, progress_config.detailed
    );
    let multi_progress = progress_config.create_multi_progress();
    let main_pb = multi_progress
        .as_ref()
        .map(|mp| pipeline_progress_bar(mp, PIPELINE_JOBS.len() as u64 + 1));
    // Entity bars only when detailed progress is requested
    let job_progress = if progress_config.should_show_detailed() {
        multi_progress.as_ref()
    } else {
        None
    };

    let update_main_pb_message =
        |pb: ProgressBar, phase_name: String, config: Arc<ProgressConfig>| async move {
            if config.should_show_memory() {
                let memory_mb = get_memory_usage().await;
                pb.set_message(format!("{} (Memory: {} MB)", phase_name, memory_mb));
            } else {
                pb.set_message(phase_name);
            }
        };

    let pipeline_run_id = Uuid::new_v4().to_string();
    let mut all_jobs = PIPELINE_JOBS.to_vec();
    all_jobs.push(JobKind::Duplicates);
    log_pipeline_start(&pipeline_run_id, &all_jobs, ctx.dry_run);
    let pipeline_start = Instant::now();

    // One snapshot for the whole run; applied values are folded back in so later jobs
    // (departments in particular) see what earlier jobs decided, dry run included.
    let (mut loaded, taxonomy) = ctx.load().await.context("Failed to load snapshot")?;

    let mut phase_times = HashMap::new();
    let mut reports = Vec::with_capacity(PIPELINE_JOBS.len());
    for (step, job) in PIPELINE_JOBS.iter().copied().enumerate() {
        if let Some(pb) = &main_pb {
            update_main_pb_message(
                pb.clone(),
                format!("Phase {}: {}", step + 1, job),
                progress_config.clone(),
            )
            .await;
        }
        let phase_start = Instant::now();

        let report = ctx
            .execute(job, &loaded, &taxonomy, job_progress)
            .await
            .with_context(|| format!("{} job failed", job))?;
        apply_report(&mut loaded.entities, &report);

        phase_times.insert(job, phase_start.elapsed());
        info!(
            "Phase {} ({}) complete in {:.2?}: {} applied, {} errors",
            step + 1,
            job,
            phase_times[&job],
            report.summary.success_count,
            report.summary.error_count
        );
        reports.push(report);
        if let Some(pb) = &main_pb {
            pb.inc(1);
        }
    }

    if let Some(pb) = &main_pb {
        update_main_pb_message(
            pb.clone(),
            format!("Phase {}: duplicates", PIPELINE_JOBS.len() + 1),
            progress_config.clone(),
        )
        .await;
    }
    let has_hard_duplicates = ctx
        .scan_duplicates(&loaded)
        .context("Duplicate scan failed")?;
    if let Some(pb) = &main_pb {
        pb.inc(1);
        pb.finish_with_message("Pipeline complete");
    }

    log_pipeline_completion(&pipeline_run_id, pipeline_start.elapsed(), &reports);

    if progress_config.should_show_memory() {
        let final_memory_mb = get_memory_usage().await;
        info!("Final memory usage: {} MB", final_memory_mb);
    }
    let (connections, idle) = get_pool_status(ctx.store.pool());
    info!(
        "Final DB Connection Pool Status: Total: {}, Idle: {}",
        connections, idle
    );

    if has_hard_duplicates {
        error!(
            "Exact-name duplicates exist; exiting with status {}",
            HARD_DUPLICATES_EXIT_CODE
        );
        std::process::exit(HARD_DUPLICATES_EXIT_CODE);
    }
    info!("Pipeline completed successfully!");
    Ok(())
}
