// src/utils/instantiate_run.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde_json::json;

use crate::models::core::Record;
use crate::models::stats_models::{JobKind, RunSummary};
use crate::store::EntityStore;

/// Builds the audit row describing one job run.
pub fn build_run_record(
    run_id: &str,
    job: JobKind,
    run_timestamp: DateTime<Utc>,
    summary: &RunSummary,
    taxonomy_fingerprint: &str,
) -> Record {
    let value = json!({
        "id": run_id,
        "job": job.as_str(),
        "run_timestamp": run_timestamp.to_rfc3339(),
        "dry_run": summary.dry_run,
        "success_count": summary.success_count,
        "skipped_count": summary.skipped_count,
        "error_count": summary.error_count,
        "needs_review_count": summary.needs_review_count,
        "total_processed": summary.total_processed,
        "taxonomy_fingerprint": taxonomy_fingerprint,
    });
    match value {
        serde_json::Value::Object(record) => record,
        _ => Record::new(),
    }
}

pub async fn record_taxonomy_run<S: EntityStore>(
    store: &S,
    runs_table: &str,
    run_id: &str,
    job: JobKind,
    summary: &RunSummary,
    taxonomy_fingerprint: &str,
) -> Result<()> {
    let record = build_run_record(run_id, job, Utc::now(), summary, taxonomy_fingerprint);
    store
        .insert(runs_table, &[record])
        .await
        .with_context(|| format!("Failed to insert {} run record {}", job, run_id))?;
    info!("Recorded {} run {} in {}", job, run_id, runs_table);
    Ok(())
}

/// The audit row is bookkeeping; a failure to write it never fails the job.
pub async fn try_record_taxonomy_run<S: EntityStore>(
    store: &S,
    runs_table: &str,
    run_id: &str,
    job: JobKind,
    summary: &RunSummary,
    taxonomy_fingerprint: &str,
) {
    if let Err(e) =
        record_taxonomy_run(store, runs_table, run_id, job, summary, taxonomy_fingerprint).await
    {
        warn!("Could not record run audit row: {:#}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use chrono::TimeZone;

    #[test]
    fn test_build_run_record() {
        let summary = RunSummary {
            success_count: 2,
            skipped_count: 1,
            error_count: 0,
            total_processed: 3,
            needs_review_count: 1,
            dry_run: true,
        };
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let record = build_run_record("run-1", JobKind::Tier, ts, &summary, "abc");
        assert_eq!(record["job"], json!("tier"));
        assert_eq!(record["run_timestamp"], json!("2024-05-01T12:00:00+00:00"));
        assert_eq!(record["dry_run"], json!(true));
        assert_eq!(record["total_processed"], json!(3));
    }

    #[tokio::test]
    async fn test_record_taxonomy_run_inserts_row() {
        let store = InMemoryStore::new();
        record_taxonomy_run(
            &store,
            "taxonomy_runs",
            "run-2",
            JobKind::Department,
            &RunSummary::default(),
            "f",
        )
        .await
        .unwrap();
        let rows = store.rows("taxonomy_runs").await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], json!("run-2"));
    }
}
