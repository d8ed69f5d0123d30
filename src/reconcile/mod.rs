// src/reconcile/mod.rs - Job wiring shared by the pipeline and the single-job binaries
pub mod driver;
pub mod jobs;

use anyhow::{anyhow, Context, Result};
use indicatif::MultiProgress;
use log::info;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

pub use driver::{apply_report, reconcile, ReconcileOptions};
pub use jobs::{
    is_canonical_id, reconciler_for, BusinessFunctionReconciler, Decision, DepartmentReconciler,
    FieldReconciler, TierReconciler, ToolKitReconciler,
};

use crate::classification::{Classifier, TaxonomyConfig};
use crate::matching::duplicates::find_duplicates;
use crate::models::core::LoadedEntities;
use crate::models::stats_models::{JobKind, RunReport};
use crate::models::taxonomy::TaxonomySnapshot;
use crate::store::{load_entities, load_taxonomy_snapshot, EntityStore, TableConfig};
use crate::utils::instantiate_run::try_record_taxonomy_run;
use crate::utils::progress_bars::logging::{log_duplicate_report, JobLogger};

/// Reconciliation jobs in the order the pipeline runs them. Departments follow business
/// functions so the consistency check sees canonical business-function ids.
pub const PIPELINE_JOBS: [JobKind; 4] = [
    JobKind::BusinessFunction,
    JobKind::Department,
    JobKind::Tier,
    JobKind::ToolKit,
];

/// Everything a job needs besides the entities themselves.
pub struct JobContext<S: EntityStore> {
    pub store: S,
    pub tables: TableConfig,
    pub classifier: Classifier,
    pub dry_run: bool,
    /// Insert an audit row into the runs table after each job.
    pub record_runs: bool,
    fingerprint: String,
}

impl<S: EntityStore> JobContext<S> {
    pub fn new(store: S, tables: TableConfig, config: TaxonomyConfig, dry_run: bool) -> Self {
        let fingerprint = config.fingerprint();
        info!("Taxonomy configuration fingerprint: {}", fingerprint);
        Self {
            store,
            tables,
            classifier: Classifier::from_shared(Arc::new(config)),
            dry_run,
            record_runs: true,
            fingerprint,
        }
    }

    pub fn with_record_runs(mut self, record_runs: bool) -> Self {
        self.record_runs = record_runs;
        self
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub async fn load(&self) -> Result<(LoadedEntities, TaxonomySnapshot)> {
        let loaded = load_entities(&self.store, &self.tables).await?;
        let taxonomy = load_taxonomy_snapshot(&self.store, &self.tables).await?;
        Ok((loaded, taxonomy))
    }

    /// Reconciles one field over an already loaded snapshot, then reports and records it.
    pub async fn execute(
        &self,
        job: JobKind,
        loaded: &LoadedEntities,
        taxonomy: &TaxonomySnapshot,
        multi_progress: Option<&MultiProgress>,
    ) -> Result<RunReport> {
        let reconciler = reconciler_for(job, self.classifier.clone())
            .ok_or_else(|| anyhow!("{} is not a reconciliation job", job))?;
        let options = ReconcileOptions {
            dry_run: self.dry_run,
            run_id: Some(Uuid::new_v4().to_string()),
        };

        let report = reconcile(
            &self.store,
            &self.tables.agents,
            loaded,
            reconciler.as_ref(),
            taxonomy,
            &options,
            multi_progress,
        )
        .await;

        JobLogger::new(job).log_report_details(&report);
        let line = report
            .to_json_line()
            .with_context(|| format!("Failed to serialize {} report", job))?;
        println!("{}", line);

        if self.record_runs {
            try_record_taxonomy_run(
                &self.store,
                &self.tables.runs,
                &report.run_id,
                job,
                &report.summary,
                &self.fingerprint,
            )
            .await;
        }
        Ok(report)
    }

    /// Fresh snapshot plus one job, as the single-job binaries run it.
    pub async fn run_job(
        &self,
        job: JobKind,
        multi_progress: Option<&MultiProgress>,
    ) -> Result<RunReport> {
        let logger = JobLogger::new(job);
        logger.log_phase("Loading snapshot", Some(&self.tables.agents));
        let (loaded, taxonomy) = self.load().await?;
        self.execute(job, &loaded, &taxonomy, multi_progress).await
    }

    /// Logs and prints the duplicate scan. Returns true when exact-name collisions exist.
    /// Unreadable rows take part by their stored name and display name.
    pub fn scan_duplicates(&self, loaded: &LoadedEntities) -> Result<bool> {
        let run_id = Uuid::new_v4().to_string();
        let logger = JobLogger::new(JobKind::Duplicates);
        logger.log_start(&run_id, self.dry_run);
        logger.log_data_loaded(loaded.len(), "agent");

        let candidates = loaded.duplicate_candidates();
        let report = find_duplicates(&candidates);
        log_duplicate_report(&report);
        let line = serde_json::to_string(&json!({
            "run_id": run_id,
            "job": JobKind::Duplicates,
            "total_processed": loaded.len(),
            "unreadable_count": loaded.unreadable.len(),
            "duplicates": report,
        }))
        .context("Failed to serialize duplicate report")?;
        println!("{}", line);

        if report.is_empty() {
            info!("No duplicate agents found");
        }
        Ok(report.has_hard_duplicates())
    }

    pub async fn run_duplicates(&self) -> Result<bool> {
        let loaded = load_entities(&self.store, &self.tables).await?;
        self.scan_duplicates(&loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use serde_json::Value;

    const MW_ID: &str = "0c9d7e2a-1b3f-4a5c-8e6d-7f0a1b2c3d44";

    async fn context(rows: Vec<Value>) -> JobContext<InMemoryStore> {
        let store = InMemoryStore::new();
        store.seed("agents", rows).await;
        store
            .seed(
                "business_functions",
                vec![json!({"id": MW_ID, "name": "Medical Writing"})],
            )
            .await;
        JobContext::new(store, TableConfig::default(), TaxonomyConfig::default(), false)
    }

    #[tokio::test]
    async fn test_run_job_records_audit_row() {
        let ctx = context(vec![json!({"id": "a1", "name": "Narrative Writer"})]).await;

        let report = ctx.run_job(JobKind::Tier, None).await.unwrap();

        assert_eq!(report.summary.success_count, 1);
        let runs = ctx.store.rows("taxonomy_runs").await;
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0]["id"], json!(report.run_id));
        assert_eq!(runs[0]["job"], json!("tier"));
        assert_eq!(runs[0]["taxonomy_fingerprint"], json!(ctx.fingerprint()));
    }

    #[tokio::test]
    async fn test_run_job_without_audit_row() {
        let ctx = context(vec![json!({
            "id": "a1",
            "name": "clinical-pharmacist",
            "business_function": "clinical_pharmacy"
        })])
        .await
        .with_record_runs(false);

        let report = ctx.run_job(JobKind::BusinessFunction, None).await.unwrap();

        assert_eq!(report.summary.success_count, 1);
        assert!(ctx.store.rows("taxonomy_runs").await.is_empty());
        let row = ctx.store.row_by_id("agents", "a1").await.unwrap();
        assert_eq!(row["business_function"], json!(MW_ID));
    }

    #[tokio::test]
    async fn test_duplicates_is_not_a_reconciliation_job() {
        let ctx = context(vec![]).await;
        let (loaded, taxonomy) = ctx.load().await.unwrap();
        assert!(ctx
            .execute(JobKind::Duplicates, &loaded, &taxonomy, None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_run_duplicates_flags_exact_name_collisions() {
        let clean = context(vec![
            json!({"id": "1", "name": "Foo Bot"}),
            json!({"id": "2", "name": "foo-bot"}),
        ])
        .await;
        assert!(!clean.run_duplicates().await.unwrap());

        let hard = context(vec![
            json!({"id": "1", "name": "Foo Bot"}),
            json!({"id": "2", "name": "Foo Bot"}),
        ])
        .await;
        assert!(hard.run_duplicates().await.unwrap());
    }

    #[tokio::test]
    async fn test_unreadable_rows_still_count_as_duplicates() {
        let ctx = context(vec![
            json!({"id": "1", "name": "Foo Bot", "status": "active"}),
            json!({"id": "2", "name": "Foo Bot", "status": "archived"}),
        ])
        .await;
        assert!(ctx.run_duplicates().await.unwrap());
    }
}
