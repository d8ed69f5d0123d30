// src/reconcile/driver.rs - Sequential best-effort reconciliation over an entity snapshot
use indicatif::MultiProgress;
use serde_json::Value;
use uuid::Uuid;

use crate::error::TaxonomyError;
use crate::models::core::{Entity, LoadedEntities, Record, UnreadableRow};
use crate::models::stats_models::{
    ReconciliationResult, ResultStatus, RunReport, RunSummary, SkipReason,
};
use crate::models::taxonomy::TaxonomySnapshot;
use crate::reconcile::jobs::{Decision, FieldReconciler};
use crate::store::EntityStore;
use crate::utils::progress_bars::logging::JobLogger;
use crate::utils::progress_bars::progress_config::entity_progress_bar;

#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// Compute and report changes without calling `update`.
    pub dry_run: bool,
    /// Run id to report under; a fresh v4 uuid when absent.
    pub run_id: Option<String>,
}

/// Walks the loaded agents one at a time, writing at most one field update per entity.
///
/// Nothing here aborts the batch: a mapping miss becomes a needs-review skip and a
/// failed write becomes an error result carrying the store's message. Rows that did not
/// parse are reported as errors too. Entities whose stored value is already canonical are
/// skipped before any classification, which makes a second run over reconciled data a
/// no-op.
pub async fn reconcile<S, R>(
    store: &S,
    table: &str,
    loaded: &LoadedEntities,
    reconciler: &R,
    taxonomy: &TaxonomySnapshot,
    options: &ReconcileOptions,
    multi_progress: Option<&MultiProgress>,
) -> RunReport
where
    S: EntityStore,
    R: FieldReconciler + ?Sized,
{
    let run_id = options
        .run_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let job = reconciler.job();
    let logger = JobLogger::new(job);
    logger.log_start(&run_id, options.dry_run);
    logger.log_data_loaded(loaded.len(), "agent");

    let progress = multi_progress.map(|mp| {
        entity_progress_bar(
            mp,
            loaded.len() as u64,
            &format!("Reconciling {}", reconciler.field()),
        )
    });

    let mut results = Vec::with_capacity(loaded.len());
    for entity in &loaded.entities {
        let result =
            reconcile_entity(store, table, entity, reconciler, taxonomy, options.dry_run).await;
        logger.log_outcome(&result);
        results.push(result);
        if let Some(pb) = &progress {
            pb.inc(1);
        }
    }
    for row in &loaded.unreadable {
        let result = unreadable_result(row, reconciler.field());
        logger.log_outcome(&result);
        results.push(result);
        if let Some(pb) = &progress {
            pb.inc(1);
        }
    }

    let summary = RunSummary::from_results(&results, options.dry_run);
    if let Some(pb) = &progress {
        pb.finish_with_message(format!(
            "{}: {} applied, {} skipped, {} errors",
            reconciler.field(),
            summary.success_count,
            summary.skipped_count,
            summary.error_count
        ));
    }
    logger.log_completion(&summary);

    RunReport {
        run_id,
        job,
        summary,
        results,
    }
}

fn unreadable_result(row: &UnreadableRow, field: &str) -> ReconciliationResult {
    ReconciliationResult {
        entity_id: row.id(),
        entity_label: row.label(),
        field: field.to_string(),
        previous_value: row.record.get(field).cloned().unwrap_or(Value::Null),
        new_value: None,
        status: ResultStatus::Error,
        skip_reason: None,
        error_detail: Some(row.reason.clone()),
    }
}

async fn reconcile_entity<S, R>(
    store: &S,
    table: &str,
    entity: &Entity,
    reconciler: &R,
    taxonomy: &TaxonomySnapshot,
    dry_run: bool,
) -> ReconciliationResult
where
    S: EntityStore,
    R: FieldReconciler + ?Sized,
{
    let previous_value = reconciler.current_value(entity);
    let mut result = ReconciliationResult {
        entity_id: entity.id.clone(),
        entity_label: entity.label().to_string(),
        field: reconciler.field().to_string(),
        previous_value: previous_value.clone(),
        new_value: None,
        status: ResultStatus::Skipped,
        skip_reason: None,
        error_detail: None,
    };

    let new_value = match reconciler.decide(entity, taxonomy) {
        Decision::AlreadyCanonical => {
            result.skip_reason = Some(SkipReason::AlreadyCanonical);
            return result;
        }
        Decision::NeedsReview(detail) => {
            result.skip_reason = Some(SkipReason::NeedsReview);
            result.error_detail = Some(detail);
            return result;
        }
        Decision::NotApplicable(detail) => {
            result.skip_reason = Some(SkipReason::NotApplicable);
            result.error_detail = Some(detail);
            return result;
        }
        Decision::Update(value) => value,
    };

    result.new_value = Some(new_value.clone());
    if new_value == previous_value {
        result.skip_reason = Some(SkipReason::Unchanged);
        return result;
    }
    if dry_run {
        result.status = ResultStatus::Applied;
        return result;
    }

    let mut fields = Record::new();
    fields.insert(reconciler.field().to_string(), new_value);
    match store.update(table, &entity.id, &fields).await {
        Ok(()) => result.status = ResultStatus::Applied,
        Err(e) => {
            result.status = ResultStatus::Error;
            result.error_detail = Some(
                TaxonomyError::StoreWrite {
                    table: table.to_string(),
                    entity_id: entity.id.clone(),
                    message: format!("{:#}", e),
                }
                .to_string(),
            );
        }
    }
    result
}

/// Folds applied values back into an in-memory snapshot so a following job in the same
/// process sees them without re-reading the store.
pub fn apply_report(entities: &mut [Entity], report: &RunReport) {
    for result in report.results.iter().filter(|r| r.status == ResultStatus::Applied) {
        let Some(entity) = entities.iter_mut().find(|e| e.id == result.entity_id) else {
            continue;
        };
        let Some(value) = &result.new_value else {
            continue;
        };
        match result.field.as_str() {
            "business_function" => {
                entity.business_function = value.as_str().map(str::to_string)
            }
            "department" => entity.department = value.as_str().map(str::to_string),
            "tier" => entity.tier = value.as_i64(),
            "tools" => {
                if let Value::Array(items) = value {
                    entity.tools = items
                        .iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect();
                }
            }
            _ => {}
        }
    }
}
