// src/utils/progress_bars/logging.rs - Logging helpers for taxonomy jobs
use log::{debug, error, info, warn};
use std::time::Instant;

use crate::matching::duplicates::DuplicateReport;
use crate::models::stats_models::{
    JobKind, ReconciliationResult, ResultStatus, RunReport, RunSummary,
};

#[derive(Clone)]
pub struct JobLogger {
    job_name: &'static str,
    job_emoji: &'static str,
    start_time: Instant,
}

impl JobLogger {
    pub fn new(job: JobKind) -> Self {
        let (job_name, job_emoji) = match job {
            JobKind::BusinessFunction => ("BUSINESS_FUNCTION", "🏛️"),
            JobKind::Department => ("DEPARTMENT", "🏢"),
            JobKind::Tier => ("TIER", "🪜"),
            JobKind::ToolKit => ("TOOLKIT", "🧰"),
            JobKind::Duplicates => ("DUPLICATES", "👯"),
        };
        Self {
            job_name,
            job_emoji,
            start_time: Instant::now(),
        }
    }

    pub fn log_start(&self, run_id: &str, dry_run: bool) {
        info!(
            "[{}] {} 🚀 Starting {} reconciliation (run ID: {}){}",
            self.job_name,
            self.job_emoji,
            self.job_name.to_lowercase(),
            run_id,
            if dry_run { " in DRY RUN mode - no writes" } else { "" }
        );
    }

    pub fn log_phase(&self, phase: &str, details: Option<&str>) {
        let elapsed = self.start_time.elapsed();
        match details {
            Some(details) => info!(
                "[{}] {} 🔄 Phase: {} - {} [+{:.1}s]",
                self.job_name, self.job_emoji, phase, details, elapsed.as_secs_f32()
            ),
            None => info!(
                "[{}] {} 🔄 Phase: {} [+{:.1}s]",
                self.job_name, self.job_emoji, phase, elapsed.as_secs_f32()
            ),
        }
    }

    pub fn log_data_loaded(&self, count: usize, data_type: &str) {
        info!(
            "[{}] {} 📊 Found {} {} records",
            self.job_name, self.job_emoji, count, data_type
        );
    }

    pub fn log_outcome(&self, result: &ReconciliationResult) {
        match result.status {
            ResultStatus::Applied => debug!(
                "[{}] {} ✏️  {}: {} -> {}",
                self.job_name,
                self.job_emoji,
                result.entity_label,
                result.previous_value,
                result.new_value.as_ref().map(|v| v.to_string()).unwrap_or_default()
            ),
            ResultStatus::Skipped => debug!(
                "[{}] {} ⏭️  {}: skipped ({:?}){}",
                self.job_name,
                self.job_emoji,
                result.entity_label,
                result.skip_reason,
                result
                    .error_detail
                    .as_ref()
                    .map(|d| format!(" - {}", d))
                    .unwrap_or_default()
            ),
            ResultStatus::Error => warn!(
                "[{}] {} ❌ {}: {}",
                self.job_name,
                self.job_emoji,
                result.entity_label,
                result.error_detail.as_deref().unwrap_or("unknown error")
            ),
        }
    }

    pub fn log_completion(&self, summary: &RunSummary) {
        let duration = self.start_time.elapsed();
        info!(
            "[{}] {} 🎉 COMPLETED in {:.2?}: {} processed",
            self.job_name, self.job_emoji, duration, summary.total_processed
        );
        info!(
            "[{}] {} 📊 Results: ✅ {} {}, ⏭️  {} skipped ({} need review), ❌ {} errors",
            self.job_name,
            self.job_emoji,
            summary.success_count,
            if summary.dry_run { "planned" } else { "updated" },
            summary.skipped_count,
            summary.needs_review_count,
            summary.error_count
        );
        if summary.error_count > 0 {
            warn!(
                "[{}] {} ⚠️  {} entities could not be written; see errors above",
                self.job_name, self.job_emoji, summary.error_count
            );
        }
    }

    /// Audit trail and review queue, the parts an operator follows up on by hand.
    pub fn log_report_details(&self, report: &RunReport) {
        for entry in report.audit_trail() {
            info!(
                "[{}] {} 📝 {}: {} -> {}",
                self.job_name, self.job_emoji, entry.entity_label, entry.from_value, entry.to_value
            );
        }
        for result in report.needs_review() {
            warn!(
                "[{}] {} 🔍 Needs review: {} ({})",
                self.job_name,
                self.job_emoji,
                result.entity_label,
                result.error_detail.as_deref().unwrap_or("no rule matched")
            );
        }
    }
}

pub fn log_duplicate_report(report: &DuplicateReport<'_>) {
    let logger = JobLogger::new(JobKind::Duplicates);
    let (exact, exact_display, normalized, normalized_display) = report.group_counts();
    info!(
        "[{}] {} 📊 Groups: {} exact name, {} exact display name, {} normalized name, \
         {} normalized display name",
        logger.job_name, logger.job_emoji, exact, exact_display, normalized, normalized_display
    );

    for (key, members) in &report.exact_name {
        error!(
            "[{}] {} ❌ Exact name collision '{}': {}",
            logger.job_name,
            logger.job_emoji,
            key,
            members.iter().map(|e| e.id.as_str()).collect::<Vec<_>>().join(", ")
        );
    }
    let soft_groups = [
        ("exact display name", &report.exact_display_name),
        ("normalized name", &report.normalized_name),
        ("normalized display name", &report.normalized_display_name),
    ];
    for (kind, groups) in soft_groups {
        for (key, members) in groups {
            warn!(
                "[{}] {} ⚠️  {} '{}': {}",
                logger.job_name,
                logger.job_emoji,
                kind,
                key,
                members
                    .iter()
                    .map(|e| format!("{} ({})", e.name, e.id))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
}

pub fn log_pipeline_start(run_id: &str, jobs: &[JobKind], dry_run: bool) {
    info!("🚀 ===== AGENT TAXONOMY PIPELINE STARTING =====");
    info!("📅 Pipeline Run ID: {}", run_id);
    info!(
        "🎯 Jobs: {}",
        jobs.iter().map(|j| j.as_str()).collect::<Vec<_>>().join(" → ")
    );
    if dry_run {
        info!("🧪 Dry run: no entity will be written");
    }
    info!("==============================================");
}

pub fn log_pipeline_completion(run_id: &str, duration: std::time::Duration, reports: &[RunReport]) {
    info!("🎉 ===== AGENT TAXONOMY PIPELINE COMPLETED =====");
    info!("📅 Pipeline Run ID: {}", run_id);
    info!("⏱️  Total Duration: {:.2?}", duration);
    for report in reports {
        let s = &report.summary;
        info!(
            "  • {}: {} applied, {} skipped ({} need review), {} errors of {}",
            report.job,
            s.success_count,
            s.skipped_count,
            s.needs_review_count,
            s.error_count,
            s.total_processed
        );
    }
    info!("===============================================");
}
