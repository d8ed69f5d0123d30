// src/models/stats_models.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    BusinessFunction,
    Department,
    Tier,
    ToolKit,
    Duplicates,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::BusinessFunction => "business_function",
            JobKind::Department => "department",
            JobKind::Tier => "tier",
            JobKind::ToolKit => "toolkit",
            JobKind::Duplicates => "duplicates",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Applied,
    Skipped,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Stored value already has the canonical format.
    AlreadyCanonical,
    /// Computed value equals the stored one.
    Unchanged,
    /// No dictionary entry or rule matched; a human has to classify it.
    NeedsReview,
    /// Nothing applies to this entity (e.g. no tool kit rule matched).
    NotApplicable,
}

/// Per-entity outcome of one reconciliation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub entity_id: String,
    pub entity_label: String,
    pub field: String,
    pub previous_value: Value,
    pub new_value: Option<Value>,
    pub status: ResultStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub success_count: usize,
    pub skipped_count: usize,
    pub error_count: usize,
    pub total_processed: usize,
    /// Subset of `skipped_count` that needs manual classification.
    pub needs_review_count: usize,
    pub dry_run: bool,
}

impl RunSummary {
    pub fn record(&mut self, result: &ReconciliationResult) {
        self.total_processed += 1;
        match result.status {
            ResultStatus::Applied => self.success_count += 1,
            ResultStatus::Skipped => {
                self.skipped_count += 1;
                if result.skip_reason == Some(SkipReason::NeedsReview) {
                    self.needs_review_count += 1;
                }
            }
            ResultStatus::Error => self.error_count += 1,
        }
    }

    pub fn from_results(results: &[ReconciliationResult], dry_run: bool) -> Self {
        let mut summary = RunSummary {
            dry_run,
            ..Default::default()
        };
        for result in results {
            summary.record(result);
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub entity_label: String,
    pub from_value: Value,
    pub to_value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub job: JobKind,
    pub summary: RunSummary,
    pub results: Vec<ReconciliationResult>,
}

impl RunReport {
    /// `{entity_label, from, to}` tuples for every applied change.
    pub fn audit_trail(&self) -> Vec<AuditEntry> {
        self.results
            .iter()
            .filter(|r| r.status == ResultStatus::Applied)
            .filter_map(|r| {
                r.new_value.as_ref().map(|to| AuditEntry {
                    entity_label: r.entity_label.clone(),
                    from_value: r.previous_value.clone(),
                    to_value: to.clone(),
                })
            })
            .collect()
    }

    pub fn needs_review(&self) -> impl Iterator<Item = &ReconciliationResult> {
        self.results
            .iter()
            .filter(|r| r.skip_reason == Some(SkipReason::NeedsReview))
    }

    /// Compact single-line JSON: summary plus audit trail, without per-entity skips.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(&serde_json::json!({
            "run_id": self.run_id,
            "job": self.job,
            "summary": self.summary,
            "audit": self.audit_trail(),
        }))
    }
}
