pub mod core;
pub mod stats_models;
pub mod taxonomy;

pub use self::core::{Entity, EntityStatus, LoadedEntities, Record, TierLevel, UnreadableRow};
pub use self::stats_models::{
    AuditEntry, JobKind, ReconciliationResult, ResultStatus, RunReport, RunSummary, SkipReason,
};
pub use self::taxonomy::{BusinessFunction, BusinessFunctionCode, Department, TaxonomySnapshot};
