// src/error.rs
use thiserror::Error;

/// Error taxonomy for classification and reconciliation.
///
/// `MappingMiss` and `StoreWrite` are per-entity and never escape the batch driver;
/// they are rendered into the entity's result record. `Configuration` aborts a run
/// before any entity is touched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaxonomyError {
    #[error("no mapping for {field} value '{raw}'{}", suggestion_suffix(.suggestion))]
    MappingMiss {
        field: &'static str,
        raw: String,
        suggestion: Option<String>,
    },

    #[error("update of {table}/{entity_id} failed: {message}")]
    StoreWrite {
        table: String,
        entity_id: String,
        message: String,
    },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("malformed record: {0}")]
    MalformedRecord(String),
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (closest known label: '{}')", s),
        None => String::new(),
    }
}

pub type TaxonomyResult<T> = std::result::Result<T, TaxonomyError>;
