// src/store/mod.rs - The three store primitives the engine depends on
pub mod memory;
pub mod postgres;

use anyhow::{Context, Result};
use log::{info, warn};
use serde_json::Value;
use std::env;

use crate::models::core::{LoadedEntities, Record};
use crate::models::taxonomy::TaxonomySnapshot;

pub use memory::InMemoryStore;
pub use postgres::PgEntityStore;

/// Equality filters plus optional column projection. A `Value::Null` filter means IS NULL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub columns: Option<Vec<String>>,
    pub filters: Vec<(String, Value)>,
}

impl Query {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push((column.to_string(), value.into()));
        self
    }
}

/// Relational store collaborator. Implementations are awaited one call at a time.
#[allow(async_fn_in_trait)]
pub trait EntityStore {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Record>>;
    async fn update(&self, table: &str, id: &str, fields: &Record) -> Result<()>;
    async fn insert(&self, table: &str, rows: &[Record]) -> Result<u64>;
}

/// Table names, overridable through the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct TableConfig {
    pub agents: String,
    pub business_functions: String,
    pub departments: String,
    pub runs: String,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            agents: "agents".to_string(),
            business_functions: "business_functions".to_string(),
            departments: "departments".to_string(),
            runs: "taxonomy_runs".to_string(),
        }
    }
}

impl TableConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var = |key: &str, default: String| {
            env::var(key)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };
        Self {
            agents: var("AGENTS_TABLE", defaults.agents),
            business_functions: var("BUSINESS_FUNCTIONS_TABLE", defaults.business_functions),
            departments: var("DEPARTMENTS_TABLE", defaults.departments),
            runs: var("TAXONOMY_RUNS_TABLE", defaults.runs),
        }
    }
}

pub const ENTITY_COLUMNS: [&str; 10] = [
    "id",
    "name",
    "display_name",
    "description",
    "business_function",
    "department",
    "role",
    "tier",
    "tools",
    "status",
];

/// Snapshot of every agent. Rows that do not parse are kept aside and logged, so jobs
/// can report them as errors and the duplicate scan still sees their names.
pub async fn load_entities<S: EntityStore>(
    store: &S,
    tables: &TableConfig,
) -> Result<LoadedEntities> {
    let rows = store
        .select(&tables.agents, &Query::all().columns(&ENTITY_COLUMNS))
        .await
        .with_context(|| format!("Failed to load entities from {}", tables.agents))?;

    let loaded = LoadedEntities::from_records(&rows);
    for row in &loaded.unreadable {
        warn!("Unreadable agent row {}: {}", row.id(), row.reason);
    }
    info!(
        "Loaded {} agents from {} ({} unreadable rows)",
        loaded.entities.len(),
        tables.agents,
        loaded.unreadable.len()
    );
    Ok(loaded)
}

pub async fn load_taxonomy_snapshot<S: EntityStore>(
    store: &S,
    tables: &TableConfig,
) -> Result<TaxonomySnapshot> {
    let functions = store
        .select(&tables.business_functions, &Query::all().columns(&["id", "name"]))
        .await
        .with_context(|| format!("Failed to load {}", tables.business_functions))?;
    let departments = store
        .select(
            &tables.departments,
            &Query::all().columns(&["id", "name", "business_function_id"]),
        )
        .await
        .with_context(|| format!("Failed to load {}", tables.departments))?;

    let snapshot = TaxonomySnapshot::from_records(&functions, &departments)
        .context("Failed to parse taxonomy tables")?;
    info!(
        "Taxonomy snapshot: {} business functions, {} departments",
        snapshot.business_functions.len(),
        snapshot.departments.len()
    );
    Ok(snapshot)
}

/// Renders a JSON scalar the way a text comparison against a column would see it.
pub(crate) fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_builder() {
        let q = Query::all()
            .columns(&["id", "name"])
            .eq("status", "active")
            .eq("tier", Value::Null);
        assert_eq!(q.columns, Some(vec!["id".to_string(), "name".to_string()]));
        assert_eq!(q.filters.len(), 2);
        assert_eq!(q.filters[1].1, Value::Null);
    }

    #[test]
    fn test_value_as_text() {
        assert_eq!(value_as_text(&json!("abc")), Some("abc".to_string()));
        assert_eq!(value_as_text(&json!(4)), Some("4".to_string()));
        assert_eq!(value_as_text(&json!(true)), Some("true".to_string()));
        assert_eq!(value_as_text(&Value::Null), None);
    }

    #[tokio::test]
    async fn test_load_entities_keeps_malformed_rows_aside() {
        let store = InMemoryStore::new();
        store
            .seed(
                "agents",
                vec![
                    json!({"id": "a1", "name": "ok-agent", "status": "active"}),
                    json!({"id": "a2", "status": "active"}),
                ],
            )
            .await;
        let loaded = load_entities(&store, &TableConfig::default()).await.unwrap();
        assert_eq!(loaded.entities.len(), 1);
        assert_eq!(loaded.entities[0].name, "ok-agent");
        assert_eq!(loaded.unreadable.len(), 1);
        assert_eq!(loaded.unreadable[0].id(), "a2");
        assert_eq!(loaded.len(), 2);
    }
}
