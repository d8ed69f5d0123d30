// src/store/memory.rs - In-process store for tests and offline planning
use anyhow::{anyhow, bail, Result};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

use crate::models::core::Record;
use crate::store::{value_as_text, EntityStore, Query};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<HashMap<String, Vec<Record>>>,
    failing_update_ids: HashSet<String>,
    update_calls: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates for these ids fail with a simulated store error.
    pub fn fail_updates_for(mut self, ids: &[&str]) -> Self {
        self.failing_update_ids = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub async fn seed(&self, table: &str, rows: Vec<Value>) {
        let mut tables = self.tables.lock().await;
        let target = tables.entry(table.to_string()).or_default();
        for row in rows {
            if let Value::Object(record) = row {
                target.push(record);
            }
        }
    }

    pub async fn rows(&self, table: &str) -> Vec<Record> {
        self.tables.lock().await.get(table).cloned().unwrap_or_default()
    }

    pub async fn row_by_id(&self, table: &str, id: &str) -> Option<Record> {
        self.tables
            .lock()
            .await
            .get(table)
            .and_then(|rows| rows.iter().find(|r| row_has_id(r, id)).cloned())
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }
}

fn row_has_id(row: &Record, id: &str) -> bool {
    row.get("id").and_then(value_as_text).as_deref() == Some(id)
}

fn row_matches(row: &Record, filters: &[(String, Value)]) -> bool {
    filters.iter().all(|(column, expected)| {
        let actual = row.get(column).unwrap_or(&Value::Null);
        match expected {
            Value::Null => actual.is_null(),
            _ => value_as_text(actual) == value_as_text(expected),
        }
    })
}

impl EntityStore for InMemoryStore {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Record>> {
        let tables = self.tables.lock().await;
        let rows = tables.get(table).map(Vec::as_slice).unwrap_or_default();
        Ok(rows
            .iter()
            .filter(|row| row_matches(row, &query.filters))
            .map(|row| match &query.columns {
                Some(columns) => columns
                    .iter()
                    .filter_map(|c| row.get(c).map(|v| (c.clone(), v.clone())))
                    .collect(),
                None => row.clone(),
            })
            .collect())
    }

    async fn update(&self, table: &str, id: &str, fields: &Record) -> Result<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_update_ids.contains(id) {
            bail!("simulated write failure for {}", id);
        }
        let mut tables = self.tables.lock().await;
        let row = tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|r| row_has_id(r, id)))
            .ok_or_else(|| anyhow!("no row with id {} in {}", id, table))?;
        for (column, value) in fields {
            row.insert(column.clone(), value.clone());
        }
        Ok(())
    }

    async fn insert(&self, table: &str, rows: &[Record]) -> Result<u64> {
        let mut tables = self.tables.lock().await;
        tables
            .entry(table.to_string())
            .or_default()
            .extend(rows.iter().cloned());
        Ok(rows.len() as u64)
    }
}
