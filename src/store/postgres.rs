// src/store/postgres.rs - EntityStore over a bb8 tokio-postgres pool
use anyhow::{bail, Context, Result};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeSet;
use tokio_postgres::types::ToSql;

use crate::error::{TaxonomyError, TaxonomyResult};
use crate::models::core::Record;
use crate::store::{value_as_text, EntityStore, Query};
use crate::utils::db_connect::PgPool;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z_][a-z0-9_]*(\.[a-z_][a-z0-9_]*)?$").expect("valid identifier regex")
});

/// Only plain lowercase (optionally schema-qualified) names reach SQL text.
pub fn quote_identifier(name: &str) -> TaxonomyResult<String> {
    if !IDENTIFIER.is_match(name) {
        return Err(TaxonomyError::InvalidIdentifier(name.to_string()));
    }
    Ok(name
        .split('.')
        .map(|part| format!("\"{}\"", part))
        .collect::<Vec<_>>()
        .join("."))
}

/// Returns the SQL text and the text parameters for its placeholders.
pub fn build_select_sql(table: &str, query: &Query) -> TaxonomyResult<(String, Vec<String>)> {
    let table = quote_identifier(table)?;
    let projection = match &query.columns {
        Some(columns) if !columns.is_empty() => columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<TaxonomyResult<Vec<_>>>()?
            .join(", "),
        _ => "*".to_string(),
    };

    let mut conditions = Vec::with_capacity(query.filters.len());
    let mut params = Vec::new();
    for (column, value) in &query.filters {
        let column = quote_identifier(column)?;
        match value_as_text(value) {
            Some(text) => {
                params.push(text);
                conditions.push(format!("{}::text = ${}", column, params.len()));
            }
            None => conditions.push(format!("{} IS NULL", column)),
        }
    }
    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    Ok((
        format!(
            "SELECT to_jsonb(t) AS row FROM (SELECT {} FROM {}{}) t",
            projection, table, where_clause
        ),
        params,
    ))
}

/// `$1` is the jsonb patch, `$2` the row id as text. Column types come from the table's
/// row type through `jsonb_populate_record`.
pub fn build_update_sql<'a>(
    table: &str,
    columns: impl IntoIterator<Item = &'a String>,
) -> TaxonomyResult<String> {
    let table = quote_identifier(table)?;
    let assignments = columns
        .into_iter()
        .map(|c| quote_identifier(c).map(|q| format!("{q} = r.{q}")))
        .collect::<TaxonomyResult<Vec<_>>>()?;
    if assignments.is_empty() {
        return Err(TaxonomyError::MalformedRecord("update without columns".to_string()));
    }
    Ok(format!(
        "UPDATE {table} AS t SET {} FROM jsonb_populate_record(NULL::{table}, $1) AS r \
         WHERE t.\"id\"::text = $2",
        assignments.join(", ")
    ))
}

/// `$1` is a jsonb array of row objects.
pub fn build_insert_sql<'a>(
    table: &str,
    columns: impl IntoIterator<Item = &'a String>,
) -> TaxonomyResult<String> {
    let table = quote_identifier(table)?;
    let columns = columns
        .into_iter()
        .map(|c| quote_identifier(c))
        .collect::<TaxonomyResult<Vec<_>>>()?;
    if columns.is_empty() {
        return Err(TaxonomyError::MalformedRecord("insert without columns".to_string()));
    }
    let list = columns.join(", ");
    Ok(format!(
        "INSERT INTO {table} ({list}) SELECT {list} \
         FROM jsonb_populate_recordset(NULL::{table}, $1)"
    ))
}

#[derive(Clone)]
pub struct PgEntityStore {
    pool: PgPool,
}

impl PgEntityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl EntityStore for PgEntityStore {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Record>> {
        let (sql, params) = build_select_sql(table, query)?;
        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for select")?;
        let param_refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        debug!("select: {}", sql);
        let rows = conn
            .query(sql.as_str(), &param_refs)
            .await
            .with_context(|| format!("Failed to select from {}", table))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            match row.get::<_, Value>("row") {
                Value::Object(record) => records.push(record),
                other => warn!("Ignoring non-object row from {}: {}", table, other),
            }
        }
        Ok(records)
    }

    async fn update(&self, table: &str, id: &str, fields: &Record) -> Result<()> {
        let sql = build_update_sql(table, fields.keys())?;
        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for update")?;
        let patch = Value::Object(fields.clone());

        let rows_affected = conn
            .execute(sql.as_str(), &[&patch, &id])
            .await
            .with_context(|| format!("Failed to update {} row {}", table, id))?;

        match rows_affected {
            1 => {
                debug!("Updated {} row {}", table, id);
                Ok(())
            }
            0 => bail!("no row with id {} in {}", id, table),
            n => {
                warn!("Expected 1 row to be affected in {} for id {}, but {} were", table, id, n);
                Ok(())
            }
        }
    }

    async fn insert(&self, table: &str, rows: &[Record]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let columns: BTreeSet<&String> = rows.iter().flat_map(|r| r.keys()).collect();
        let sql = build_insert_sql(table, columns.into_iter())?;
        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for insert")?;
        let payload = Value::Array(rows.iter().cloned().map(Value::Object).collect());

        let inserted = conn
            .execute(sql.as_str(), &[&payload])
            .await
            .with_context(|| format!("Failed to insert {} rows into {}", rows.len(), table))?;
        debug!("Inserted {} rows into {}", inserted, table);
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("agents").unwrap(), "\"agents\"");
        assert_eq!(quote_identifier("public.agents").unwrap(), "\"public\".\"agents\"");
        assert!(quote_identifier("agents; drop table x").is_err());
        assert!(quote_identifier("Agents").is_err());
        assert!(quote_identifier("").is_err());
    }

    #[test]
    fn test_build_select_sql() {
        let query = Query::all()
            .columns(&["id", "name"])
            .eq("status", "active")
            .eq("tier", 5)
            .eq("department", Value::Null);
        let (sql, params) = build_select_sql("public.agents", &query).unwrap();
        assert_eq!(
            sql,
            "SELECT to_jsonb(t) AS row FROM (SELECT \"id\", \"name\" FROM \"public\".\"agents\" \
             WHERE \"status\"::text = $1 AND \"tier\"::text = $2 AND \"department\" IS NULL) t"
        );
        assert_eq!(params, vec!["active".to_string(), "5".to_string()]);

        let (sql, params) = build_select_sql("agents", &Query::all()).unwrap();
        assert_eq!(sql, "SELECT to_jsonb(t) AS row FROM (SELECT * FROM \"agents\") t");
        assert!(params.is_empty());
    }

    #[test]
    fn test_build_update_sql() {
        let fields = json!({"tier": 4, "tools": ["a"]}).as_object().cloned().unwrap();
        let sql = build_update_sql("agents", fields.keys()).unwrap();
        assert_eq!(
            sql,
            "UPDATE \"agents\" AS t SET \"tier\" = r.\"tier\", \"tools\" = r.\"tools\" \
             FROM jsonb_populate_record(NULL::\"agents\", $1) AS r WHERE t.\"id\"::text = $2"
        );
        assert!(build_update_sql("agents", Record::new().keys()).is_err());
    }

    #[test]
    fn test_build_insert_sql() {
        let columns = vec!["id".to_string(), "job".to_string()];
        let sql = build_insert_sql("taxonomy_runs", columns.iter()).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO \"taxonomy_runs\" (\"id\", \"job\") SELECT \"id\", \"job\" \
             FROM jsonb_populate_recordset(NULL::\"taxonomy_runs\", $1)"
        );
    }
}
