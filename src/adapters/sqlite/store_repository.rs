//! Generic SQLite-backed `Store<T>`: a JSON blob column plus a handful of
//! indexed filter columns, mirroring the shape of every table in
//! `migrations/001_initial_schema.sql`.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

use crate::domain::errors::{GraphiumError, GraphiumResult};
use crate::domain::ports::{ListFilter, Store};

/// Describes how to project a value onto this table's indexed filter
/// columns, keeping the JSON blob as the source of truth for everything else.
pub struct TableSchema {
    pub table: &'static str,
    pub id_column: &'static str,
    /// Additional indexed columns beyond id/revision/data, in column order.
    pub filter_columns: &'static [&'static str],
}

pub struct SqliteJsonStore<T> {
    pool: SqlitePool,
    schema: TableSchema,
    field_extractor: Box<dyn Fn(&T) -> HashMap<String, String> + Send + Sync>,
    _marker: std::marker::PhantomData<T>,
}

impl<T> SqliteJsonStore<T> {
    pub fn new(
        pool: SqlitePool,
        schema: TableSchema,
        field_extractor: impl Fn(&T) -> HashMap<String, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            pool,
            schema,
            field_extractor: Box::new(field_extractor),
            _marker: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<T> Store<T> for SqliteJsonStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get(&self, id: &str) -> GraphiumResult<Option<T>> {
        let sql = format!("SELECT data FROM {} WHERE {} = ?", self.schema.table, self.schema.id_column);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => {
                let data: String = row.try_get("data").map_err(|e| GraphiumError::Database(e.to_string()))?;
                Ok(Some(serde_json::from_str(&data)?))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, id: &str, value: &T, expected_revision: Option<u64>) -> GraphiumResult<u64> {
        let existing_revision: Option<i64> = {
            let sql = format!("SELECT revision FROM {} WHERE {} = ?", self.schema.table, self.schema.id_column);
            sqlx::query(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .map(|row| row.try_get::<i64, _>("revision"))
                .transpose()
                .map_err(|e| GraphiumError::Database(e.to_string()))?
        };

        match (existing_revision, expected_revision) {
            (Some(existing), Some(expected)) if existing as u64 != expected => {
                return Err(GraphiumError::Conflict {
                    entity: self.schema.table.to_string(),
                    id: id.to_string(),
                })
            }
            (Some(_), None) => {
                return Err(GraphiumError::Conflict {
                    entity: self.schema.table.to_string(),
                    id: id.to_string(),
                })
            }
            (None, Some(_)) => {
                return Err(GraphiumError::Conflict {
                    entity: self.schema.table.to_string(),
                    id: id.to_string(),
                })
            }
            _ => {}
        }

        let new_revision = existing_revision.map(|r| r + 1).unwrap_or(0);
        let data = serde_json::to_string(value)?;
        let fields = (self.field_extractor)(value);

        let mut columns = vec![self.schema.id_column.to_string(), "revision".to_string(), "data".to_string()];
        let mut placeholders = vec!["?", "?", "?"];
        for column in self.schema.filter_columns {
            columns.push((*column).to_string());
            placeholders.push("?");
        }

        let sql = format!(
            "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
            self.schema.table,
            columns.join(", "),
            placeholders.join(", ")
        );

        let mut query = sqlx::query(&sql).bind(id).bind(new_revision).bind(&data);
        for column in self.schema.filter_columns {
            let value = fields.get(*column).cloned().unwrap_or_default();
            query = query.bind(value);
        }
        query.execute(&self.pool).await?;

        Ok(new_revision as u64)
    }

    async fn delete(&self, id: &str) -> GraphiumResult<()> {
        let sql = format!("DELETE FROM {} WHERE {} = ?", self.schema.table, self.schema.id_column);
        sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(())
    }

    async fn list(&self, filter: &ListFilter) -> GraphiumResult<Vec<T>> {
        let mut sql = format!("SELECT data FROM {}", self.schema.table);
        let mut bindings = Vec::new();
        if !filter.equals.is_empty() {
            let clauses: Vec<String> = filter
                .equals
                .iter()
                .map(|(field, value)| {
                    bindings.push(value.clone());
                    format!("{field} = ?")
                })
                .collect();
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let mut query = sqlx::query(&sql);
        for binding in &bindings {
            query = query.bind(binding);
        }
        let rows = query.fetch_all(&self.pool).await?;

        rows.into_iter()
            .map(|row| {
                let data: String = row.try_get("data").map_err(|e| GraphiumError::Database(e.to_string()))?;
                Ok(serde_json::from_str(&data)?)
            })
            .collect()
    }
}
