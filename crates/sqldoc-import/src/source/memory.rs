//! In-memory relational source for tests and dry runs.

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::source::{RelationalSource, RowBatch, TableSchema};
use crate::value::SqlValue;

/// A fully in-memory relational source.
///
/// Tables are served in insertion order; rows in the order given. A table
/// can be marked as failing to exercise mid-stream read-error handling.
#[derive(Debug, Default)]
pub struct MemorySource {
    tables: Vec<String>,
    schemas: BTreeMap<String, TableSchema>,
    rows: BTreeMap<String, Vec<Vec<SqlValue>>>,
    failing: Option<String>,
}

impl MemorySource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table with its rows.
    #[must_use]
    pub fn with_table(mut self, schema: TableSchema, rows: Vec<Vec<SqlValue>>) -> Self {
        self.tables.push(schema.name.clone());
        self.rows.insert(schema.name.clone(), rows);
        self.schemas.insert(schema.name.clone(), schema);
        self
    }

    /// Marks a table whose row fetches fail with an extraction error.
    #[must_use]
    pub fn with_failing_table(mut self, table: &str) -> Self {
        self.failing = Some(table.to_string());
        self
    }
}

#[async_trait]
impl RelationalSource for MemorySource {
    fn source_type(&self) -> &'static str {
        "memory"
    }

    async fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.tables.clone())
    }

    async fn table_schema(&self, table: &str) -> Result<TableSchema> {
        self.schemas
            .get(table)
            .cloned()
            .ok_or_else(|| Error::Extraction(format!("unknown table '{table}'")))
    }

    async fn fetch_batch(
        &self,
        table: &str,
        offset: Option<u64>,
        batch_size: usize,
    ) -> Result<RowBatch> {
        if self.failing.as_deref() == Some(table) {
            return Err(Error::Extraction(format!(
                "simulated read failure on '{table}'"
            )));
        }
        let rows = self
            .rows
            .get(table)
            .ok_or_else(|| Error::Extraction(format!("unknown table '{table}'")))?;

        let start = offset.unwrap_or(0) as usize;
        let end = (start + batch_size).min(rows.len());
        let has_more = end < rows.len();
        Ok(RowBatch {
            rows: rows[start..end].to_vec(),
            next_offset: has_more.then(|| end as u64),
            has_more,
        })
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
