//! Row-to-document transformation and per-table export.

use indicatif::ProgressBar;
use tracing::{debug, info, warn};

use crate::config::{FieldCase, ImportOptions};
use crate::error::Result;
use crate::keys::{KeyOutcome, KeyPolicy};
use crate::sink::DocumentWriter;
use crate::source::{RelationalSource, TableSchema};
use crate::value::{coerce, Document, SqlValue, Value};

/// Per-table export counts.
#[derive(Debug, Default, Clone)]
pub struct TableStats {
    /// Table the counts belong to.
    pub table: String,
    /// Rows read from the source cursor.
    pub rows_read: u64,
    /// Documents acknowledged by the writer.
    pub documents_written: u64,
    /// Rows skipped because their date field parsed with neither format.
    pub rows_skipped: u64,
    /// Documents the writer rejected.
    pub write_failures: u64,
}

impl TableStats {
    /// Rows that produced at least one document.
    #[must_use]
    pub fn rows_moved(&self) -> u64 {
        self.rows_read - self.rows_skipped
    }
}

/// Drives a single table's export: coerces rows into documents, attaches the
/// type tag, applies the key policy and hands finished documents to the
/// writer.
pub struct RowTransformer {
    type_field: Option<String>,
    field_case: FieldCase,
    key_policy: KeyPolicy,
    batch_size: usize,
}

impl RowTransformer {
    /// Builds a transformer from import options.
    #[must_use]
    pub fn new(options: &ImportOptions) -> Self {
        Self {
            type_field: options.type_field.clone(),
            field_case: options.field_case,
            key_policy: KeyPolicy::from_options(options),
            batch_size: options.batch_size,
        }
    }

    /// Builds the document for one row: every column coerced per its
    /// declared kind, field names case-folded, type tag attached.
    #[must_use]
    pub fn document_for_row(
        &self,
        schema: &TableSchema,
        row: &[SqlValue],
        type_name: &str,
    ) -> Document {
        let mut doc = Document::new();
        for (i, column) in schema.columns.iter().enumerate() {
            let raw = row.get(i).cloned().unwrap_or(SqlValue::Null);
            doc.insert(self.field_case.apply(&column.name), coerce(column.kind, raw));
        }
        if let Some(type_field) = &self.type_field {
            if !type_field.is_empty() {
                doc.insert(type_field.clone(), Value::Text(type_name.to_string()));
            }
        }
        doc
    }

    /// Streams a table's rows into the writer.
    ///
    /// Skipped rows (unparseable date field) and per-document write failures
    /// are counted, logged and non-fatal. A read error from the source aborts
    /// this table's export and is propagated for the orchestrator to report.
    ///
    /// # Errors
    ///
    /// Returns an error on metadata or mid-stream read failures, or when the
    /// configured id column is missing on a row.
    pub async fn export_table(
        &self,
        source: &dyn RelationalSource,
        writer: &dyn DocumentWriter,
        table: &str,
        progress: &ProgressBar,
    ) -> Result<TableStats> {
        let schema = source.table_schema(table).await?;
        let type_name = self.field_case.apply(table);
        let mut stats = TableStats {
            table: table.to_string(),
            ..Default::default()
        };

        let mut ordinal: u64 = 0;
        let mut offset: Option<u64> = None;
        loop {
            let batch = source.fetch_batch(table, offset, self.batch_size).await?;

            for row in &batch.rows {
                ordinal += 1;
                stats.rows_read += 1;

                let doc = self.document_for_row(&schema, row, &type_name);
                let base_id = self.key_policy.base_identifier(table, ordinal, &doc)?;

                match self.key_policy.expand(&base_id, doc) {
                    KeyOutcome::Skipped { raw } => {
                        stats.rows_skipped += 1;
                        warn!("Skipped row {} of '{}': unparseable date '{}'", ordinal, table, raw);
                    }
                    KeyOutcome::Documents(documents) => {
                        if self.key_policy.expands() {
                            debug!("Writing {} x{}", base_id, documents.len());
                        }
                        for (id, document) in documents {
                            match writer.put(&id, &document).await {
                                Ok(()) => stats.documents_written += 1,
                                Err(e) => {
                                    stats.write_failures += 1;
                                    warn!("Failed to write '{}': {}", id, e);
                                }
                            }
                        }
                    }
                }
                progress.inc(1);
            }

            if !batch.has_more {
                break;
            }
            offset = batch.next_offset;
        }

        info!(
            "    {} out of {} rows moved from table '{}'",
            stats.rows_moved(),
            stats.rows_read,
            table
        );
        Ok(stats)
    }
}

#[cfg(test)]
#[path = "transform_tests.rs"]
mod tests;
