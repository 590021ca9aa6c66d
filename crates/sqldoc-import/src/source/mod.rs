//! Relational source collaborators.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::value::{ColumnKind, SqlValue};

/// A column as reported by relational metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name, as declared by the source.
    pub name: String,
    /// Declared relational kind.
    pub kind: ColumnKind,
}

/// A table's metadata: ordered columns plus the primary-key column list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<ColumnInfo>,
    /// Primary-key column names in key order. Empty when the table has none.
    pub primary_key: Vec<String>,
}

/// A batch of rows read from a table, with pagination info.
#[derive(Debug, Clone)]
pub struct RowBatch {
    /// Rows in cursor order; each row holds one raw value per column.
    pub rows: Vec<Vec<SqlValue>>,
    /// Offset of the next batch, if any.
    pub next_offset: Option<u64>,
    /// Whether more rows remain.
    pub has_more: bool,
}

/// Trait for relational sources.
///
/// Tables are read strictly sequentially and rows in cursor order; row order
/// is a pass-through property of the underlying engine.
#[async_trait]
pub trait RelationalSource: Send + Sync {
    /// Get the source type name.
    fn source_type(&self) -> &'static str;

    /// Connect to the source and validate configuration.
    async fn connect(&mut self) -> Result<()>;

    /// List every table visible via source metadata, in metadata order.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Read a table's column and primary-key metadata.
    async fn table_schema(&self, table: &str) -> Result<TableSchema>;

    /// Fetch a batch of rows starting at `offset` (0 when `None`).
    async fn fetch_batch(
        &self,
        table: &str,
        offset: Option<u64>,
        batch_size: usize,
    ) -> Result<RowBatch>;

    /// Close the connection and cleanup resources.
    async fn close(&mut self) -> Result<()>;
}

/// Create a relational source from configuration.
///
/// # Errors
///
/// Returns an error when the configured source type was compiled out.
pub fn create_source(
    config: &crate::config::SourceConfig,
) -> Result<Box<dyn RelationalSource>> {
    match config {
        #[cfg(feature = "postgres")]
        crate::config::SourceConfig::Postgres(cfg) => {
            Ok(Box::new(postgres::PostgresSource::new(cfg.clone())))
        }
        #[cfg(not(feature = "postgres"))]
        crate::config::SourceConfig::Postgres(_) => Err(crate::error::Error::Config(
            "built without postgres support; enable the 'postgres' feature".to_string(),
        )),
    }
}
