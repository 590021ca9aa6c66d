//! `PostgreSQL` relational source backed by sqlx.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use crate::config::PostgresConfig;
use crate::error::{Error, Result};
use crate::source::{ColumnInfo, RelationalSource, RowBatch, TableSchema};
use crate::value::{ColumnKind, SqlValue};

/// `PostgreSQL` source. Metadata comes from `information_schema`; rows are
/// read with `SELECT *` in engine order, batched by offset.
pub struct PostgresSource {
    config: PostgresConfig,
    pool: Option<PgPool>,
}

impl PostgresSource {
    /// Creates a new Postgres source.
    #[must_use]
    pub fn new(config: PostgresConfig) -> Self {
        Self { config, pool: None }
    }

    fn pool(&self) -> Result<&PgPool> {
        self.pool
            .as_ref()
            .ok_or_else(|| Error::SourceConnection("not connected".to_string()))
    }

    fn kind_for(data_type: &str) -> ColumnKind {
        match data_type {
            "ARRAY" => ColumnKind::Array,
            "bigint" => ColumnKind::BigInt,
            "boolean" => ColumnKind::Boolean,
            "bytea" => ColumnKind::Blob,
            "double precision" => ColumnKind::Double,
            "real" => ColumnKind::Float,
            "integer" => ColumnKind::Integer,
            "smallint" => ColumnKind::SmallInt,
            "character varying" | "character" | "text" => ColumnKind::String,
            "date" => ColumnKind::Date,
            "timestamp without time zone" | "timestamp with time zone" => ColumnKind::Timestamp,
            _ => ColumnKind::Other,
        }
    }

    fn decode_cell(row: &PgRow, index: usize, kind: ColumnKind) -> SqlValue {
        match kind {
            ColumnKind::BigInt => Self::opt(row.try_get::<Option<i64>, _>(index), SqlValue::Int),
            ColumnKind::Integer => {
                Self::opt(row.try_get::<Option<i32>, _>(index), |v| SqlValue::Int(i64::from(v)))
            }
            ColumnKind::SmallInt | ColumnKind::TinyInt => {
                Self::opt(row.try_get::<Option<i16>, _>(index), |v| SqlValue::Int(i64::from(v)))
            }
            ColumnKind::Double => Self::opt(row.try_get::<Option<f64>, _>(index), SqlValue::Float),
            ColumnKind::Float => {
                Self::opt(row.try_get::<Option<f32>, _>(index), |v| SqlValue::Float(f64::from(v)))
            }
            ColumnKind::Boolean => Self::opt(row.try_get::<Option<bool>, _>(index), SqlValue::Bool),
            ColumnKind::Blob => Self::opt(row.try_get::<Option<Vec<u8>>, _>(index), SqlValue::Bytes),
            ColumnKind::String | ColumnKind::NString => {
                Self::opt(row.try_get::<Option<String>, _>(index), SqlValue::Text)
            }
            ColumnKind::Date => Self::opt(row.try_get::<Option<chrono::NaiveDate>, _>(index), |d| {
                SqlValue::Text(d.format("%Y-%m-%d").to_string())
            }),
            // Timestamps carry the textual form the key policy's fallback
            // format understands, e.g. "2016-03-15 19:04:29.0".
            ColumnKind::Timestamp => {
                if let Ok(Some(ts)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(index) {
                    SqlValue::Text(ts.format("%Y-%m-%d %H:%M:%S%.1f").to_string())
                } else if let Ok(Some(ts)) =
                    row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)
                {
                    SqlValue::Text(ts.naive_utc().format("%Y-%m-%d %H:%M:%S%.1f").to_string())
                } else {
                    SqlValue::Null
                }
            }
            ColumnKind::Array | ColumnKind::Other => Self::decode_other(row, index),
        }
    }

    fn opt<T>(
        decoded: std::result::Result<Option<T>, sqlx::Error>,
        wrap: impl FnOnce(T) -> SqlValue,
    ) -> SqlValue {
        match decoded {
            Ok(Some(v)) => wrap(v),
            _ => SqlValue::Null,
        }
    }

    fn decode_other(row: &PgRow, index: usize) -> SqlValue {
        if let Ok(Some(v)) = row.try_get::<Option<serde_json::Value>, _>(index) {
            SqlValue::Json(v)
        } else if let Ok(Some(s)) = row.try_get::<Option<String>, _>(index) {
            SqlValue::Text(s)
        } else if let Ok(Some(f)) = row.try_get::<Option<f64>, _>(index) {
            SqlValue::Float(f)
        } else if let Ok(Some(i)) = row.try_get::<Option<i64>, _>(index) {
            SqlValue::Int(i)
        } else if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(index) {
            SqlValue::Bool(b)
        } else {
            SqlValue::Null
        }
    }
}

#[async_trait]
impl RelationalSource for PostgresSource {
    fn source_type(&self) -> &'static str {
        "postgres"
    }

    async fn connect(&mut self) -> Result<()> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(&self.config.connection_string)
            .await
            .map_err(|e| Error::SourceConnection(e.to_string()))?;
        self.pool = Some(pool);
        Ok(())
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = $1 AND table_type = 'BASE TABLE' \
             ORDER BY table_name",
        )
        .bind(&self.config.schema)
        .fetch_all(self.pool()?)
        .await
        .map_err(|e| Error::Extraction(e.to_string()))?;

        Ok(rows.iter().map(|r| r.get::<String, _>(0)).collect())
    }

    async fn table_schema(&self, table: &str) -> Result<TableSchema> {
        let columns = sqlx::query(
            "SELECT column_name, data_type FROM information_schema.columns \
             WHERE table_schema = $1 AND table_name = $2 \
             ORDER BY ordinal_position",
        )
        .bind(&self.config.schema)
        .bind(table)
        .fetch_all(self.pool()?)
        .await
        .map_err(|e| Error::Extraction(e.to_string()))?;

        if columns.is_empty() {
            return Err(Error::Extraction(format!("unknown table '{table}'")));
        }

        let primary_key = sqlx::query(
            "SELECT kcu.column_name \
             FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage kcu \
               ON tc.constraint_name = kcu.constraint_name \
              AND tc.table_schema = kcu.table_schema \
             WHERE tc.constraint_type = 'PRIMARY KEY' \
               AND tc.table_schema = $1 AND tc.table_name = $2 \
             ORDER BY kcu.ordinal_position",
        )
        .bind(&self.config.schema)
        .bind(table)
        .fetch_all(self.pool()?)
        .await
        .map_err(|e| Error::Extraction(e.to_string()))?;

        Ok(TableSchema {
            name: table.to_string(),
            columns: columns
                .iter()
                .map(|r| ColumnInfo {
                    name: r.get::<String, _>(0),
                    kind: Self::kind_for(&r.get::<String, _>(1)),
                })
                .collect(),
            primary_key: primary_key.iter().map(|r| r.get::<String, _>(0)).collect(),
        })
    }

    async fn fetch_batch(
        &self,
        table: &str,
        offset: Option<u64>,
        batch_size: usize,
    ) -> Result<RowBatch> {
        let schema = self.table_schema(table).await?;
        let start = offset.unwrap_or(0);

        // Table names cannot be bound as parameters; quoted verbatim.
        let sql = format!(
            "SELECT * FROM \"{table}\" LIMIT {batch_size} OFFSET {start}"
        );
        let rows = sqlx::query(&sql)
            .fetch_all(self.pool()?)
            .await
            .map_err(|e| Error::Extraction(e.to_string()))?;

        let decoded: Vec<Vec<SqlValue>> = rows
            .iter()
            .map(|row| {
                (0..row.columns().len())
                    .map(|i| {
                        let kind = schema
                            .columns
                            .get(i)
                            .map_or(ColumnKind::Other, |c| c.kind);
                        Self::decode_cell(row, i, kind)
                    })
                    .collect()
            })
            .collect();

        let has_more = decoded.len() == batch_size;
        Ok(RowBatch {
            next_offset: has_more.then(|| start + decoded.len() as u64),
            rows: decoded,
            has_more,
        })
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(PostgresSource::kind_for("bigint"), ColumnKind::BigInt);
        assert_eq!(PostgresSource::kind_for("integer"), ColumnKind::Integer);
        assert_eq!(PostgresSource::kind_for("smallint"), ColumnKind::SmallInt);
        assert_eq!(PostgresSource::kind_for("boolean"), ColumnKind::Boolean);
        assert_eq!(PostgresSource::kind_for("bytea"), ColumnKind::Blob);
        assert_eq!(PostgresSource::kind_for("double precision"), ColumnKind::Double);
        assert_eq!(PostgresSource::kind_for("real"), ColumnKind::Float);
        assert_eq!(PostgresSource::kind_for("text"), ColumnKind::String);
        assert_eq!(PostgresSource::kind_for("character varying"), ColumnKind::String);
        assert_eq!(PostgresSource::kind_for("date"), ColumnKind::Date);
        assert_eq!(
            PostgresSource::kind_for("timestamp without time zone"),
            ColumnKind::Timestamp
        );
        assert_eq!(PostgresSource::kind_for("ARRAY"), ColumnKind::Array);
        // Anything unrecognized falls to the opaque kind.
        assert_eq!(PostgresSource::kind_for("numeric"), ColumnKind::Other);
        assert_eq!(PostgresSource::kind_for("uuid"), ColumnKind::Other);
    }
}
