//! Import pipeline orchestration.

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::config::ImportConfig;
use crate::error::Result;
use crate::sink::DocumentWriter;
use crate::source::{create_source, RelationalSource};
use crate::transform::{RowTransformer, TableStats};
use crate::views;

/// Aggregate statistics for a whole run.
#[derive(Debug, Default, Clone)]
pub struct ImportStats {
    /// Tables whose export completed.
    pub tables_processed: u64,
    /// Tables whose export aborted on a read error.
    pub tables_failed: u64,
    /// Total rows read across tables.
    pub rows_read: u64,
    /// Total documents acknowledged by the writer.
    pub documents_written: u64,
    /// Rows skipped on unparseable date fields.
    pub rows_skipped: u64,
    /// Documents the writer rejected.
    pub write_failures: u64,
    /// View definitions persisted.
    pub views_created: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Per-table outcomes, in processing order.
    pub outcomes: Vec<TableOutcome>,
}

impl ImportStats {
    /// Calculate throughput (documents per second).
    #[must_use]
    pub fn throughput(&self) -> f64 {
        if self.duration_secs > 0.0 {
            self.documents_written as f64 / self.duration_secs
        } else {
            0.0
        }
    }

    fn absorb(&mut self, stats: &TableStats) {
        self.rows_read += stats.rows_read;
        self.documents_written += stats.documents_written;
        self.rows_skipped += stats.rows_skipped;
        self.write_failures += stats.write_failures;
    }
}

/// What happened to one table.
#[derive(Debug, Clone)]
pub struct TableOutcome {
    /// Table name.
    pub table: String,
    /// Export counts, when the export ran to completion.
    pub stats: Option<TableStats>,
    /// Error text, when the export aborted.
    pub error: Option<String>,
}

/// Import pipeline: sequences view synthesis and row streaming per table,
/// then emits the global by-type view once.
pub struct Pipeline {
    config: ImportConfig,
    source: Box<dyn RelationalSource>,
    writer: Box<dyn DocumentWriter>,
    transformer: RowTransformer,
}

impl Pipeline {
    /// Create a pipeline with injected collaborators.
    #[must_use]
    pub fn new(
        config: ImportConfig,
        source: Box<dyn RelationalSource>,
        writer: Box<dyn DocumentWriter>,
    ) -> Self {
        let transformer = RowTransformer::new(&config.options);
        Self {
            config,
            source,
            writer,
            transformer,
        }
    }

    /// Create a pipeline from configuration alone.
    ///
    /// Dry runs route documents to an in-memory writer instead of the
    /// configured destination.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be created.
    pub fn from_config(config: ImportConfig) -> Result<Self> {
        let source = create_source(&config.source)?;
        let writer: Box<dyn DocumentWriter> = if config.options.dry_run {
            info!("Dry run mode - not writing to destination");
            Box::new(crate::sink::memory::MemoryWriter::new())
        } else {
            Box::new(crate::sink::couch::CouchWriter::new(
                config.destination.clone(),
            ))
        };
        Ok(Self::new(config, source, writer))
    }

    /// Run the import.
    ///
    /// A failure on one table is recorded in its outcome and does not
    /// prevent subsequent tables from being attempted.
    ///
    /// # Errors
    ///
    /// Returns an error when configuration is invalid or either collaborator
    /// cannot be reached; per-table failures are not errors at this level.
    pub async fn run(&mut self) -> Result<ImportStats> {
        let start = std::time::Instant::now();
        let mut stats = ImportStats::default();

        self.config.validate()?;
        self.source.connect().await?;
        self.writer.connect().await?;

        let tables = match explicit_tables(self.config.options.tables.as_deref()) {
            Some(named) => named,
            None => self.source.list_tables().await?,
        };
        info!("Importing {} table(s)", tables.len());

        for table in &tables {
            info!("  Exporting table: {}", table);

            if self.config.options.create_views {
                match self.synthesize_table_view(table).await {
                    Ok(()) => stats.views_created += 1,
                    // Rows still move when the view cannot be created.
                    Err(e) => warn!("View for '{}' not created: {}", table, e),
                }
            }

            let progress = create_progress_bar(table);
            match self
                .transformer
                .export_table(self.source.as_ref(), self.writer.as_ref(), table, &progress)
                .await
            {
                Ok(table_stats) => {
                    progress.finish_and_clear();
                    stats.tables_processed += 1;
                    stats.absorb(&table_stats);
                    stats.outcomes.push(TableOutcome {
                        table: table.clone(),
                        stats: Some(table_stats),
                        error: None,
                    });
                }
                Err(e) => {
                    progress.finish_and_clear();
                    warn!("Export of '{}' aborted: {}", table, e);
                    stats.tables_failed += 1;
                    stats.outcomes.push(TableOutcome {
                        table: table.clone(),
                        stats: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        if self.config.options.create_views {
            info!("Creating global by-type view");
            match self.writer.put_view(&views::by_type()).await {
                Ok(()) => stats.views_created += 1,
                Err(e) => warn!("Global by-type view not created: {}", e),
            }
        }

        self.source.close().await?;
        self.writer.close().await?;

        stats.duration_secs = start.elapsed().as_secs_f64();
        info!(
            "Import complete: {} table(s), {} rows read, {} documents written, {} skipped, {} write failures in {:.2}s",
            stats.tables_processed,
            stats.rows_read,
            stats.documents_written,
            stats.rows_skipped,
            stats.write_failures,
            stats.duration_secs
        );
        Ok(stats)
    }

    /// Synthesize and persist the by-primary-key view for one table.
    async fn synthesize_table_view(&self, table: &str) -> Result<()> {
        let schema = self.source.table_schema(table).await?;
        let field_case = self.config.options.field_case;
        let type_name = field_case.apply(table);
        let pk_columns: Vec<String> = schema
            .primary_key
            .iter()
            .map(|c| field_case.apply(c))
            .collect();
        let view = views::by_primary_key(table, &type_name, &pk_columns);
        self.writer.put_view(&view).await
    }
}

/// Resolve the configured table list. `None` means discover every table.
///
/// Names are trimmed; a missing list, an empty list, or the single sentinel
/// `ALL` (case-insensitive) all mean "everything".
fn explicit_tables(configured: Option<&[String]>) -> Option<Vec<String>> {
    let configured = configured?;
    let trimmed: Vec<String> = configured
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    match trimmed.as_slice() {
        [] => None,
        [single] if single.eq_ignore_ascii_case("ALL") => None,
        _ => Some(trimmed),
    }
}

fn create_progress_bar(table: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} {pos} rows")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(table.to_string());
    pb
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
