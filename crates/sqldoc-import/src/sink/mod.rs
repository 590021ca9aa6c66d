//! Document-store writers.

pub mod couch;
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::value::Document;
use crate::views::ViewDefinition;

/// Trait for document-store writers.
///
/// Writes are synchronous per document: `put` resolves only once the store
/// has acknowledged the write.
#[async_trait]
pub trait DocumentWriter: Send + Sync {
    /// Get the writer type name.
    fn writer_type(&self) -> &'static str;

    /// Connect to the store and validate configuration.
    async fn connect(&mut self) -> Result<()>;

    /// Write one document under the given identifier.
    async fn put(&self, id: &str, document: &Document) -> Result<()>;

    /// Persist a view definition under its design document.
    async fn put_view(&self, view: &ViewDefinition) -> Result<()>;

    /// Close the connection and cleanup resources.
    async fn close(&mut self) -> Result<()>;
}
