//! In-memory document writer, backing dry runs and tests.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::sink::DocumentWriter;
use crate::value::Document;
use crate::views::ViewDefinition;

/// Collects documents and views in memory instead of writing them out.
///
/// Clones share storage, so a test can keep a handle while the pipeline
/// owns the writer.
#[derive(Debug, Default, Clone)]
pub struct MemoryWriter {
    documents: Arc<Mutex<BTreeMap<String, Document>>>,
    views: Arc<Mutex<Vec<ViewDefinition>>>,
}

impl MemoryWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the stored documents.
    #[must_use]
    pub fn documents(&self) -> BTreeMap<String, Document> {
        self.documents.lock().expect("writer lock").clone()
    }

    /// Snapshot of the persisted view definitions.
    #[must_use]
    pub fn views(&self) -> Vec<ViewDefinition> {
        self.views.lock().expect("writer lock").clone()
    }
}

#[async_trait]
impl DocumentWriter for MemoryWriter {
    fn writer_type(&self) -> &'static str {
        "memory"
    }

    async fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    async fn put(&self, id: &str, document: &Document) -> Result<()> {
        self.documents
            .lock()
            .expect("writer lock")
            .insert(id.to_string(), document.clone());
        Ok(())
    }

    async fn put_view(&self, view: &ViewDefinition) -> Result<()> {
        self.views.lock().expect("writer lock").push(view.clone());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
