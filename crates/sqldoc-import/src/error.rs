//! Error types for sqldoc-import.

use thiserror::Error;

/// Result type alias for import operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during an import run.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error. Fatal: aborts the run before any table is touched.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to connect to the relational source.
    #[error("Source connection error: {0}")]
    SourceConnection(String),

    /// Failed to read rows or metadata from the relational source.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Failed to connect to the document store.
    #[error("Destination connection error: {0}")]
    DestinationConnection(String),

    /// Failed to write a document to the document store.
    #[error("Loading error: {0}")]
    Loading(String),

    /// Failed to synthesize or persist a view definition.
    #[error("View synthesis error: {0}")]
    ViewSynthesis(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error from the document-store client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
