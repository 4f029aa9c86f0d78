//! Error types for the PDF watermark library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the PDF watermark library
#[derive(Error, Debug)]
pub enum Error {
    /// The source document could not be parsed or its structure is unusable
    #[error("PDF error: {0}")]
    Document(#[from] lopdf::Error),

    /// Creating, writing or deleting a file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Source file not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Watermark parameters violate a precondition
    #[error("Invalid watermark spec: {0}")]
    InvalidSpec(String),

    /// Malformed watermark request document
    #[error("Invalid watermark request: {0}")]
    Request(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error comes from the source document rather than the filesystem
    pub fn is_document_error(&self) -> bool {
        matches!(self, Error::Document(_) | Error::FileNotFound(_))
    }
}
