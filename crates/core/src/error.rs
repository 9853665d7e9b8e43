//! Error types for storage, transformation and the playground session.

use crate::types::EditorId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage is unavailable: {0}")]
    Unavailable(String),
    #[error("Storage I/O error: {0}")]
    Io(String),
    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Corrupt(e.to_string())
    }
}

/// Any failure while compiling or applying a stylesheet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("{0}")]
    Stylesheet(String),
    #[error("{0}")]
    Execution(String),
    #[error("Text output did not contain a result element")]
    MissingTextResult,
    #[error("{0}")]
    Backend(String),
}

#[cfg(feature = "native")]
impl From<xsltui_xslt::XsltError> for TransformError {
    fn from(e: xsltui_xslt::XsltError) -> Self {
        match e {
            xsltui_xslt::XsltError::Execution(inner) => TransformError::Execution(inner.to_string()),
            other => TransformError::Stylesheet(other.to_string()),
        }
    }
}

/// The main error enum for playground operations.
#[derive(Error, Debug)]
pub enum PlaygroundError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error("The {0} pane is read-only")]
    ReadOnly(EditorId),
    #[error("Unknown pane '{0}' (expected xml, xslt or output)")]
    UnknownPane(String),
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}
