use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for extraction operations
pub type Result<T> = std::result::Result<T, ExportError>;

/// Failures surfaced by the extraction pipeline
#[derive(Debug, Error)]
pub enum ExportError {
    /// The backend rejected the configured credentials
    #[error("authentication rejected for index {index} (HTTP {status})")]
    Auth { index: String, status: u16 },

    /// Transport failure, non-success status or unreadable response
    #[error("backend error for index {index}: {message}")]
    Backend { index: String, message: String },

    /// Filesystem failure while writing output
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration, detected before any backend call
    #[error("configuration error: {0}")]
    Config(String),
}

impl ExportError {
    pub fn backend(index: &str, message: impl Into<String>) -> Self {
        Self::Backend {
            index: index.to_string(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
