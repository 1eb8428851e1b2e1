//! Error type for page operations.

use std::path::PathBuf;

use pdfsuper_core::error::AppError;
use thiserror::Error;

/// Errors from splitting and merging documents.
#[derive(Debug, Error)]
pub enum PagesError {
    /// Merging needs at least two documents.
    #[error("Merge needs at least 2 documents, got {count}")]
    NotEnoughInputs {
        /// Number of documents supplied.
        count: usize,
    },

    /// A document could not be parsed.
    #[error("Cannot read PDF {path}: {reason}")]
    Load {
        /// The document.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// A document has no pages.
    #[error("PDF {path} has no pages")]
    NoPages {
        /// The document.
        path: PathBuf,
    },

    /// The page tree is not in a shape the operation can handle.
    #[error("Malformed page tree: {0}")]
    Structure(String),

    /// Serializing an output document failed.
    #[error("Cannot write PDF {path}: {reason}")]
    Save {
        /// Output path.
        path: PathBuf,
        /// Writer message.
        reason: String,
    },

    /// Filesystem error on an output path.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The blocking worker panicked.
    #[error("Page worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<PagesError> for AppError {
    fn from(err: PagesError) -> Self {
        let message = err.to_string();
        match err {
            PagesError::NotEnoughInputs { .. } => AppError::validation(message),
            PagesError::Load { .. } | PagesError::NoPages { .. } | PagesError::Structure(_) => {
                AppError::document(message)
            }
            PagesError::Save { .. } | PagesError::Io { .. } => AppError::storage(message),
            PagesError::Join(_) => AppError::internal(message),
        }
    }
}
