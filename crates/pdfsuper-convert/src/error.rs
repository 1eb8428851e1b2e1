//! Unified error type for the conversion subsystem.
//!
//! Component errors (locator, process runner, output resolver, relocator)
//! are consolidated into a single `ConversionError` enum that maps cleanly
//! to `pdfsuper_core::AppError`.

use std::path::PathBuf;

use pdfsuper_core::config::converter::ConverterKind;
use pdfsuper_core::error::AppError;
use thiserror::Error;

use crate::locator::LocateError;

/// Unified error type for all conversion operations.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// No converter executable exists at any probed location.
    #[error(
        "No {kind} converter found. Install it or set converter.executable. Searched: {}",
        join_paths(.searched)
    )]
    ConverterNotFound {
        /// Converter family that was searched for.
        kind: ConverterKind,
        /// Every location that was probed, in order.
        searched: Vec<PathBuf>,
    },

    /// The input document does not exist or is not a file.
    #[error("Source document not found: {path}")]
    SourceMissing {
        /// The requested source path.
        path: PathBuf,
    },

    /// The per-run workspace could not be created.
    #[error("Cannot create workspace at {path}: {source}")]
    WorkspaceIo {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The converter executable could not be started.
    #[error("Cannot launch converter {path}: {source}")]
    Launch {
        /// Executable that failed to start.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The converter exited with a non-zero status.
    #[error("Converter exited with code {code}: {stderr}")]
    ConverterFailed {
        /// The exit code (`-1` for signal termination).
        code: i32,
        /// Captured stderr output, verbatim.
        stderr: String,
    },

    /// The converter reported success but left no output file.
    #[error(
        "Converter exited with code {code} but produced no output (workspace contents: [{}]); stderr: {stderr}",
        .listing.join(", ")
    )]
    SilentFailure {
        /// The exit code.
        code: i32,
        /// Captured stderr output.
        stderr: String,
        /// Names found in the workspace output directory.
        listing: Vec<String>,
    },

    /// The converter left several candidate files and the policy is strict.
    #[error("Converter produced {} files, expected one: [{}]", .candidates.len(), .candidates.join(", "))]
    AmbiguousOutput {
        /// Candidate file names.
        candidates: Vec<String>,
    },

    /// The produced file is smaller than the configured minimum.
    #[error("Converter output {path} is {size} bytes (minimum {min})")]
    EmptyArtifact {
        /// Path to the undersized artifact.
        path: PathBuf,
        /// Actual size in bytes.
        size: u64,
        /// Configured minimum.
        min: u64,
    },

    /// The artifact could not be moved to its destination.
    #[error("Cannot move {from} to {to}: {source}")]
    RelocateIo {
        /// Artifact location inside the workspace.
        from: PathBuf,
        /// Requested destination.
        to: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The converter ran past the configured timeout and was killed.
    #[error("Converter timed out after {timeout_seconds}s and was terminated")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout_seconds: u64,
    },

    /// Conversion was cancelled via cancellation token.
    #[error("Conversion was cancelled")]
    Cancelled,

    /// Another conversion is already running in this application.
    #[error("A conversion is already in progress")]
    Busy,

    /// The worker task panicked or was aborted.
    #[error("Conversion worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ConversionError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConverterNotFound { .. } => "CONVERTER_NOT_FOUND",
            Self::SourceMissing { .. } => "SOURCE_MISSING",
            Self::WorkspaceIo { .. } => "WORKSPACE_IO_ERROR",
            Self::Launch { .. } => "LAUNCH_ERROR",
            Self::ConverterFailed { .. } => "CONVERTER_ERROR",
            Self::SilentFailure { .. } => "CONVERTER_SILENT_FAILURE",
            Self::AmbiguousOutput { .. } => "AMBIGUOUS_OUTPUT",
            Self::EmptyArtifact { .. } => "EMPTY_ARTIFACT",
            Self::RelocateIo { .. } => "RELOCATE_IO_ERROR",
            Self::Timeout { .. } => "TIMEOUT",
            Self::Cancelled => "CANCELLED",
            Self::Busy => "BUSY",
            Self::Join(_) => "INTERNAL",
        }
    }

    /// Captured converter stderr, for failures that carry it.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::ConverterFailed { stderr, .. } | Self::SilentFailure { stderr, .. } => {
                Some(stderr)
            }
            _ => None,
        }
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "(nothing)".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<LocateError> for ConversionError {
    fn from(err: LocateError) -> Self {
        match err {
            LocateError::NotFound { kind, searched } => Self::ConverterNotFound { kind, searched },
        }
    }
}

impl From<ConversionError> for AppError {
    fn from(err: ConversionError) -> Self {
        let message = format!("[{}] {}", err.code(), err);
        match &err {
            ConversionError::ConverterNotFound { .. } => AppError::not_found(message),
            ConversionError::SourceMissing { .. } => AppError::validation(message),
            ConversionError::WorkspaceIo { .. } | ConversionError::RelocateIo { .. } => {
                AppError::storage(message)
            }
            ConversionError::Launch { .. }
            | ConversionError::ConverterFailed { .. }
            | ConversionError::SilentFailure { .. }
            | ConversionError::AmbiguousOutput { .. }
            | ConversionError::EmptyArtifact { .. } => AppError::external_tool(message),
            ConversionError::Timeout { .. } => AppError::timeout(message),
            ConversionError::Cancelled => AppError::cancelled(message),
            ConversionError::Busy => AppError::conflict(message),
            ConversionError::Join(_) => AppError::internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfsuper_core::error::ErrorKind;

    #[test]
    fn test_converter_failed_message_carries_stderr() {
        let err = ConversionError::ConverterFailed {
            code: 3,
            stderr: "Error: source file could not be loaded".to_string(),
        };
        assert_eq!(err.code(), "CONVERTER_ERROR");
        assert!(err.to_string().contains("code 3"));
        assert!(err.to_string().contains("could not be loaded"));
        assert_eq!(err.stderr(), Some("Error: source file could not be loaded"));
    }

    #[test]
    fn test_not_found_lists_searched_paths() {
        let err = ConversionError::ConverterNotFound {
            kind: ConverterKind::Office,
            searched: vec![PathBuf::from("/usr/bin/soffice"), PathBuf::from("/opt/lo/soffice")],
        };
        let msg = err.to_string();
        assert!(msg.contains("office"));
        assert!(msg.contains("/usr/bin/soffice, /opt/lo/soffice"));
    }

    #[test]
    fn test_app_error_mapping() {
        let app: AppError = ConversionError::Busy.into();
        assert_eq!(app.kind, ErrorKind::Conflict);
        assert!(app.message.starts_with("[BUSY]"));

        let app: AppError = ConversionError::Timeout { timeout_seconds: 5 }.into();
        assert_eq!(app.kind, ErrorKind::Timeout);

        let app: AppError = ConversionError::SilentFailure {
            code: 0,
            stderr: String::new(),
            listing: Vec::new(),
        }
        .into();
        assert_eq!(app.kind, ErrorKind::ExternalTool);
    }
}
