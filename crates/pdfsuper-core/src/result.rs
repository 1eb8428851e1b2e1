//! Convenience result type alias.

use crate::error::AppError;

/// A specialized `Result` type for PDF Super Tool operations.
pub type AppResult<T> = Result<T, AppError>;
