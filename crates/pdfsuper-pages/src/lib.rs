//! # pdfsuper-pages
//!
//! Page-level PDF operations built on `lopdf`: splitting a document into
//! one file per page, and merging several documents into one.
//!
//! The functions in [`split`] and [`merge`] are synchronous; the wrappers
//! here move them onto tokio's blocking pool for async callers.

mod document;
pub mod error;
pub mod merge;
pub mod split;

use std::path::PathBuf;

pub use error::PagesError;

/// Split `input` into single-page documents under `out_dir`.
pub async fn split_file(
    input: PathBuf,
    out_dir: PathBuf,
    infix: String,
) -> Result<Vec<PathBuf>, PagesError> {
    tokio::task::spawn_blocking(move || split::split_to_pages(&input, &out_dir, &infix)).await?
}

/// Merge `inputs`, in order, into `output`. Returns the page count.
pub async fn merge_files(inputs: Vec<PathBuf>, output: PathBuf) -> Result<usize, PagesError> {
    tokio::task::spawn_blocking(move || merge::merge(&inputs, &output)).await?
}
