//! Output discovery: finds the converter's artifact in the workspace.
//!
//! The converter picks its own output file name, so after it exits the
//! workspace output directory (empty at launch) is listed and exactly one
//! regular file is selected according to the configured [`OutputPolicy`]:
//!
//! - `Newest`: files with the expected extension are preferred; among those
//!   the most recently modified wins, and equal timestamps fall back to the
//!   lexicographically smallest name.
//! - `Strict`: more than one file is an ambiguity error.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;
use tracing::{debug, warn};

use pdfsuper_core::config::converter::OutputPolicy;

use crate::models::ResolvedArtifact;

/// Errors from output discovery.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No regular file exists in the output directory.
    #[error("No output file found")]
    Empty {
        /// Everything that was in the directory (e.g. subdirectories).
        listing: Vec<String>,
    },

    /// Several files exist and the policy refuses to choose.
    #[error("{} output files found", .candidates.len())]
    Ambiguous {
        /// Candidate file names, sorted.
        candidates: Vec<String>,
    },

    /// The directory could not be read.
    #[error("Cannot read output directory: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
struct Candidate {
    path: PathBuf,
    name: String,
    size: u64,
    modified: Option<SystemTime>,
}

impl Candidate {
    fn has_extension(&self, expected: &str) -> bool {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(expected.trim_start_matches('.')))
    }

    /// Ordering under which the greater candidate wins.
    fn recency(&self, other: &Self) -> Ordering {
        self.modified
            .cmp(&other.modified)
            .then_with(|| other.name.cmp(&self.name))
    }
}

/// Identifies the single produced artifact.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputResolver {
    policy: OutputPolicy,
}

impl OutputResolver {
    /// Create a resolver with the given tie-break policy.
    pub fn new(policy: OutputPolicy) -> Self {
        Self { policy }
    }

    /// List `output_dir` and select the artifact.
    pub async fn resolve(
        &self,
        output_dir: &Path,
        expected_extension: &str,
    ) -> Result<ResolvedArtifact, ResolveError> {
        let mut listing = Vec::new();
        let mut files = Vec::new();

        let mut entries = tokio::fs::read_dir(output_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            listing.push(name.clone());

            let metadata = match tokio::fs::metadata(&path).await {
                Ok(m) => m,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot stat output entry, skipping");
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            files.push(Candidate {
                path,
                name,
                size: metadata.len(),
                modified: metadata.modified().ok(),
            });
        }

        listing.sort();
        debug!(dir = %output_dir.display(), entries = ?listing, "Listed converter output");

        let chosen = self.choose(files, expected_extension, listing)?;
        Ok(ResolvedArtifact {
            path: chosen.path,
            size: chosen.size,
            modified: chosen.modified,
        })
    }

    fn choose(
        &self,
        mut files: Vec<Candidate>,
        expected_extension: &str,
        listing: Vec<String>,
    ) -> Result<Candidate, ResolveError> {
        match files.len() {
            0 => return Err(ResolveError::Empty { listing }),
            1 => return Ok(files.remove(0)),
            _ => {}
        }

        let mut names: Vec<String> = files.iter().map(|c| c.name.clone()).collect();
        names.sort();

        if self.policy == OutputPolicy::Strict {
            return Err(ResolveError::Ambiguous { candidates: names });
        }

        let preferred: Vec<Candidate> = files
            .iter()
            .filter(|c| c.has_extension(expected_extension))
            .cloned()
            .collect();
        let pool = if preferred.is_empty() { files } else { preferred };

        let chosen = pool
            .into_iter()
            .max_by(|a, b| a.recency(b))
            .ok_or(ResolveError::Empty { listing })?;

        warn!(
            chosen = %chosen.name,
            candidates = ?names,
            "Converter produced several files, picked one by extension and recency"
        );
        Ok(chosen)
    }
}
