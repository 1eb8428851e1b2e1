//! Moves the resolved artifact to the caller's destination.
//!
//! The destination is only touched after the artifact is confirmed present.
//! An existing destination file is removed and the artifact renamed into
//! place. When the rename crosses devices the artifact is first copied to a
//! hidden staging file beside the destination, which is then renamed, so a
//! partially written destination is never visible.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// Errors from relocation.
#[derive(Debug, Error)]
#[error("{action} failed: {source}")]
pub struct RelocateError {
    /// What the relocator was doing.
    pub action: &'static str,
    /// Underlying I/O error.
    #[source]
    pub source: std::io::Error,
}

impl RelocateError {
    fn at(action: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| Self { action, source }
    }
}

/// Moves an artifact to its final location with overwrite semantics.
pub struct Relocator;

impl Relocator {
    /// Move `artifact` to `destination`, replacing any existing file there.
    pub async fn relocate(artifact: &Path, destination: &Path) -> Result<PathBuf, RelocateError> {
        let metadata = tokio::fs::metadata(artifact)
            .await
            .map_err(RelocateError::at("inspecting artifact"))?;
        if !metadata.is_file() {
            return Err(RelocateError {
                action: "inspecting artifact",
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("{} is not a regular file", artifact.display()),
                ),
            });
        }

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(RelocateError::at("creating destination directory"))?;
        }

        Self::remove_existing(destination).await?;

        match tokio::fs::rename(artifact, destination).await {
            Ok(()) => {
                info!(
                    from = %artifact.display(),
                    to = %destination.display(),
                    "Moved converted file into place"
                );
                Ok(destination.to_path_buf())
            }
            Err(e) if is_cross_device(&e) => {
                debug!(error = %e, "Rename crosses devices, staging a copy beside destination");
                Self::copy_then_rename(artifact, destination).await?;
                Ok(destination.to_path_buf())
            }
            Err(e) => Err(RelocateError {
                action: "moving artifact",
                source: e,
            }),
        }
    }

    async fn remove_existing(destination: &Path) -> Result<(), RelocateError> {
        match tokio::fs::remove_file(destination).await {
            Ok(()) => {
                debug!(path = %destination.display(), "Removed previous destination file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RelocateError {
                action: "removing existing destination",
                source: e,
            }),
        }
    }

    async fn copy_then_rename(artifact: &Path, destination: &Path) -> Result<(), RelocateError> {
        let staging = staging_path(destination);

        if let Err(e) = tokio::fs::copy(artifact, &staging).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(RelocateError {
                action: "copying artifact across devices",
                source: e,
            });
        }

        if let Err(e) = tokio::fs::rename(&staging, destination).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(RelocateError {
                action: "renaming staged copy",
                source: e,
            });
        }

        // The workspace cleanup would remove it anyway.
        let _ = tokio::fs::remove_file(artifact).await;
        info!(
            from = %artifact.display(),
            to = %destination.display(),
            "Copied converted file into place"
        );
        Ok(())
    }
}

/// Hidden sibling used for cross-device copies.
fn staging_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());
    destination.with_file_name(format!(".{name}.{}.partial", Uuid::new_v4().simple()))
}

fn is_cross_device(e: &std::io::Error) -> bool {
    if e.kind() == std::io::ErrorKind::CrossesDevices {
        return true;
    }
    // EXDEV on Unix, ERROR_NOT_SAME_DEVICE on Windows.
    let code = if cfg!(windows) { 17 } else { 18 };
    e.raw_os_error() == Some(code)
}
