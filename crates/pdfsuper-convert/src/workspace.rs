//! Per-run scratch directories.
//!
//! Each conversion gets a fresh `<temp_root>/<prefix>-<uuid>` directory with
//! an empty `output/` subdirectory for the converter and a `staging/`
//! subdirectory for generated helper files. The directory is removed exactly
//! once: by [`Workspace::destroy`], or by the drop guard if the run never got
//! that far (panic, dropped future).

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

const OUTPUT_DIR: &str = "output";
const STAGING_DIR: &str = "staging";

/// An exclusively owned, uniquely named temporary directory.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    armed: bool,
}

impl Workspace {
    /// Create a new workspace under `temp_root`.
    ///
    /// The leaf directory is created non-recursively so an existing
    /// directory of the same name is an error rather than silently reused.
    pub async fn create(temp_root: &Path, prefix: &str) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(temp_root).await?;

        let root = temp_root.join(format!("{prefix}-{}", Uuid::now_v7().simple()));
        tokio::fs::create_dir(&root).await?;

        // From here on the guard owns the directory, so a failure below
        // still removes it.
        let workspace = Self { root, armed: true };
        tokio::fs::create_dir(workspace.output_dir()).await?;
        tokio::fs::create_dir(workspace.staging_dir()).await?;

        debug!(workspace = %workspace.root.display(), "Created workspace");
        Ok(workspace)
    }

    /// Root directory of this workspace.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory handed to the converter as its output directory.
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(OUTPUT_DIR)
    }

    /// Directory for generated helper files (e.g. scripts).
    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }

    /// Recursively remove the workspace (best-effort).
    ///
    /// Failures are logged, never returned: cleanup must not mask the
    /// outcome of the conversion.
    pub async fn destroy(mut self) {
        self.armed = false;
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => debug!(workspace = %self.root.display(), "Removed workspace"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                workspace = %self.root.display(),
                error = %e,
                "Failed to clean up workspace"
            ),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => debug!(workspace = %self.root.display(), "Removed workspace on drop"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                workspace = %self.root.display(),
                error = %e,
                "Failed to clean up workspace on drop"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_layout() {
        let temp = tempfile::tempdir().expect("tempdir");
        let workspace = Workspace::create(temp.path(), "pdfsuper").await.expect("create");

        assert!(workspace.root().starts_with(temp.path()));
        let name = workspace
            .root()
            .file_name()
            .and_then(|n| n.to_str())
            .expect("name");
        assert!(name.starts_with("pdfsuper-"));
        assert!(workspace.output_dir().is_dir());
        assert!(workspace.staging_dir().is_dir());

        let entries = std::fs::read_dir(workspace.output_dir()).expect("read").count();
        assert_eq!(entries, 0);
    }

    #[tokio::test]
    async fn test_names_are_unique() {
        let temp = tempfile::tempdir().expect("tempdir");
        let a = Workspace::create(temp.path(), "ws").await.expect("a");
        let b = Workspace::create(temp.path(), "ws").await.expect("b");
        assert_ne!(a.root(), b.root());
    }

    #[tokio::test]
    async fn test_destroy_removes_contents() {
        let temp = tempfile::tempdir().expect("tempdir");
        let workspace = Workspace::create(temp.path(), "ws").await.expect("create");
        let root = workspace.root().to_path_buf();
        std::fs::write(workspace.output_dir().join("out.docx"), b"data").expect("write");

        workspace.destroy().await;
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn test_drop_guard_removes_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = {
            let workspace = Workspace::create(temp.path(), "ws").await.expect("create");
            std::fs::write(workspace.staging_dir().join("helper.py"), b"print()").expect("write");
            workspace.root().to_path_buf()
        };
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn test_destroy_tolerates_missing_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        let workspace = Workspace::create(temp.path(), "ws").await.expect("create");
        std::fs::remove_dir_all(workspace.root()).expect("pre-remove");
        workspace.destroy().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_create_fails_under_unwritable_root() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().expect("tempdir");
        let locked = temp.path().join("locked");
        std::fs::create_dir(&locked).expect("mkdir");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o500)).expect("chmod");

        let result = Workspace::create(&locked, "ws").await;

        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o700)).expect("chmod");
        // Root bypasses permission bits; only assert when the create was refused.
        if let Err(e) = result {
            assert_eq!(e.kind(), std::io::ErrorKind::PermissionDenied);
        }
    }
}
