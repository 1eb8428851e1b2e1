//! Converter installation discovery.
//!
//! Locates the converter executable by probing, in order:
//! 1. The explicitly configured executable (file or install directory)
//! 2. The Windows registry (LibreOffice `UNO\InstallPath`), office only
//! 3. Known installation directories for the platform, then configured extras
//! 4. The system PATH
//!
//! Discovery is deterministic and never spawns a process.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use pdfsuper_core::config::converter::{ConverterConfig, ConverterKind};

use crate::models::{ConverterHandle, DiscoveryMethod};

/// Registry key holding the LibreOffice `program` directory.
#[cfg(windows)]
const LIBREOFFICE_UNO_KEY: &str = r"SOFTWARE\LibreOffice\UNO\InstallPath";

/// Python minor versions probed in the classic Windows install layout.
#[cfg(windows)]
const PYTHON_WINDOWS_VERSIONS: &[&str] = &["39", "310", "311", "312", "313"];

/// Errors from converter discovery.
#[derive(Debug, Error)]
pub enum LocateError {
    /// No candidate location holds an executable.
    #[error("{kind} converter not found ({} locations searched)", .searched.len())]
    NotFound {
        /// Converter family that was searched for.
        kind: ConverterKind,
        /// Every probed path, in probe order.
        searched: Vec<PathBuf>,
    },
}

/// Probes candidate locations for a converter executable.
#[derive(Debug, Clone)]
pub struct ConverterLocator {
    kind: ConverterKind,
    explicit: Option<PathBuf>,
    use_registry: bool,
    candidates: Vec<PathBuf>,
    search_path: bool,
}

impl ConverterLocator {
    /// Build a locator from configuration, using the platform's known
    /// installation directories followed by `extra_candidates`.
    pub fn from_config(config: &ConverterConfig) -> Self {
        let mut candidates = Self::known_locations(config.kind);
        candidates.extend(config.extra_candidates.iter().cloned());

        Self {
            kind: config.kind,
            explicit: config.executable.clone(),
            use_registry: true,
            candidates,
            search_path: config.search_path,
        }
    }

    /// Build a locator probing only the given candidates, with no registry
    /// or PATH lookup.
    pub fn with_candidates(kind: ConverterKind, candidates: Vec<PathBuf>) -> Self {
        Self {
            kind,
            explicit: None,
            use_registry: false,
            candidates,
            search_path: false,
        }
    }

    /// Set an explicit executable or install directory, probed first.
    pub fn explicit(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit = Some(path.into());
        self
    }

    /// Enable or disable the PATH fallback.
    pub fn search_path(mut self, enabled: bool) -> Self {
        self.search_path = enabled;
        self
    }

    /// Converter family this locator searches for.
    pub fn kind(&self) -> ConverterKind {
        self.kind
    }

    /// Resolve the converter executable.
    pub fn locate(&self) -> Result<ConverterHandle, LocateError> {
        let mut searched = Vec::new();

        if let Some(explicit) = &self.explicit {
            for candidate in self.expand_explicit(explicit) {
                if let Some(handle) =
                    self.probe(&candidate, DiscoveryMethod::ExplicitConfig, &mut searched)
                {
                    return Ok(handle);
                }
            }
            debug!(
                path = %explicit.display(),
                "Configured converter path holds no executable, trying discovery"
            );
        }

        if self.use_registry {
            for candidate in self.registry_locations() {
                if let Some(handle) =
                    self.probe(&candidate, DiscoveryMethod::WindowsRegistry, &mut searched)
                {
                    return Ok(handle);
                }
            }
        }

        for candidate in &self.candidates {
            if let Some(handle) = self.probe(candidate, DiscoveryMethod::KnownLocation, &mut searched)
            {
                return Ok(handle);
            }
        }

        if self.search_path {
            for candidate in Self::path_locations(self.kind) {
                if let Some(handle) =
                    self.probe(&candidate, DiscoveryMethod::SystemPath, &mut searched)
                {
                    return Ok(handle);
                }
            }
        }

        debug!(kind = %self.kind, searched = searched.len(), "Converter discovery failed");
        Err(LocateError::NotFound {
            kind: self.kind,
            searched,
        })
    }

    /// Check one candidate, recording it in `searched`.
    fn probe(
        &self,
        candidate: &Path,
        method: DiscoveryMethod,
        searched: &mut Vec<PathBuf>,
    ) -> Option<ConverterHandle> {
        searched.push(candidate.to_path_buf());
        if !is_executable(candidate) {
            return None;
        }

        info!(
            path = %candidate.display(),
            kind = %self.kind,
            method = method.label(),
            "Found converter executable"
        );
        Some(ConverterHandle {
            executable: candidate.to_path_buf(),
            kind: self.kind,
            discovery_method: method,
        })
    }

    /// An explicit path may name the executable or its install directory.
    fn expand_explicit(&self, path: &Path) -> Vec<PathBuf> {
        if !path.is_dir() {
            return vec![path.to_path_buf()];
        }

        let mut expanded = Vec::new();
        for name in Self::executable_names(self.kind) {
            expanded.push(path.join(&name));
            if self.kind == ConverterKind::Office {
                expanded.push(path.join("program").join(name));
            }
        }
        expanded
    }

    /// Executable file names for a converter family.
    fn executable_names(kind: ConverterKind) -> Vec<String> {
        let base: &[&str] = match kind {
            ConverterKind::Office => &["soffice", "libreoffice"],
            ConverterKind::Python => &["python3", "python"],
        };
        base.iter()
            .map(|name| format!("{name}{}", std::env::consts::EXE_SUFFIX))
            .collect()
    }

    /// Built-in absolute installation paths for the current platform.
    pub fn known_locations(kind: ConverterKind) -> Vec<PathBuf> {
        let mut paths = Vec::new();

        #[cfg(windows)]
        match kind {
            ConverterKind::Office => {
                for var in ["ProgramFiles", "ProgramFiles(x86)"] {
                    if let Ok(root) = std::env::var(var) {
                        paths.push(
                            PathBuf::from(root)
                                .join("LibreOffice")
                                .join("program")
                                .join("soffice.exe"),
                        );
                    }
                }
                paths.push(PathBuf::from(
                    r"C:\Program Files\LibreOffice\program\soffice.exe",
                ));
            }
            ConverterKind::Python => {
                for version in PYTHON_WINDOWS_VERSIONS {
                    paths.push(PathBuf::from(format!(r"C:\Python{version}\python.exe")));
                }
                if let Ok(local) = std::env::var("LOCALAPPDATA") {
                    for version in PYTHON_WINDOWS_VERSIONS {
                        paths.push(
                            PathBuf::from(&local)
                                .join("Programs")
                                .join("Python")
                                .join(format!("Python{version}"))
                                .join("python.exe"),
                        );
                    }
                }
            }
        }

        #[cfg(target_os = "macos")]
        match kind {
            ConverterKind::Office => {
                paths.push(PathBuf::from(
                    "/Applications/LibreOffice.app/Contents/MacOS/soffice",
                ));
            }
            ConverterKind::Python => {
                paths.push(PathBuf::from("/opt/homebrew/bin/python3"));
                paths.push(PathBuf::from("/usr/local/bin/python3"));
                paths.push(PathBuf::from("/usr/bin/python3"));
            }
        }

        #[cfg(all(unix, not(target_os = "macos")))]
        match kind {
            ConverterKind::Office => {
                paths.push(PathBuf::from("/usr/bin/soffice"));
                paths.push(PathBuf::from("/usr/bin/libreoffice"));
                paths.push(PathBuf::from("/usr/lib/libreoffice/program/soffice"));
                paths.push(PathBuf::from("/opt/libreoffice/program/soffice"));
                paths.push(PathBuf::from("/snap/bin/libreoffice"));
            }
            ConverterKind::Python => {
                paths.push(PathBuf::from("/usr/bin/python3"));
                paths.push(PathBuf::from("/usr/local/bin/python3"));
            }
        }

        paths
    }

    /// Candidates derived from the PATH environment variable.
    fn path_locations(kind: ConverterKind) -> Vec<PathBuf> {
        let Some(path_var) = std::env::var_os("PATH") else {
            return Vec::new();
        };

        let names = Self::executable_names(kind);
        std::env::split_paths(&path_var)
            .filter(|dir| !dir.as_os_str().is_empty())
            .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
            .collect()
    }

    /// Candidates recorded in the Windows registry.
    #[cfg(windows)]
    fn registry_locations(&self) -> Vec<PathBuf> {
        use winreg::RegKey;
        use winreg::enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, KEY_READ};

        if self.kind != ConverterKind::Office {
            return Vec::new();
        }

        let roots = [(HKEY_LOCAL_MACHINE, "HKLM"), (HKEY_CURRENT_USER, "HKCU")];
        let mut found = Vec::new();

        for (root_key, root_name) in &roots {
            let key = match RegKey::predef(*root_key)
                .open_subkey_with_flags(LIBREOFFICE_UNO_KEY, KEY_READ)
            {
                Ok(key) => key,
                Err(e) => {
                    debug!(root = root_name, error = %e, "LibreOffice registry key not found");
                    continue;
                }
            };

            // The default value holds the `program` directory.
            match key.get_value::<String, _>("") {
                Ok(program_dir) => found.push(PathBuf::from(program_dir).join("soffice.exe")),
                Err(e) => debug!(root = root_name, error = %e, "No InstallPath value"),
            }
        }

        found
    }

    #[cfg(not(windows))]
    fn registry_locations(&self) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// Whether `path` is a regular file the current user may execute.
fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }

    has_execute_bit(&metadata)
}

#[cfg(unix)]
fn has_execute_bit(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn has_execute_bit(_metadata: &std::fs::Metadata) -> bool {
    true
}
