//! Configuration for the external document converter.
//!
//! If `executable` is not set, the converter is auto-discovered by probing
//! the registry (Windows), the known installation directories for the
//! selected [`ConverterKind`], and finally the system `PATH`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Which external program performs the conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConverterKind {
    /// A headless office suite (LibreOffice `soffice`).
    #[default]
    Office,
    /// A Python runtime running a generated helper script.
    Python,
}

impl ConverterKind {
    /// Stable lowercase name, as used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Office => "office",
            Self::Python => "python",
        }
    }
}

impl fmt::Display for ConverterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConverterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "office" | "libreoffice" | "soffice" => Ok(Self::Office),
            "python" | "python3" => Ok(Self::Python),
            other => Err(format!("unknown converter kind '{other}'")),
        }
    }
}

/// How the output resolver chooses when the converter leaves several files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputPolicy {
    /// Prefer files with the target extension, then the newest modification
    /// time, then the smallest file name.
    #[default]
    Newest,
    /// Fail with an ambiguous-output error when more than one file exists.
    Strict,
}

/// Configuration for the conversion subsystem.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Converter program family.
    pub kind: ConverterKind,

    /// Explicit path to the converter executable or its install directory.
    ///
    /// If unset, auto-discovery is attempted.
    pub executable: Option<PathBuf>,

    /// Whether auto-discovery falls back to the `PATH` directories.
    pub search_path: bool,

    /// Additional absolute candidates probed after the built-in locations.
    pub extra_candidates: Vec<PathBuf>,

    /// Extra arguments inserted before the output-directory flag.
    pub extra_args: Vec<String>,

    /// Root directory under which per-run workspaces are created.
    pub temp_root: Option<PathBuf>,

    /// Name prefix for per-run workspace directories.
    #[validate(
        length(min = 1, max = 64),
        custom(function = "validate_workspace_prefix")
    )]
    pub workspace_prefix: String,

    /// Timeout in seconds for a single converter invocation (0 disables it).
    #[validate(range(max = 7200))]
    pub timeout_seconds: u64,

    /// Tie-break policy when several output files are found.
    pub output_policy: OutputPolicy,

    /// Minimum artifact size in bytes to consider a conversion successful.
    pub min_output_bytes: u64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            kind: ConverterKind::default(),
            executable: None,
            search_path: true,
            extra_candidates: Vec::new(),
            extra_args: Vec::new(),
            temp_root: None,
            workspace_prefix: default_workspace_prefix(),
            timeout_seconds: default_timeout_seconds(),
            output_policy: OutputPolicy::default(),
            min_output_bytes: default_min_output_bytes(),
        }
    }
}

/// The prefix becomes a single directory name under the temp root.
fn validate_workspace_prefix(prefix: &str) -> Result<(), ValidationError> {
    if prefix == "." || prefix == ".." || prefix.contains(['/', '\\']) {
        return Err(ValidationError::new("workspace_prefix")
            .with_message("must be a plain directory name".into()));
    }
    Ok(())
}

fn default_workspace_prefix() -> String {
    "pdfsuper".to_string()
}

fn default_timeout_seconds() -> u64 {
    600
}

fn default_min_output_bytes() -> u64 {
    1
}

impl ConverterConfig {
    /// Resolve the effective workspace root directory.
    pub fn effective_temp_root(&self) -> PathBuf {
        self.temp_root.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// The converter timeout, or `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_seconds > 0).then(|| Duration::from_secs(self.timeout_seconds))
    }
}
