//! Domain models: target formats, requests, converter handles, outcomes.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use pdfsuper_core::config::converter::ConverterKind;

/// Document format the converter is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    /// Word document (`.docx`).
    Word,
    /// Excel workbook (`.xlsx`).
    Excel,
}

impl TargetFormat {
    /// Token passed to the converter's `--convert-to` flag.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Word => "docx",
            Self::Excel => "xlsx",
        }
    }

    /// File extension of the produced artifact (same as the token).
    pub fn extension(&self) -> &'static str {
        self.token()
    }

    /// Get the display name for this format
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Word => "Word",
            Self::Excel => "Excel",
        }
    }

    /// Parse a converter token (`docx`, `xlsx`).
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "docx" => Some(Self::Word),
            "xlsx" => Some(Self::Excel),
            _ => None,
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for TargetFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "word" => Ok(Self::Word),
            "excel" => Ok(Self::Excel),
            other => Self::from_token(other).ok_or_else(|| format!("unknown target format '{s}'")),
        }
    }
}

/// One conversion request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRequest {
    source: PathBuf,
    target: TargetFormat,
    destination: PathBuf,
}

impl ConversionRequest {
    /// Create a request converting `source` to `target`, written to `destination`.
    pub fn new(
        source: impl Into<PathBuf>,
        target: TargetFormat,
        destination: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source: source.into(),
            target,
            destination: destination.into(),
        }
    }

    /// Create a request whose destination sits next to the source with the
    /// target extension (`report.pdf` → `report.xlsx`).
    pub fn beside_source(source: impl Into<PathBuf>, target: TargetFormat) -> Self {
        let source = source.into();
        let destination = source.with_extension(target.extension());
        Self::new(source, target, destination)
    }

    /// Path of the input document.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Requested output format.
    pub fn target(&self) -> TargetFormat {
        self.target
    }

    /// Final location of the artifact.
    pub fn destination(&self) -> &Path {
        &self.destination
    }
}

/// How the converter executable was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMethod {
    /// Explicitly configured by the user.
    ExplicitConfig,
    /// Found via the Windows registry.
    WindowsRegistry,
    /// Found in a known installation directory.
    KnownLocation,
    /// Found via the system PATH environment variable.
    SystemPath,
}

impl DiscoveryMethod {
    /// Short human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ExplicitConfig => "explicit config",
            Self::WindowsRegistry => "registry",
            Self::KnownLocation => "known location",
            Self::SystemPath => "system PATH",
        }
    }
}

/// A resolved converter executable. Resolved once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterHandle {
    /// Full path to the executable.
    pub executable: PathBuf,
    /// Converter family, which decides argument construction.
    pub kind: ConverterKind,
    /// How the executable was found.
    pub discovery_method: DiscoveryMethod,
}

/// Exit status and diagnostics of one converter process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutcome {
    /// Exit code; `-1` when the process was terminated by a signal.
    pub exit_code: i32,
    /// Everything the process wrote to standard error.
    pub stderr: String,
}

impl ProcessOutcome {
    /// Whether the converter signalled success.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// The single file identified as the converter's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    /// Location inside the workspace output directory.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time, when the platform reports one.
    pub modified: Option<SystemTime>,
}

/// Summary of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionReport {
    /// Where the artifact now lives.
    pub destination: PathBuf,
    /// Artifact size in bytes.
    pub size: u64,
    /// The converter that produced it.
    pub converter: ConverterHandle,
    /// Wall time of the run, in milliseconds.
    pub elapsed_ms: u64,
}

/// Coarse pipeline phase, published on the status channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No conversion has started.
    #[default]
    Idle,
    /// Searching for the converter executable.
    LocatingConverter,
    /// Creating the per-run workspace.
    PreparingWorkspace,
    /// The converter process is running.
    Converting,
    /// Inspecting the workspace for the produced file.
    ResolvingOutput,
    /// Moving the artifact to its destination.
    Relocating,
    /// The artifact is at its destination.
    Done,
    /// The run ended with an error.
    Failed,
}

impl Phase {
    /// Short status label for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::LocatingConverter => "locating",
            Self::PreparingWorkspace => "preparing",
            Self::Converting => "converting",
            Self::ResolvingOutput => "resolving",
            Self::Relocating => "relocating",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Whether no further transition can follow.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_tokens() {
        assert_eq!(TargetFormat::Word.token(), "docx");
        assert_eq!(TargetFormat::Excel.token(), "xlsx");
        assert_eq!(TargetFormat::from_token(".XLSX"), Some(TargetFormat::Excel));
        assert_eq!(TargetFormat::from_token("pdf"), None);
    }

    #[test]
    fn test_target_from_str() {
        assert_eq!("Word".parse::<TargetFormat>(), Ok(TargetFormat::Word));
        assert_eq!("xlsx".parse::<TargetFormat>(), Ok(TargetFormat::Excel));
        assert!("pptx".parse::<TargetFormat>().is_err());
    }

    #[test]
    fn test_request_beside_source() {
        let request = ConversionRequest::beside_source("/data/in/report.pdf", TargetFormat::Excel);
        assert_eq!(request.destination(), Path::new("/data/in/report.xlsx"));
        assert_eq!(request.target(), TargetFormat::Excel);
    }

    #[test]
    fn test_phase_labels() {
        assert_eq!(Phase::LocatingConverter.to_string(), "locating");
        assert!(Phase::Failed.is_terminal());
        assert!(!Phase::Relocating.is_terminal());
    }

    #[test]
    fn test_handle_serialization() {
        let handle = ConverterHandle {
            executable: PathBuf::from("/usr/bin/soffice"),
            kind: ConverterKind::Office,
            discovery_method: DiscoveryMethod::KnownLocation,
        };
        let json = serde_json::to_string(&handle).expect("serialize");
        assert!(json.contains("known_location"));
        assert!(json.contains("office"));
    }
}
