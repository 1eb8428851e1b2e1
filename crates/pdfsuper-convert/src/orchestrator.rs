//! Conversion orchestrator: drives one request through the pipeline.
//!
//! ```text
//! Idle → LocatingConverter → PreparingWorkspace → Converting
//!      → ResolvingOutput → Relocating → Done
//! ```
//!
//! Any non-idle phase may end in `Failed`. Once a workspace exists it is
//! destroyed before the terminal phase is published, whatever the outcome.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use pdfsuper_core::config::converter::{ConverterConfig, ConverterKind};

use crate::error::ConversionError;
use crate::locator::ConverterLocator;
use crate::models::{
    ConversionReport, ConversionRequest, ConverterHandle, Phase, ProcessOutcome, ResolvedArtifact,
};
use crate::relocator::Relocator;
use crate::resolver::{OutputResolver, ResolveError};
use crate::runner::{ConverterInvocation, ProcessError, ProcessRunner};
use crate::scripting::ScriptingEngine;
use crate::workspace::Workspace;

/// Single-use driver for one conversion. `run` consumes it.
#[derive(Debug)]
pub struct ConversionOrchestrator {
    config: ConverterConfig,
    locator: ConverterLocator,
    status: Option<Arc<watch::Sender<Phase>>>,
    phase: Phase,
}

impl ConversionOrchestrator {
    /// Create an orchestrator whose locator is built from `config`.
    pub fn new(config: ConverterConfig) -> Self {
        let locator = ConverterLocator::from_config(&config);
        Self {
            config,
            locator,
            status: None,
            phase: Phase::Idle,
        }
    }

    /// Replace the converter locator.
    pub fn with_locator(mut self, locator: ConverterLocator) -> Self {
        self.locator = locator;
        self
    }

    /// Publish phase transitions on `status`.
    pub fn with_status(mut self, status: Arc<watch::Sender<Phase>>) -> Self {
        self.status = Some(status);
        self
    }

    /// Run the request to completion.
    #[instrument(
        skip_all,
        fields(
            run_id = %Uuid::now_v7(),
            source = %request.source().display(),
            target = request.target().token(),
        )
    )]
    pub async fn run(
        mut self,
        request: ConversionRequest,
        cancel: CancellationToken,
    ) -> Result<ConversionReport, ConversionError> {
        let start = Instant::now();
        let result = self.execute(&request, &cancel, start).await;

        match &result {
            Ok(report) => {
                self.transition(Phase::Done);
                info!(
                    destination = %report.destination.display(),
                    size = report.size,
                    elapsed_ms = report.elapsed_ms,
                    "Conversion completed"
                );
            }
            Err(e) => {
                self.transition(Phase::Failed);
                error!(code = e.code(), error = %e, "Conversion failed");
            }
        }
        result
    }

    async fn execute(
        &mut self,
        request: &ConversionRequest,
        cancel: &CancellationToken,
        start: Instant,
    ) -> Result<ConversionReport, ConversionError> {
        self.transition(Phase::LocatingConverter);
        let source = validate_source(request.source()).await?;
        if cancel.is_cancelled() {
            return Err(ConversionError::Cancelled);
        }

        let handle = self.locator.locate()?;

        self.transition(Phase::PreparingWorkspace);
        let temp_root = self.config.effective_temp_root();
        let workspace = Workspace::create(&temp_root, &self.config.workspace_prefix)
            .await
            .map_err(|source| ConversionError::WorkspaceIo {
                path: temp_root.clone(),
                source,
            })?;

        let outcome = self
            .run_in_workspace(&workspace, &handle, &source, request, cancel)
            .await;

        workspace.destroy().await;

        let artifact_size = outcome?;
        Ok(ConversionReport {
            destination: request.destination().to_path_buf(),
            size: artifact_size,
            converter: handle,
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Convert, resolve and relocate. Returns the delivered size in bytes.
    async fn run_in_workspace(
        &mut self,
        workspace: &Workspace,
        handle: &ConverterHandle,
        source: &Path,
        request: &ConversionRequest,
        cancel: &CancellationToken,
    ) -> Result<u64, ConversionError> {
        let output_dir = workspace.output_dir();
        let target = request.target();

        self.transition(Phase::Converting);
        let invocation = match handle.kind {
            ConverterKind::Office => ConverterInvocation::office(
                &handle.executable,
                target,
                source,
                &output_dir,
                &self.config.extra_args,
            ),
            ConverterKind::Python => {
                let staging = workspace.staging_dir();
                let script = ScriptingEngine::write_helper(&staging).await.map_err(|source| {
                    ConversionError::WorkspaceIo {
                        path: staging.clone(),
                        source,
                    }
                })?;
                ConverterInvocation::python(
                    &handle.executable,
                    &script,
                    target,
                    source,
                    &output_dir,
                    &self.config.extra_args,
                )
            }
        };

        let runner = ProcessRunner::new(self.config.timeout());
        let outcome = runner
            .run(&invocation, cancel)
            .await
            .map_err(|e| process_error(e, &handle.executable))?;
        if !outcome.success() {
            return Err(ConversionError::ConverterFailed {
                code: outcome.exit_code,
                stderr: outcome.stderr,
            });
        }

        self.transition(Phase::ResolvingOutput);
        let artifact = self.resolve(&output_dir, target.extension(), &outcome).await?;

        if cancel.is_cancelled() {
            return Err(ConversionError::Cancelled);
        }

        self.transition(Phase::Relocating);
        Relocator::relocate(&artifact.path, request.destination())
            .await
            .map_err(|e| {
                warn!(action = e.action, error = %e.source, "Relocation failed");
                ConversionError::RelocateIo {
                    from: artifact.path.clone(),
                    to: request.destination().to_path_buf(),
                    source: e.source,
                }
            })?;

        Ok(artifact.size)
    }

    async fn resolve(
        &self,
        output_dir: &Path,
        extension: &str,
        outcome: &ProcessOutcome,
    ) -> Result<ResolvedArtifact, ConversionError> {
        let artifact = OutputResolver::new(self.config.output_policy)
            .resolve(output_dir, extension)
            .await
            .map_err(|e| match e {
                ResolveError::Empty { listing } => ConversionError::SilentFailure {
                    code: outcome.exit_code,
                    stderr: outcome.stderr.clone(),
                    listing,
                },
                ResolveError::Ambiguous { candidates } => {
                    ConversionError::AmbiguousOutput { candidates }
                }
                ResolveError::Io(source) => ConversionError::WorkspaceIo {
                    path: output_dir.to_path_buf(),
                    source,
                },
            })?;

        if artifact.size < self.config.min_output_bytes {
            return Err(ConversionError::EmptyArtifact {
                path: artifact.path,
                size: artifact.size,
                min: self.config.min_output_bytes,
            });
        }

        info!(
            artifact = %artifact.path.display(),
            size = artifact.size,
            "Resolved converter output"
        );
        Ok(artifact)
    }

    fn transition(&mut self, next: Phase) {
        info!(from = %self.phase, to = %next, "Conversion phase changed");
        self.phase = next;
        if let Some(status) = &self.status {
            status.send_replace(next);
        }
    }
}

/// The source must be an existing regular file. Returns it as an absolute
/// path so the converter does not depend on its working directory.
async fn validate_source(source: &Path) -> Result<PathBuf, ConversionError> {
    let missing = || ConversionError::SourceMissing {
        path: source.to_path_buf(),
    };

    let metadata = tokio::fs::metadata(source).await.map_err(|_| missing())?;
    if !metadata.is_file() {
        return Err(missing());
    }
    std::path::absolute(source).map_err(|_| missing())
}

fn process_error(e: ProcessError, executable: &Path) -> ConversionError {
    match e {
        ProcessError::Launch { path, source } => ConversionError::Launch { path, source },
        ProcessError::Wait(source) => ConversionError::Launch {
            path: executable.to_path_buf(),
            source,
        },
        ProcessError::Timeout(limit) => ConversionError::Timeout {
            timeout_seconds: limit.as_secs(),
        },
        ProcessError::Cancelled => ConversionError::Cancelled,
    }
}
