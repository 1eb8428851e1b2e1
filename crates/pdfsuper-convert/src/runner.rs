//! Converter process execution.
//!
//! Launches the converter as a child process with timeout management,
//! cancellation and stderr capture.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::models::{ProcessOutcome, TargetFormat};

/// How long to keep draining stderr after the converter exits.
const STDERR_GRACE: Duration = Duration::from_secs(5);

/// Errors from running the converter process.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The executable could not be started.
    #[error("Cannot launch {path}: {source}")]
    Launch {
        /// The executable.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Waiting for the child failed.
    #[error("Failed waiting for converter process: {0}")]
    Wait(#[source] std::io::Error),

    /// The process ran past the timeout and was killed.
    #[error("Converter timed out after {0:?}")]
    Timeout(Duration),

    /// The run was cancelled and the process killed.
    #[error("Converter run cancelled")]
    Cancelled,
}

/// A fully constructed converter command line.
///
/// Every argument is a discrete argv element; paths are never joined into a
/// shell string, so spaces and quotes in user-chosen paths survive intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterInvocation {
    /// The executable to launch.
    pub executable: PathBuf,
    /// Arguments, in order.
    pub args: Vec<OsString>,
}

impl ConverterInvocation {
    /// Headless office suite:
    /// `--headless --convert-to <token> [extra…] --outdir <dir> <input>`.
    pub fn office(
        executable: &Path,
        target: TargetFormat,
        input: &Path,
        output_dir: &Path,
        extra_args: &[String],
    ) -> Self {
        let mut args: Vec<OsString> = vec![
            "--headless".into(),
            "--convert-to".into(),
            target.token().into(),
        ];
        args.extend(extra_args.iter().map(OsString::from));
        args.push("--outdir".into());
        args.push(output_dir.as_os_str().to_owned());
        args.push(input.as_os_str().to_owned());

        Self {
            executable: executable.to_path_buf(),
            args,
        }
    }

    /// Python runtime running a generated helper script with the same
    /// flags as the office suite.
    pub fn python(
        executable: &Path,
        script: &Path,
        target: TargetFormat,
        input: &Path,
        output_dir: &Path,
        extra_args: &[String],
    ) -> Self {
        let office = Self::office(executable, target, input, output_dir, extra_args);
        let mut args = Vec::with_capacity(office.args.len() + 1);
        args.push(script.as_os_str().to_owned());
        args.extend(office.args);

        Self {
            executable: executable.to_path_buf(),
            args,
        }
    }

    /// Quoted rendering for logs and diagnostics. Not used for execution.
    pub fn command_line(&self) -> String {
        std::iter::once(self.executable.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(quote_for_display)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote_for_display(arg: &OsStr) -> String {
    let text = arg.to_string_lossy();
    let needs_quotes =
        text.is_empty() || text.chars().any(|c| c.is_whitespace() || matches!(c, '"' | '\''));
    if needs_quotes {
        format!("\"{}\"", text.replace('"', "\\\""))
    } else {
        text.into_owned()
    }
}

/// Runs converter processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    /// Create a runner; `None` means no timeout.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// The configured timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Launch the invocation and wait for it, racing process exit against
    /// the timeout and the cancellation token.
    ///
    /// Any exit code is returned as a [`ProcessOutcome`]; classifying a
    /// non-zero code is the caller's job.
    pub async fn run(
        &self,
        invocation: &ConverterInvocation,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutcome, ProcessError> {
        if cancel.is_cancelled() {
            return Err(ProcessError::Cancelled);
        }

        let mut cmd = Command::new(&invocation.executable);

        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x08000000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(
            command = %invocation.command_line(),
            timeout_s = self.timeout.map(|t| t.as_secs()),
            "Spawning converter process"
        );

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|source| {
            error!(
                path = %invocation.executable.display(),
                error = %source,
                "Failed to launch converter"
            );
            ProcessError::Launch {
                path: invocation.executable.clone(),
                source,
            }
        })?;

        // Drain stderr concurrently so a full pipe cannot stall the child.
        let stderr_buf = Arc::new(Mutex::new(Vec::new()));
        let stderr_task = child.stderr.take().map(|mut pipe| {
            let buf = Arc::clone(&stderr_buf);
            tokio::spawn(async move {
                let mut chunk = [0u8; 8192];
                loop {
                    match pipe.read(&mut chunk).await {
                        Ok(0) => break,
                        Ok(n) => {
                            if let Ok(mut b) = buf.lock() {
                                b.extend_from_slice(&chunk[..n]);
                            }
                        }
                        Err(e) => {
                            debug!(error = %e, "Stopped reading converter stderr");
                            break;
                        }
                    }
                }
            })
        });

        let deadline = async {
            match self.timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            result = child.wait() => {
                let status = result.map_err(ProcessError::Wait)?;
                let elapsed = start.elapsed();

                if let Some(task) = stderr_task {
                    if tokio::time::timeout(STDERR_GRACE, task).await.is_err() {
                        warn!("Converter stderr still open after exit, keeping partial output");
                    }
                }
                let stderr = take_text(&stderr_buf);

                let exit_code = status.code().unwrap_or(-1);
                if exit_code == 0 {
                    info!(elapsed_ms = elapsed.as_millis() as u64, "Converter process finished");
                } else {
                    warn!(
                        code = exit_code,
                        elapsed_ms = elapsed.as_millis() as u64,
                        stderr = %stderr,
                        "Converter process failed"
                    );
                }

                Ok(ProcessOutcome { exit_code, stderr })
            }
            _ = deadline => {
                let limit = self.timeout.unwrap_or_default();
                error!(timeout_s = limit.as_secs(), "Converter timed out, killing");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill timed-out converter");
                }
                if let Some(task) = stderr_task {
                    task.abort();
                }
                Err(ProcessError::Timeout(limit))
            }
            _ = cancel.cancelled() => {
                info!("Conversion cancelled, killing converter process");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill cancelled converter");
                }
                if let Some(task) = stderr_task {
                    task.abort();
                }
                Err(ProcessError::Cancelled)
            }
        }
    }
}

fn take_text(buf: &Mutex<Vec<u8>>) -> String {
    match buf.lock() {
        Ok(mut bytes) => String::from_utf8_lossy(&std::mem::take(&mut *bytes)).into_owned(),
        Err(_) => String::new(),
    }
}
